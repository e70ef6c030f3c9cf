//! Piezo buzzer driver.
//!
//! A passive piezo on LEDC channel 0.  "On" is a 50 % duty square wave at
//! the piezo's resonant frequency; "off" is zero duty.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channel via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;

const DUTY_ON: u8 = 128;

pub struct BuzzerDriver {
    on: bool,
    pulses: u32,
}

impl Default for BuzzerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BuzzerDriver {
    pub fn new() -> Self {
        Self { on: false, pulses: 0 }
    }

    pub fn set(&mut self, on: bool) {
        if on && !self.on {
            self.pulses = self.pulses.wrapping_add(1);
        }
        hw_init::ledc_set(hw_init::LEDC_CH_BUZZER, if on { DUTY_ON } else { 0 });
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Number of off→on transitions since boot.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }
}
