//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and all actuator drivers, exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  This is the only
//! module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::button::ButtonDriver;
use crate::drivers::buzzer::BuzzerDriver;
use crate::drivers::network_led::NetworkLed;
use crate::drivers::status_led::StatusLed;
use crate::error::SensorError;
use crate::sensors::SensorHub;
use crate::telemetry::RawReading;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I2C, D> {
    sensor_hub: SensorHub<I2C, D>,
    buzzer: BuzzerDriver,
    led: StatusLed,
    network_led: NetworkLed,
    button: ButtonDriver,
}

impl<I2C: I2c, D: DelayNs> HardwareAdapter<I2C, D> {
    pub fn new(
        sensor_hub: SensorHub<I2C, D>,
        buzzer: BuzzerDriver,
        led: StatusLed,
        network_led: NetworkLed,
        button: ButtonDriver,
    ) -> Self {
        Self {
            sensor_hub,
            buzzer,
            led,
            network_led,
            button,
        }
    }

    pub fn buzzer(&self) -> &BuzzerDriver {
        &self.buzzer
    }

    pub fn status_led(&self) -> &StatusLed {
        &self.led
    }

    pub fn network_led(&self) -> &NetworkLed {
        &self.network_led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I2C: I2c, D: DelayNs> SensorPort for HardwareAdapter<I2C, D> {
    fn read_raw(&mut self) -> Result<RawReading, SensorError> {
        self.sensor_hub.read()
    }

    fn button_pressed(&mut self) -> bool {
        self.button.poll_press()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I2C: I2c, D: DelayNs> ActuatorPort for HardwareAdapter<I2C, D> {
    fn set_buzzer(&mut self, on: bool) {
        self.buzzer.set(on);
    }

    fn set_status_led(&mut self, r: u8, g: u8, b: u8) {
        self.led.set_colour(r, g, b);
    }

    fn set_network_led(&mut self, on: bool) {
        self.network_led.set(on);
    }

    fn all_off(&mut self) {
        self.buzzer.set(false);
        self.led.off();
        self.network_led.set(false);
    }
}
