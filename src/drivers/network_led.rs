//! Network-status LED (single GPIO, active-low).

use crate::drivers::hw_init;
use crate::pins;

pub struct NetworkLed {
    gpio: i32,
    on: bool,
}

impl Default for NetworkLed {
    fn default() -> Self {
        Self::new(pins::NETWORK_LED_GPIO)
    }
}

impl NetworkLed {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, on: false }
    }

    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(self.gpio, !on);
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
