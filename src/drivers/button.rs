//! Polled push-button driver with press-edge detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with external pull-up.  The `ReadButtons`
//! timer polls the level every 100 ms; a press is reported once, on the
//! released→pressed edge.  The poll interval is longer than switch bounce,
//! so no separate debounce stage is needed.

use crate::drivers::hw_init;

pub struct ButtonDriver {
    gpio: i32,
    was_down: bool,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            was_down: false,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Current level, `true` while held.
    pub fn is_down(&self) -> bool {
        !hw_init::gpio_read(self.gpio)
    }

    /// `true` exactly once per press.
    pub fn poll_press(&mut self) -> bool {
        let down = self.is_down();
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}
