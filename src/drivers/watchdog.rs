//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the event loop stops
//! asserting liveness for longer than the configured timeout.
//!
//! Kicks come only from the `Watchdog` timer handler, and only when the
//! liveness supervisor agrees, so a wedged sensor also ends in a reset.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::InitError;

pub struct Watchdog {
    timeout_ms: u32,
    feeds: u32,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the current task.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Result<Self, InitError> {
        // SAFETY: called once from main() before the event loop starts.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!(
                    "TWDT reconfigure returned {} (may already be configured)",
                    ret
                );
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            if ret != ESP_OK {
                return Err(InitError::WatchdogConfigFailed(ret));
            }
        }
        info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
        Ok(Self { timeout_ms, feeds: 0 })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Result<Self, InitError> {
        log::info!("Watchdog(sim): {}ms timeout, no-op", timeout_ms);
        Ok(Self { timeout_ms, feeds: 0 })
    }

    /// Feed the watchdog.
    pub fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        // SAFETY: the current task was subscribed in new().
        unsafe {
            esp_task_wdt_reset();
        }
        self.feeds = self.feeds.wrapping_add(1);
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn feed_count(&self) -> u32 {
        self.feeds
    }
}
