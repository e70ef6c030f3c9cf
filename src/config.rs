//! System configuration parameters
//!
//! Every cadence, bound and default used by the CO2 monitor.  The two
//! remotely writable values (`AlertLevel`, `AltitudeInMeters`) start from
//! the defaults here and are then owned by the alarm machine and the
//! sampler respectively.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Firmware version reported through the `SoftwareVersion` twin property.
pub const FIRMWARE_VERSION: &str = "3.02";

/// Lowest CO2 alert level accepted from the twin (ppm).
pub const MIN_ALERT_LEVEL_PPM: i32 = 1;
/// Highest CO2 alert level accepted from the twin (SCD30 full scale, ppm).
pub const MAX_ALERT_LEVEL_PPM: i32 = 10_000;
/// Accepted altitude range for CO2/pressure compensation (metres).
pub const MIN_ALTITUDE_M: i32 = -500;
pub const MAX_ALTITUDE_M: i32 = 9_000;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Alarm ---
    /// CO2 level (ppm) at or above which the alarm sounds, until the twin
    /// overrides it.
    pub default_alert_level_ppm: i32,
    /// Buzzer pulse period while alerting (milliseconds).
    pub alert_pulse_ms: u32,
    /// How long CO2 must stay below the alert level before the alarm
    /// clears (milliseconds).
    pub alert_cooldown_ms: u32,
    /// Buzzer on-time per pulse (milliseconds).
    pub buzzer_on_ms: u32,

    // --- Calibration ---
    /// Installation altitude until the twin overrides it (metres).
    pub default_altitude_m: i32,

    // --- Timing ---
    /// Delay before the first sensor read after boot (milliseconds).
    pub settle_delay_ms: u32,
    /// Sensor read interval (milliseconds).
    pub sample_interval_ms: u32,
    /// Telemetry publish interval (milliseconds).
    pub publish_interval_ms: u32,
    /// Reported-property push interval (milliseconds).
    pub twin_report_interval_ms: u32,
    /// Button poll interval (milliseconds).
    pub button_poll_ms: u32,
    /// Status LED pattern refresh interval (milliseconds).
    pub status_led_refresh_ms: u32,
    /// Network LED flash period (milliseconds).
    pub network_led_period_ms: u32,
    /// Network LED on-time per flash (milliseconds).
    pub network_led_on_ms: u32,

    // --- Liveness ---
    /// Watchdog kick cadence (milliseconds).
    pub watchdog_interval_ms: u32,
    /// Hardware watchdog timeout (milliseconds).  Must exceed the cadence.
    pub watchdog_timeout_ms: u32,
    /// Consecutive failed sensor reads tolerated before the supervisor
    /// stops kicking and restarts.
    pub max_sensor_failures: u32,
    /// Longest time without a good sample before the supervisor restarts
    /// (milliseconds).
    pub max_sample_age_ms: u32,
    /// Grace period between a restart decision and process exit
    /// (milliseconds).
    pub restart_grace_ms: u32,

    // --- Updates ---
    /// Retry interval handed back when an update is deferred (milliseconds).
    pub defer_retry_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Alarm
            default_alert_level_ppm: 1000,
            alert_pulse_ms: 8_000,
            alert_cooldown_ms: 8_000,
            buzzer_on_ms: 250,

            // Calibration
            default_altitude_m: 0,

            // Timing
            settle_delay_ms: 500,
            sample_interval_ms: 500,
            publish_interval_ms: 60_000,
            twin_report_interval_ms: 30_000,
            button_poll_ms: 100,
            status_led_refresh_ms: 100,
            network_led_period_ms: 500,
            network_led_on_ms: 100,

            // Liveness
            watchdog_interval_ms: 30_000,
            watchdog_timeout_ms: 60_000,
            max_sensor_failures: 60, // 30 s of failed reads at 2 Hz
            max_sample_age_ms: 120_000,
            restart_grace_ms: 5_000,

            // Updates
            defer_retry_ms: 600_000, // 10 min
        }
    }
}

impl SystemConfig {
    /// Reject configurations that would break the timing invariants.
    pub fn validate(&self) -> Result<(), Error> {
        if !(MIN_ALERT_LEVEL_PPM..=MAX_ALERT_LEVEL_PPM).contains(&self.default_alert_level_ppm) {
            return Err(Error::Config("default_alert_level_ppm out of range"));
        }
        if !(MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&self.default_altitude_m) {
            return Err(Error::Config("default_altitude_m out of range"));
        }
        let periods = [
            self.alert_pulse_ms,
            self.buzzer_on_ms,
            self.sample_interval_ms,
            self.publish_interval_ms,
            self.twin_report_interval_ms,
            self.button_poll_ms,
            self.status_led_refresh_ms,
            self.network_led_period_ms,
            self.network_led_on_ms,
            self.watchdog_interval_ms,
        ];
        if periods.contains(&0) {
            return Err(Error::Config("timer periods must be non-zero"));
        }
        if self.watchdog_interval_ms >= self.watchdog_timeout_ms {
            return Err(Error::Config("watchdog cadence must be shorter than its timeout"));
        }
        if self.buzzer_on_ms >= self.alert_pulse_ms {
            return Err(Error::Config("buzzer on-time must be shorter than the pulse period"));
        }
        if self.network_led_on_ms >= self.network_led_period_ms {
            return Err(Error::Config("network LED on-time must be shorter than its period"));
        }
        if self.max_sensor_failures == 0 {
            return Err(Error::Config("max_sensor_failures must be non-zero"));
        }
        Ok(())
    }
}
