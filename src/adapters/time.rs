//! ESP32 time adapter.
//!
//! Provides the monotonic clock that drives the scheduler and the
//! wall-clock startup timestamp reported as `StartupUtc`.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic) and
//!   `gettimeofday()` for wall time.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   `SystemTime` for host-side testing and simulation.

use chrono::DateTime;

use crate::scheduler::Millis;

/// Wall clock before this (2020-01-01) is treated as unsynced.
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> Millis {
        // SAFETY: esp_timer_get_time reads a free-running hardware counter.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as Millis / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }

    /// Seconds since the Unix epoch.  `None` if the wall clock is not
    /// synced yet.
    #[cfg(target_os = "espidf")]
    pub fn unix_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        let secs = tv.tv_sec as i64;
        (secs >= EPOCH_2020).then_some(secs)
    }

    /// Seconds since the Unix epoch.  `None` if the wall clock is not
    /// synced yet.
    #[cfg(not(target_os = "espidf"))]
    pub fn unix_secs(&self) -> Option<i64> {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();
        let secs = i64::try_from(secs).ok()?;
        (secs >= EPOCH_2020).then_some(secs)
    }

    /// Value for the `StartupUtc` reported property.
    pub fn startup_utc(&self) -> String {
        self.unix_secs()
            .and_then(format_utc)
            .unwrap_or_else(|| "unsynced".to_string())
    }
}

/// ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SSZ`) for `epoch_secs`.
/// `None` if the instant is outside chrono's representable range.
pub fn format_utc(epoch_secs: i64) -> Option<String> {
    let at = DateTime::from_timestamp(epoch_secs, 0)?;
    Some(at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
