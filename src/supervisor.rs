//! Liveness supervisor.
//!
//! The supervisor decides, every watchdog tick, whether the firmware may
//! assert liveness to the hardware watchdog.  It tracks two signals fed by
//! the sampling handler:
//!
//! - the **failure streak**: consecutive sensor reads that failed (a
//!   "not ready" answer is neither a failure nor a success);
//! - the **last good sample** time.
//!
//! ## Restart lifecycle
//!
//! 1. A watchdog tick finds the streak above `max_sensor_failures` or the
//!    newest good sample older than `max_sample_age_ms`.
//! 2. The supervisor latches a restart request with
//!    [`ExitCode::LivenessRestart`] instead of kicking.
//! 3. The service arms the `DelayedRestart` timer; when it fires, the
//!    event loop returns the latched exit code and the process restarts.
//!
//! If the event loop itself stalls, no kick arrives and the hardware
//! watchdog resets the chip after `watchdog_timeout_ms`.

use core::fmt;

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::SensorError;
use crate::scheduler::Millis;

/// Process exit codes.  Distinct per restart cause so the platform's
/// restart logs say why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    RestartRequested = 1,
    LivenessRestart = 2,
    InitFailed = 3,
}

impl ExitCode {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::RestartRequested => "RestartRequested",
            Self::LivenessRestart => "LivenessRestart",
            Self::InitFailed => "InitFailed",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Result of one startup step.  Any failure is logged and becomes
/// [`ExitCode::InitFailed`].
pub fn init_step<T, E: fmt::Display>(what: &str, result: Result<T, E>) -> Result<T, ExitCode> {
    result.map_err(|e| {
        error!("{what} failed: {e}");
        ExitCode::InitFailed
    })
}

/// Why the supervisor refused to kick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessFault {
    /// Too many consecutive failed reads.
    FailureStreak(u32),
    /// No good sample for this long (milliseconds).
    StaleSamples(Millis),
}

impl fmt::Display for LivenessFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailureStreak(n) => write!(f, "{n} consecutive sensor failures"),
            Self::StaleSamples(age) => write!(f, "no good sample for {age}ms"),
        }
    }
}

/// Outcome of one watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    Kick,
    Restart(LivenessFault),
}

/// Liveness supervisor.
pub struct LivenessSupervisor {
    max_failures: u32,
    max_sample_age_ms: Millis,
    failure_streak: u32,
    /// Boot time until the first good sample.
    last_good_sample: Millis,
    pending_restart: Option<ExitCode>,
}

impl LivenessSupervisor {
    pub fn new(config: &SystemConfig, now: Millis) -> Self {
        Self {
            max_failures: config.max_sensor_failures,
            max_sample_age_ms: Millis::from(config.max_sample_age_ms),
            failure_streak: 0,
            last_good_sample: now,
            pending_restart: None,
        }
    }

    pub fn record_sample(&mut self, now: Millis) {
        if self.failure_streak > 0 {
            info!(
                "LIVENESS: sensor recovered after {} failures",
                self.failure_streak
            );
        }
        self.failure_streak = 0;
        self.last_good_sample = now;
    }

    pub fn record_sensor_error(&mut self, err: SensorError) {
        if err.is_failure() {
            self.failure_streak = self.failure_streak.saturating_add(1);
        }
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Evaluate liveness.  Does not latch anything by itself.
    pub fn check(&self, now: Millis) -> LivenessVerdict {
        if self.failure_streak > self.max_failures {
            return LivenessVerdict::Restart(LivenessFault::FailureStreak(self.failure_streak));
        }
        let age = now.saturating_sub(self.last_good_sample);
        if age > self.max_sample_age_ms {
            return LivenessVerdict::Restart(LivenessFault::StaleSamples(age));
        }
        LivenessVerdict::Kick
    }

    /// Latch a restart.  The first request wins; returns `false` if one
    /// was already pending.
    pub fn request_restart(&mut self, code: ExitCode) -> bool {
        if let Some(existing) = self.pending_restart {
            warn!("LIVENESS: restart already pending ({existing}), ignoring {code}");
            return false;
        }
        match code {
            ExitCode::LivenessRestart => error!("LIVENESS: scheduling restart, {code}"),
            _ => info!("LIVENESS: scheduling restart, {code}"),
        }
        self.pending_restart = Some(code);
        true
    }

    pub fn pending_restart(&self) -> Option<ExitCode> {
        self.pending_restart
    }
}
