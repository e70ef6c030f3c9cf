//! Deferred-update gate.
//!
//! The platform's update agent asks before installing a pending update.
//! While the alarm is sounding the answer is always "defer"; an update
//! restart in the middle of an alert would silence it.

use core::fmt;

use crate::alarm::AlarmState;
use crate::scheduler::Millis;

/// What kind of update the agent wants to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Application,
    System,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => write!(f, "Application"),
            Self::System => write!(f, "System"),
        }
    }
}

/// A pending update notification.  Consumed by [`UpdateGate::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    pub kind: UpdateKind,
    pub requested_at: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    Accept,
    Defer { retry_after_ms: u32 },
}

impl UpdateDecision {
    pub fn is_deferred(self) -> bool {
        matches!(self, Self::Defer { .. })
    }
}

/// Stateless apart from the retry interval.
pub struct UpdateGate {
    defer_retry_ms: u32,
}

impl UpdateGate {
    pub fn new(defer_retry_ms: u32) -> Self {
        Self { defer_retry_ms }
    }

    pub fn decide(&self, _request: &UpdateRequest, alarm: AlarmState) -> UpdateDecision {
        match alarm {
            AlarmState::Alerting => UpdateDecision::Defer {
                retry_after_ms: self.defer_retry_ms,
            },
            AlarmState::Normal => UpdateDecision::Accept,
        }
    }
}

/// Human-readable record of a decision, reported as
/// `DeferredUpdateRequest`.
pub fn describe(request: &UpdateRequest, decision: UpdateDecision) -> String {
    match decision {
        UpdateDecision::Accept => format!(
            "{} update accepted at uptime {}s",
            request.kind,
            request.requested_at / 1000
        ),
        UpdateDecision::Defer { retry_after_ms } => format!(
            "{} update deferred at uptime {}s (CO2 alert active), retry in {} min",
            request.kind,
            request.requested_at / 1000,
            retry_after_ms / 60_000
        ),
    }
}
