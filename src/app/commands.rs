//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (device twin,
//! direct methods, update agent) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! They travel through the same [`EventQueue`](crate::events::EventQueue)
//! as timer events, so a remote write is always applied before any timer
//! handler queued after it.

use crate::twin::TwinWrite;
use crate::update_gate::UpdateRequest;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Desired-property write from the device twin.
    TwinWrite(TwinWrite),

    /// An accepted direct method call.
    DirectMethod(DirectMethod),

    /// The update agent has an update pending.
    UpdateAvailable(UpdateRequest),
}

/// Direct methods exposed by the device.  Names are stable across
/// firmware versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMethod {
    /// Schedule a delayed restart; no arguments.
    RestartDevice,
}

impl DirectMethod {
    pub const ALL: [Self; 1] = [Self::RestartDevice];

    pub fn name(self) -> &'static str {
        match self {
            Self::RestartDevice => "RestartDevice",
        }
    }

    /// Look up a method by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}
