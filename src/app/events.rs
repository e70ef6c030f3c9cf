//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder).

use crate::alarm::AlarmState;
use crate::error::{SensorError, TransportError};
use crate::supervisor::{ExitCode, LivenessFault};
use crate::telemetry::TelemetrySample;
use crate::twin::{AckStatus, PushOutcome};
use crate::update_gate::{UpdateDecision, UpdateKind};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started.
    Started {
        alert_level_ppm: i32,
        altitude_m: i32,
    },

    /// A telemetry message was handed to the transport.
    TelemetryPublished(TelemetrySample),

    /// A telemetry message was dropped.
    TelemetryDropped(TransportError),

    /// The alarm FSM transitioned between states.
    AlarmChanged {
        from: AlarmState,
        to: AlarmState,
        co2_ppm: i32,
        threshold_ppm: i32,
    },

    /// A sensor read failed.
    SensorFault { error: SensorError, streak: u32 },

    /// A reported-property push completed or was suppressed.
    TwinReported(PushOutcome),

    /// A reported-property push or acknowledgment was dropped.
    TwinReportDropped(TransportError),

    /// A desired-property write was handled.
    TwinWriteAcked {
        name: heapless::String<32>,
        status: AckStatus,
        in_effect: serde_json::Value,
    },

    /// The update gate answered the update agent.
    UpdateDecided {
        kind: UpdateKind,
        decision: UpdateDecision,
    },

    /// Quiet mode was toggled from the button.
    QuietModeChanged(bool),

    /// The cloud link came up or went down.
    ConnectionChanged(bool),

    /// The hardware watchdog was kicked.
    WatchdogKicked,

    /// A liveness check failed.
    LivenessFailed(LivenessFault),

    /// A delayed restart has been scheduled.
    RestartScheduled(ExitCode),
}
