//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::twin::PushOutcome;
use crate::update_gate::UpdateDecision;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                alert_level_ppm,
                altitude_m,
            } => {
                info!("START | alert_level={alert_level_ppm}ppm | altitude={altitude_m}m");
            }
            AppEvent::TelemetryPublished(s) => {
                info!(
                    "TELEM | CO2={}ppm | T={:.1}\u{00b0}C | RH={:.1}% | P={:.1}hPa | t={}ms",
                    s.co2_ppm, s.temperature_c, s.humidity_pct, s.pressure_hpa, s.timestamp,
                );
            }
            AppEvent::TelemetryDropped(e) => {
                warn!("TELEM | dropped: {e}");
            }
            AppEvent::AlarmChanged {
                from,
                to,
                co2_ppm,
                threshold_ppm,
            } => {
                info!(
                    "ALARM | {} -> {} | CO2={co2_ppm}ppm threshold={threshold_ppm}ppm",
                    from.name(),
                    to.name()
                );
            }
            AppEvent::SensorFault { error, streak } => {
                warn!("SENSOR | {error} | streak={streak}");
            }
            AppEvent::TwinReported(PushOutcome::Sent(n)) => {
                info!("TWIN | reported {n} propert{}", if *n == 1 { "y" } else { "ies" });
            }
            AppEvent::TwinReported(PushOutcome::Suppressed) => {}
            AppEvent::TwinReportDropped(e) => {
                warn!("TWIN | report dropped: {e}");
            }
            AppEvent::TwinWriteAcked {
                name,
                status,
                in_effect,
            } => {
                info!("TWIN | {name} ack={status} value={in_effect}");
            }
            AppEvent::UpdateDecided { kind, decision } => match decision {
                UpdateDecision::Accept => info!("UPDATE | {kind} update accepted"),
                UpdateDecision::Defer { retry_after_ms } => {
                    info!("UPDATE | {kind} update deferred, retry in {retry_after_ms}ms");
                }
            },
            AppEvent::QuietModeChanged(quiet) => {
                info!("BUTTON | quiet mode {}", if *quiet { "on" } else { "off" });
            }
            AppEvent::ConnectionChanged(up) => {
                info!("NET | {}", if *up { "connected" } else { "disconnected" });
            }
            AppEvent::WatchdogKicked => {
                log::debug!("WDT | kicked");
            }
            AppEvent::LivenessFailed(fault) => {
                warn!("WDT | liveness failed: {fault}");
            }
            AppEvent::RestartScheduled(code) => {
                warn!("RESTART | scheduled, exit code {code}");
            }
        }
    }
}
