//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensor bus, actuators, cloud transport, watchdog and
//! update agent, event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware or the network directly.
//!
//! Every port method is a short, bounded operation: a bus transaction, a
//! GPIO write, or a send enqueue.  None of them may block waiting on the
//! network.

use serde_json::{Map, Value};

use crate::error::{SensorError, TransportError};
use crate::scheduler::TimerId;
use crate::telemetry::RawReading;
use crate::twin::TwinWrite;
use crate::update_gate::{UpdateDecision, UpdateRequest};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// One raw CO2 / temperature / humidity / pressure reading.
    fn read_raw(&mut self) -> Result<RawReading, SensorError>;

    /// `true` once per physical press of the quiet-mode button
    /// (edge-detected by the adapter).
    fn button_pressed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Switch the alarm buzzer.
    fn set_buzzer(&mut self, on: bool);

    /// Set the tri-colour status LED.
    fn set_status_led(&mut self, r: u8, g: u8, b: u8);

    /// Switch the network-status LED.
    fn set_network_led(&mut self, on: bool);

    /// Kill every actuator: safe shutdown before restart.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Cloud port (driven adapter: domain ↔ device twin / telemetry)
// ───────────────────────────────────────────────────────────────

/// Application property attached to every telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageProperty {
    pub key: &'static str,
    pub value: &'static str,
}

/// Content properties attached to every telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentProperties {
    pub encoding: &'static str,
    pub content_type: &'static str,
}

/// Message routing properties for telemetry.
pub const TELEMETRY_PROPERTIES: [MessageProperty; 3] = [
    MessageProperty { key: "appid", value: "co2monitor" },
    MessageProperty { key: "type", value: "telemetry" },
    MessageProperty { key: "schema", value: "1" },
];

pub const TELEMETRY_CONTENT: ContentProperties = ContentProperties {
    encoding: "utf-8",
    content_type: "application/json",
};

/// Response to a direct method call.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResponse {
    /// HTTP-style status code (200, 404, 503).
    pub status: u16,
    pub payload: Value,
}

impl MethodResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            status: 200,
            payload: serde_json::json!({ "message": message }),
        }
    }

    pub fn not_found(method: &str) -> Self {
        Self {
            status: 404,
            payload: serde_json::json!({ "message": format!("Unknown method '{method}'") }),
        }
    }
}

/// Messages arriving asynchronously from the cloud transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Desired-property write on the device twin.
    TwinWrite(TwinWrite),
    /// Direct method invocation awaiting a synchronous response.
    MethodCall {
        request_id: u32,
        name: heapless::String<32>,
        payload: Value,
    },
}

/// Telemetry publish, twin reporting, and inbound message delivery.
pub trait CloudPort {
    /// Whether the transport currently has a cloud connection.
    fn is_connected(&self) -> bool;

    /// Enqueue a telemetry message.
    fn publish_telemetry(
        &mut self,
        payload: &str,
        properties: &[MessageProperty],
        content: &ContentProperties,
    ) -> Result<(), TransportError>;

    /// Enqueue a reported-property patch.
    fn report_properties(&mut self, properties: &Map<String, Value>) -> Result<(), TransportError>;

    /// Next message that arrived since the last poll, if any.
    fn poll_inbound(&mut self) -> Option<Inbound>;

    /// Answer the direct method identified by `request_id`.
    fn respond_method(&mut self, request_id: u32, response: &MethodResponse);
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: domain ↔ watchdog / update agent)
// ───────────────────────────────────────────────────────────────

/// Liveness and update-negotiation hooks provided by the platform.
pub trait SystemPort {
    /// Assert to the external watchdog that the process is alive.
    fn kick_watchdog(&mut self);

    /// A pending software update the platform wants to install, if any.
    fn poll_update_request(&mut self) -> Option<UpdateRequest>;

    /// Hand the gate's decision back to the update agent.
    fn respond_update(&mut self, decision: UpdateDecision);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, test
/// recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event queue)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a timer fires.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue.  The event loop implements this by pushing
/// [`Event::Timer`](crate::events::Event::Timer), but the scheduler itself
/// knows nothing about events or handlers.
pub trait SchedulerDelegate {
    fn on_timer_fired(&mut self, id: TimerId);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Every driven adapter the service talks to, owned together so the
/// event loop can lend them to one handler at a time.
///
/// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`], which
/// avoids a double mutable borrow of the board.
pub struct Ports<H, C, S, E> {
    pub hw: H,
    pub cloud: C,
    pub system: S,
    pub sink: E,
}
