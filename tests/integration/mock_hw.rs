//! Mock adapters for integration tests.
//!
//! Records every actuator call and cloud interaction so tests can assert
//! on the full history without touching real GPIO, PWM or a network.

use std::collections::VecDeque;

use co2monitor::app::events::AppEvent;
use co2monitor::app::ports::{
    ActuatorPort, CloudPort, ContentProperties, EventSink, Inbound, MessageProperty,
    MethodResponse, Ports, SensorPort, SystemPort,
};
use co2monitor::config::SystemConfig;
use co2monitor::error::{SensorError, TransportError};
use co2monitor::runtime::EventLoop;
use co2monitor::scheduler::Millis;
use co2monitor::telemetry::RawReading;
use co2monitor::update_gate::{UpdateDecision, UpdateRequest};
use serde_json::{Map, Value};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Buzzer(bool),
    StatusLed { r: u8, g: u8, b: u8 },
    NetworkLed(bool),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

/// Sensor that always returns `co2` (or `fail`), plus an actuator log.
pub struct MockHardware {
    pub co2: f32,
    pub fail: Option<SensorError>,
    pub presses: VecDeque<bool>,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            co2: 600.0,
            fail: None,
            presses: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    pub fn buzzer_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Buzzer(on) => Some(*on),
                ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn buzzer_pulses(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == ActuatorCall::Buzzer(true))
            .count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_raw(&mut self) -> Result<RawReading, SensorError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        Ok(RawReading {
            co2_ppm: self.co2,
            temperature_c: 22.0,
            humidity_pct: 45.0,
            pressure_hpa: 1013.25,
        })
    }

    fn button_pressed(&mut self) -> bool {
        self.presses.pop_front().unwrap_or(false)
    }
}

impl ActuatorPort for MockHardware {
    fn set_buzzer(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Buzzer(on));
    }

    fn set_status_led(&mut self, r: u8, g: u8, b: u8) {
        self.calls.push(ActuatorCall::StatusLed { r, g, b });
    }

    fn set_network_led(&mut self, on: bool) {
        self.calls.push(ActuatorCall::NetworkLed(on));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

// ── MockCloud ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCloud {
    pub connected: bool,
    pub fail: bool,
    pub inbound: VecDeque<Inbound>,
    pub telemetry: Vec<String>,
    pub reports: Vec<Map<String, Value>>,
    pub responses: Vec<(u32, MethodResponse)>,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn online() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Acknowledgment bodies reported for `name`, oldest first.
    pub fn acks_for(&self, name: &str) -> Vec<Value> {
        self.reports
            .iter()
            .filter_map(|r| r.get(name))
            .filter(|v| v.get("ac").is_some())
            .cloned()
            .collect()
    }
}

impl CloudPort for MockCloud {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish_telemetry(
        &mut self,
        payload: &str,
        _properties: &[MessageProperty],
        _content: &ContentProperties,
    ) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::SendFailed);
        }
        self.telemetry.push(payload.to_string());
        Ok(())
    }

    fn report_properties(&mut self, properties: &Map<String, Value>) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::SendFailed);
        }
        self.reports.push(properties.clone());
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<Inbound> {
        self.inbound.pop_front()
    }

    fn respond_method(&mut self, request_id: u32, response: &MethodResponse) {
        self.responses.push((request_id, response.clone()));
    }
}

// ── MockSystem ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSystem {
    pub kicks: u32,
    pub pending: Option<UpdateRequest>,
    pub decisions: Vec<UpdateDecision>,
}

impl SystemPort for MockSystem {
    fn kick_watchdog(&mut self) {
        self.kicks += 1;
    }

    fn poll_update_request(&mut self) -> Option<UpdateRequest> {
        self.pending.take()
    }

    fn respond_update(&mut self, decision: UpdateDecision) {
        self.decisions.push(decision);
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestLoop = EventLoop<MockHardware, MockCloud, MockSystem, RecordingSink>;

pub fn make_loop(config: SystemConfig, cloud: MockCloud) -> TestLoop {
    let io = Ports {
        hw: MockHardware::new(),
        cloud,
        system: MockSystem::default(),
        sink: RecordingSink::default(),
    };
    EventLoop::new(config, "2026-03-01T08:00:00Z".into(), io, 0).unwrap()
}

/// Step every `step_ms` from `from` through `to` inclusive.
#[allow(dead_code)]
pub fn run(lp: &mut TestLoop, from: Millis, to: Millis, step_ms: u64) {
    let mut t = from;
    while t <= to {
        lp.step(t);
        t += step_ms;
    }
}
