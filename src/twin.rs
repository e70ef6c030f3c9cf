//! Device-twin synchronizer.
//!
//! Outbound: every push builds the full reported property set, diffs it
//! against the mirror of what the cloud last accepted, and sends only the
//! changed fields.  A transport failure leaves the mirror untouched so the
//! next push retries the same delta.
//!
//! Inbound: desired-property writes are validated and applied to the alert
//! level or the altitude.  Every write gets an acknowledgment carrying the
//! value actually in effect:
//!
//! ```json
//! { "AlertLevel": { "value": 1200, "ac": 200, "av": 7, "ad": "completed" } }
//! ```

use core::fmt;

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::alarm::AlarmMachine;
use crate::app::ports::CloudPort;
use crate::config::FIRMWARE_VERSION;
use crate::error::{TransportError, ValidationError};
use crate::telemetry::{Sampler, SessionMaxima, TelemetrySample};

// ═══════════════════════════════════════════════════════════════
//  Property registry
// ═══════════════════════════════════════════════════════════════

/// Every twin property the device knows.  Names are the wire names and
/// are stable across firmware versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwinProperty {
    AlertLevel,
    AltitudeInMeters,
    Temperature,
    Humidity,
    Pressure,
    CarbonDioxide,
    MaxTemperature,
    MaxHumidity,
    MaxPressure,
    MaxCarbonDioxide,
    StartupUtc,
    SoftwareVersion,
    DeferredUpdateRequest,
}

impl TwinProperty {
    pub const ALL: [Self; 13] = [
        Self::AlertLevel,
        Self::AltitudeInMeters,
        Self::Temperature,
        Self::Humidity,
        Self::Pressure,
        Self::CarbonDioxide,
        Self::MaxTemperature,
        Self::MaxHumidity,
        Self::MaxPressure,
        Self::MaxCarbonDioxide,
        Self::StartupUtc,
        Self::SoftwareVersion,
        Self::DeferredUpdateRequest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AlertLevel => "AlertLevel",
            Self::AltitudeInMeters => "AltitudeInMeters",
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pressure => "Pressure",
            Self::CarbonDioxide => "CarbonDioxide",
            Self::MaxTemperature => "MaxTemperature",
            Self::MaxHumidity => "MaxHumidity",
            Self::MaxPressure => "MaxPressure",
            Self::MaxCarbonDioxide => "MaxCarbonDioxide",
            Self::StartupUtc => "StartupUtc",
            Self::SoftwareVersion => "SoftwareVersion",
            Self::DeferredUpdateRequest => "DeferredUpdateRequest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Only the alert level and the altitude accept remote writes.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::AlertLevel | Self::AltitudeInMeters)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Inbound writes and acknowledgments
// ═══════════════════════════════════════════════════════════════

/// One desired-property write as delivered by the cloud transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TwinWrite {
    pub name: heapless::String<32>,
    pub value: Value,
    /// Desired-properties version the write belongs to.
    pub version: u32,
}

impl TwinWrite {
    /// Build a write, truncating over-long names (they can never match a
    /// known property and are acknowledged as unknown).
    pub fn new(name: &str, value: Value, version: u32) -> Self {
        let mut n = heapless::String::new();
        for c in name.chars() {
            if n.push(c).is_err() {
                break;
            }
        }
        Self {
            name: n,
            value,
            version,
        }
    }
}

/// Acknowledgment status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Completed,
    Rejected,
    NotFound,
}

impl AckStatus {
    pub const fn code(self) -> u16 {
        match self {
            Self::Completed => 200,
            Self::Rejected => 400,
            Self::NotFound => 404,
        }
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Response to a single desired-property write.
#[derive(Debug, Clone, PartialEq)]
pub struct TwinAck {
    pub name: heapless::String<32>,
    /// Value in effect after the write (the retained one on rejection).
    pub value: Value,
    pub version: u32,
    pub status: AckStatus,
    pub error: Option<ValidationError>,
}

impl TwinAck {
    fn completed(write: &TwinWrite, value: i32) -> Self {
        Self {
            name: write.name.clone(),
            value: Value::from(value),
            version: write.version,
            status: AckStatus::Completed,
            error: None,
        }
    }

    fn rejected(write: &TwinWrite, value: Value, error: ValidationError) -> Self {
        let status = match error {
            ValidationError::UnknownProperty => AckStatus::NotFound,
            _ => AckStatus::Rejected,
        };
        Self {
            name: write.name.clone(),
            value,
            version: write.version,
            status,
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AckStatus::Completed
    }

    /// Reported-property patch carrying this acknowledgment.
    pub fn to_report(&self) -> Map<String, Value> {
        let description = match self.error {
            None => "completed".to_string(),
            Some(e) => e.to_string(),
        };
        let mut body = Map::new();
        body.insert("value".into(), self.value.clone());
        body.insert("ac".into(), Value::from(self.status.code()));
        body.insert("av".into(), Value::from(self.version));
        body.insert("ad".into(), Value::from(description));

        let mut patch = Map::new();
        patch.insert(self.name.as_str().into(), Value::Object(body));
        patch
    }
}

/// Parse an integer property value.  Floats with no fractional part are
/// accepted (`1200.0`), anything else is a type error.
fn int_value(value: &Value) -> Result<i64, ValidationError> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        Some(_) | None => Err(ValidationError::WrongType),
    }
}

fn to_i32(v: i64) -> Result<i32, ValidationError> {
    i32::try_from(v).map_err(|_| ValidationError::OutOfRange)
}

// ═══════════════════════════════════════════════════════════════
//  Reported state
// ═══════════════════════════════════════════════════════════════

/// Snapshot of every reported property.  `None` fields are omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedState {
    pub alert_level_ppm: i32,
    pub altitude_m: i32,
    pub latest: Option<TelemetrySample>,
    pub maxima: SessionMaxima,
    pub startup_utc: String,
    pub software_version: &'static str,
    pub deferred_update: Option<String>,
}

impl ReportedState {
    /// Flatten into wire form.  Measurements are reported as integers.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |p: TwinProperty, v: Value| {
            map.insert(p.name().into(), v);
        };
        let round = |v: f32| Value::from(v.round() as i64);

        put(TwinProperty::AlertLevel, self.alert_level_ppm.into());
        put(TwinProperty::AltitudeInMeters, self.altitude_m.into());
        if let Some(s) = &self.latest {
            put(TwinProperty::Temperature, round(s.temperature_c));
            put(TwinProperty::Humidity, round(s.humidity_pct));
            put(TwinProperty::Pressure, round(s.pressure_hpa));
            put(TwinProperty::CarbonDioxide, s.co2_ppm.into());
        }
        if let Some(v) = self.maxima.temperature_c {
            put(TwinProperty::MaxTemperature, round(v));
        }
        if let Some(v) = self.maxima.humidity_pct {
            put(TwinProperty::MaxHumidity, round(v));
        }
        if let Some(v) = self.maxima.pressure_hpa {
            put(TwinProperty::MaxPressure, round(v));
        }
        if let Some(v) = self.maxima.co2_ppm {
            put(TwinProperty::MaxCarbonDioxide, v.into());
        }
        put(TwinProperty::StartupUtc, self.startup_utc.clone().into());
        put(TwinProperty::SoftwareVersion, self.software_version.into());
        if let Some(d) = &self.deferred_update {
            put(TwinProperty::DeferredUpdateRequest, d.clone().into());
        }
        map
    }
}

/// Outcome of a periodic push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing changed since the last accepted report.
    Suppressed,
    /// This many properties were sent.
    Sent(usize),
}

// ═══════════════════════════════════════════════════════════════
//  Synchronizer
// ═══════════════════════════════════════════════════════════════

/// Owns the twin mirror and the static and deferral metadata.
pub struct TwinSync {
    /// Last reported value per property, as accepted by the transport.
    mirror: Map<String, Value>,
    startup_utc: String,
    deferred_update: Option<String>,
}

impl TwinSync {
    pub fn new(startup_utc: String) -> Self {
        Self {
            mirror: Map::new(),
            startup_utc,
            deferred_update: None,
        }
    }

    /// Record the latest update-gate decision for reporting.
    pub fn record_deferral(&mut self, description: String) {
        self.deferred_update = Some(description);
    }

    pub fn deferred_update(&self) -> Option<&str> {
        self.deferred_update.as_deref()
    }

    /// Assemble the current reported state.
    pub fn reported_state(
        &self,
        alarm: &AlarmMachine,
        sampler: &Sampler,
        latest: Option<&TelemetrySample>,
        maxima: &SessionMaxima,
    ) -> ReportedState {
        ReportedState {
            alert_level_ppm: alarm.threshold(),
            altitude_m: sampler.altitude_m(),
            latest: latest.copied(),
            maxima: *maxima,
            startup_utc: self.startup_utc.clone(),
            software_version: FIRMWARE_VERSION,
            deferred_update: self.deferred_update.clone(),
        }
    }

    /// Fields of `state` that differ from the mirror.
    pub fn delta(&self, state: &ReportedState) -> Map<String, Value> {
        state
            .to_map()
            .into_iter()
            .filter(|(k, v)| self.mirror.get(k) != Some(v))
            .collect()
    }

    /// Send the delta, updating the mirror only if the transport accepts it.
    pub fn push(
        &mut self,
        state: &ReportedState,
        cloud: &mut impl CloudPort,
    ) -> Result<PushOutcome, TransportError> {
        let delta = self.delta(state);
        if delta.is_empty() {
            debug!("TWIN: no changes, push suppressed");
            return Ok(PushOutcome::Suppressed);
        }

        let count = delta.len();
        cloud.report_properties(&delta)?;
        self.mirror.extend(delta);
        Ok(PushOutcome::Sent(count))
    }

    /// Validate and apply one desired-property write.  Always returns an
    /// acknowledgment; on rejection the previous value stays in force.
    pub fn apply_write(
        &mut self,
        write: &TwinWrite,
        alarm: &mut AlarmMachine,
        sampler: &mut Sampler,
    ) -> TwinAck {
        let Some(property) = TwinProperty::from_name(&write.name) else {
            warn!("TWIN: write to unknown property '{}'", write.name);
            return TwinAck::rejected(write, Value::Null, ValidationError::UnknownProperty);
        };
        if !property.is_writable() {
            warn!("TWIN: write to read-only property '{}'", write.name);
            let current = self.mirror.get(property.name()).cloned().unwrap_or(Value::Null);
            return TwinAck::rejected(write, current, ValidationError::ReadOnly);
        }

        let (result, in_effect) = match property {
            TwinProperty::AlertLevel => {
                let r = int_value(&write.value)
                    .and_then(to_i32)
                    .and_then(|v| alarm.set_threshold(v));
                (r, alarm.threshold())
            }
            TwinProperty::AltitudeInMeters => {
                let r = int_value(&write.value)
                    .and_then(to_i32)
                    .and_then(|v| sampler.set_altitude(v));
                (r, sampler.altitude_m())
            }
            _ => (Err(ValidationError::ReadOnly), 0),
        };

        match result {
            Ok(()) => {
                info!("TWIN: {} = {} (v{})", write.name, in_effect, write.version);
                TwinAck::completed(write, in_effect)
            }
            Err(e) => {
                warn!(
                    "TWIN: rejected {} = {} ({}), keeping {}",
                    write.name, write.value, e, in_effect
                );
                TwinAck::rejected(write, Value::from(in_effect), e)
            }
        }
    }

    /// Send an acknowledgment.  A completed write also settles the mirror
    /// so the next periodic push does not repeat it.  A rejection replaced
    /// the upstream value with the ack body, so the mirror entry is dropped
    /// and the next push restores the plain value.
    pub fn send_ack(
        &mut self,
        ack: &TwinAck,
        cloud: &mut impl CloudPort,
    ) -> Result<(), TransportError> {
        cloud.report_properties(&ack.to_report())?;
        if ack.is_completed() {
            self.mirror.insert(ack.name.as_str().into(), ack.value.clone());
        } else {
            self.mirror.remove(ack.name.as_str());
        }
        Ok(())
    }
}
