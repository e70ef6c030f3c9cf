//! Sensor sampling, altitude compensation and session maxima.
//!
//! The [`Sampler`] turns one raw reading into a [`TelemetrySample`]:
//!
//! ```text
//!   SensorPort::read_raw ──▶ plausibility check ──▶ altitude compensation
//!                                                      │
//!                                   TelemetrySample ◀──┘
//! ```
//!
//! The SCD30 assumes sea-level pressure unless told otherwise, so CO2 is
//! scaled by the ratio of standard pressure to the barometric pressure
//! expected at the configured altitude.  The same ratio reduces the
//! station pressure from the LPS22HH to sea level for reporting.

use serde::Serialize;

use crate::app::ports::SensorPort;
use crate::config::{MAX_ALTITUDE_M, MIN_ALTITUDE_M};
use crate::error::{SensorError, ValidationError};
use crate::scheduler::Millis;

/// Standard sea-level pressure (hPa).
pub const SEA_LEVEL_HPA: f32 = 1013.25;

// Physically plausible envelope of the sensor pair.
const CO2_RANGE_PPM: core::ops::RangeInclusive<f32> = 0.0..=40_000.0;
const TEMPERATURE_RANGE_C: core::ops::RangeInclusive<f32> = -40.0..=125.0;
const HUMIDITY_RANGE_PCT: core::ops::RangeInclusive<f32> = 0.0..=100.0;
const PRESSURE_RANGE_HPA: core::ops::RangeInclusive<f32> = 260.0..=1260.0;

/// One uncompensated reading straight off the bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub co2_ppm: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// Station (uncorrected) pressure.
    pub pressure_hpa: f32,
}

/// One validated, altitude-compensated sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// Sea-level-reduced pressure.
    pub pressure_hpa: f32,
    pub co2_ppm: i32,
    pub timestamp: Millis,
}

/// Expected barometric pressure at `altitude_m`, standard atmosphere.
pub fn pressure_at_altitude(altitude_m: i32) -> f32 {
    SEA_LEVEL_HPA * (1.0 - 2.255_77e-5 * altitude_m as f32).powf(5.255_88)
}

/// Multiplier applied to CO2 and station pressure for `altitude_m`.
pub fn compensation_factor(altitude_m: i32) -> f32 {
    SEA_LEVEL_HPA / pressure_at_altitude(altitude_m)
}

// ═══════════════════════════════════════════════════════════════
//  Sampler
// ═══════════════════════════════════════════════════════════════

/// Reads and compensates sensor data.  The altitude is the only state
/// and is changed through the twin.
pub struct Sampler {
    altitude_m: i32,
    factor: f32,
}

impl Sampler {
    pub fn new(altitude_m: i32) -> Self {
        Self {
            altitude_m,
            factor: compensation_factor(altitude_m),
        }
    }

    pub fn altitude_m(&self) -> i32 {
        self.altitude_m
    }

    /// Replace the installation altitude.  Applies from the next sample.
    pub fn set_altitude(&mut self, altitude_m: i32) -> Result<(), ValidationError> {
        if !(MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&altitude_m) {
            return Err(ValidationError::OutOfRange);
        }
        self.altitude_m = altitude_m;
        self.factor = compensation_factor(altitude_m);
        Ok(())
    }

    /// Take one sample.  On error nothing is produced and no state changes.
    pub fn sample(
        &self,
        sensor: &mut impl SensorPort,
        now: Millis,
    ) -> Result<TelemetrySample, SensorError> {
        let raw = sensor.read_raw()?;
        self.compensate(&raw, now)
    }

    /// Validate and compensate one raw reading.
    pub fn compensate(&self, raw: &RawReading, now: Millis) -> Result<TelemetrySample, SensorError> {
        let plausible = CO2_RANGE_PPM.contains(&raw.co2_ppm)
            && TEMPERATURE_RANGE_C.contains(&raw.temperature_c)
            && HUMIDITY_RANGE_PCT.contains(&raw.humidity_pct)
            && PRESSURE_RANGE_HPA.contains(&raw.pressure_hpa);
        if !plausible {
            return Err(SensorError::OutOfRange);
        }

        Ok(TelemetrySample {
            temperature_c: raw.temperature_c,
            humidity_pct: raw.humidity_pct,
            pressure_hpa: raw.pressure_hpa * self.factor,
            co2_ppm: (raw.co2_ppm * self.factor).round() as i32,
            timestamp: now,
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Session maxima
// ═══════════════════════════════════════════════════════════════

/// Running per-field maxima since boot.  `None` until the first sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionMaxima {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub pressure_hpa: Option<f32>,
    pub co2_ppm: Option<i32>,
}

impl SessionMaxima {
    pub fn update(&mut self, sample: &TelemetrySample) {
        fn raise<T: PartialOrd + Copy>(slot: &mut Option<T>, v: T) {
            match slot {
                Some(max) if *max >= v => {}
                _ => *slot = Some(v),
            }
        }
        raise(&mut self.temperature_c, sample.temperature_c);
        raise(&mut self.humidity_pct, sample.humidity_pct);
        raise(&mut self.pressure_hpa, sample.pressure_hpa);
        raise(&mut self.co2_ppm, sample.co2_ppm);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Telemetry payload
// ═══════════════════════════════════════════════════════════════

/// JSON body of the periodic telemetry message.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryPayload {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    #[serde(rename = "co2")]
    pub co2_ppm: i32,
}

impl From<&TelemetrySample> for TelemetryPayload {
    fn from(s: &TelemetrySample) -> Self {
        Self {
            temperature: s.temperature_c,
            humidity: s.humidity_pct,
            pressure: s.pressure_hpa,
            co2_ppm: s.co2_ppm,
        }
    }
}

impl TelemetryPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(co2: f32) -> RawReading {
        RawReading {
            co2_ppm: co2,
            temperature_c: 21.5,
            humidity_pct: 40.0,
            pressure_hpa: 1000.0,
        }
    }

    #[test]
    fn sea_level_is_uncompensated() {
        let s = Sampler::new(0).compensate(&raw(800.0), 7).unwrap();
        assert_eq!(s.co2_ppm, 800);
        assert!((s.pressure_hpa - 1000.0).abs() < 0.01);
        assert_eq!(s.timestamp, 7);
    }

    #[test]
    fn altitude_raises_co2_and_pressure() {
        // ~1500 m: standard pressure is roughly 845 hPa.
        let p = pressure_at_altitude(1500);
        assert!((p - 845.6).abs() < 1.0, "p = {p}");

        let s = Sampler::new(1500).compensate(&raw(800.0), 0).unwrap();
        assert!(s.co2_ppm > 950 && s.co2_ppm < 970, "co2 = {}", s.co2_ppm);
        assert!(s.pressure_hpa > 1190.0);
    }

    #[test]
    fn below_sea_level_lowers_co2() {
        let s = Sampler::new(-400).compensate(&raw(800.0), 0).unwrap();
        assert!(s.co2_ppm < 800);
    }

    #[test]
    fn implausible_reading_rejected() {
        let sampler = Sampler::new(0);
        assert_eq!(
            sampler.compensate(&raw(-5.0), 0),
            Err(SensorError::OutOfRange)
        );
        let mut r = raw(800.0);
        r.humidity_pct = 130.0;
        assert_eq!(sampler.compensate(&r, 0), Err(SensorError::OutOfRange));
        r = raw(f32::NAN);
        assert_eq!(sampler.compensate(&r, 0), Err(SensorError::OutOfRange));
    }

    #[test]
    fn altitude_range_enforced() {
        let mut sampler = Sampler::new(0);
        assert_eq!(sampler.set_altitude(9_001), Err(ValidationError::OutOfRange));
        assert_eq!(sampler.set_altitude(-501), Err(ValidationError::OutOfRange));
        assert_eq!(sampler.altitude_m(), 0);
        assert_eq!(sampler.set_altitude(350), Ok(()));
        assert_eq!(sampler.altitude_m(), 350);
    }

    #[test]
    fn maxima_track_each_field_independently() {
        let sampler = Sampler::new(0);
        let mut max = SessionMaxima::default();
        assert_eq!(max.co2_ppm, None);

        let mut a = raw(900.0);
        a.temperature_c = 25.0;
        max.update(&sampler.compensate(&a, 0).unwrap());

        let mut b = raw(700.0);
        b.temperature_c = 27.0;
        max.update(&sampler.compensate(&b, 1).unwrap());

        assert_eq!(max.co2_ppm, Some(900));
        assert_eq!(max.temperature_c, Some(27.0));
    }

    #[test]
    fn payload_field_names() {
        let s = Sampler::new(0).compensate(&raw(812.0), 0).unwrap();
        let json = TelemetryPayload::from(&s).to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["co2"], 812);
        assert_eq!(v["temperature"], 21.5);
        assert!(v.get("timestamp").is_none());
    }
}
