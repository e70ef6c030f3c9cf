//! Property tests for the alarm, aggregation, update gate and twin write
//! validation.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use co2monitor::alarm::{AlarmMachine, AlarmState};
use co2monitor::telemetry::{Sampler, SessionMaxima, TelemetrySample};
use co2monitor::twin::{AckStatus, TwinSync, TwinWrite};
use co2monitor::update_gate::{UpdateDecision, UpdateGate, UpdateKind, UpdateRequest};
use proptest::prelude::*;
use serde_json::Value;

const THRESHOLD: i32 = 1000;
const COOLDOWN_MS: u32 = 8_000;
const SAMPLE_MS: u64 = 500;

fn sample(t: f32, h: f32, p: f32, co2: i32) -> TelemetrySample {
    TelemetrySample {
        temperature_c: t,
        humidity_pct: h,
        pressure_hpa: p,
        co2_ppm: co2,
        timestamp: 0,
    }
}

// ── Session maxima ────────────────────────────────────────────

proptest! {
    /// Maxima track the true running maximum and never decrease.
    #[test]
    fn maxima_equal_running_max(
        samples in proptest::collection::vec(
            (-40.0f32..125.0, 0.0f32..100.0, 260.0f32..1260.0, 0i32..40_000),
            1..64,
        ),
    ) {
        let mut maxima = SessionMaxima::default();
        let mut prev_co2 = i32::MIN;
        for (i, &(t, h, p, c)) in samples.iter().enumerate() {
            maxima.update(&sample(t, h, p, c));

            let seen = &samples[..=i];
            let max_t = seen.iter().map(|s| s.0).fold(f32::MIN, f32::max);
            let max_c = seen.iter().map(|s| s.3).max().unwrap();
            prop_assert_eq!(maxima.temperature_c, Some(max_t));
            prop_assert_eq!(maxima.co2_ppm, Some(max_c));
            prop_assert!(max_c >= prev_co2);
            prev_co2 = max_c;
        }
    }
}

// ── Alarm hysteresis ──────────────────────────────────────────

proptest! {
    /// At or above threshold the alarm is always on; it only clears after
    /// a full cooldown of consecutive below-threshold samples.
    #[test]
    fn alarm_clears_only_after_full_cooldown(
        readings in proptest::collection::vec(600i32..1400, 1..200),
    ) {
        let mut alarm = AlarmMachine::new(THRESHOLD, COOLDOWN_MS);
        alarm.start(0);
        let window = (u64::from(COOLDOWN_MS) / SAMPLE_MS) as usize;

        for (k, &co2) in readings.iter().enumerate() {
            let now = (k as u64 + 1) * SAMPLE_MS;
            let eval = alarm.evaluate(co2, now);

            if co2 >= THRESHOLD {
                prop_assert_eq!(alarm.state(), AlarmState::Alerting);
            }
            if eval.transition == Some((AlarmState::Alerting, AlarmState::Normal)) {
                prop_assert!(k >= window);
                prop_assert!(readings[k - window..=k].iter().all(|&c| c < THRESHOLD));
            }
        }
    }
}

// ── Update gate ───────────────────────────────────────────────

proptest! {
    /// Alerting always defers; Normal always accepts.
    #[test]
    fn gate_follows_alarm_state(
        requested_at in 0u64..10_000_000,
        alerting in any::<bool>(),
        system in any::<bool>(),
    ) {
        let gate = UpdateGate::new(600_000);
        let request = UpdateRequest {
            kind: if system { UpdateKind::System } else { UpdateKind::Application },
            requested_at,
        };
        let state = if alerting { AlarmState::Alerting } else { AlarmState::Normal };
        let decision = gate.decide(&request, state);
        prop_assert_eq!(decision.is_deferred(), alerting);
        if !alerting {
            prop_assert_eq!(decision, UpdateDecision::Accept);
        }
    }
}

// ── Twin write validation ─────────────────────────────────────

proptest! {
    /// Any integer write to AlertLevel is acknowledged with the value
    /// actually in effect; out-of-range writes keep the old threshold.
    #[test]
    fn alert_level_ack_reports_value_in_effect(value in any::<i64>(), version in any::<u32>()) {
        let mut twin = TwinSync::new("boot".into());
        let mut alarm = AlarmMachine::new(THRESHOLD, COOLDOWN_MS);
        let mut sampler = Sampler::new(0);

        let ack = twin.apply_write(
            &TwinWrite::new("AlertLevel", Value::from(value), version),
            &mut alarm,
            &mut sampler,
        );

        let valid = (1..=10_000).contains(&value);
        let expected = if valid { value as i32 } else { THRESHOLD };
        prop_assert_eq!(alarm.threshold(), expected);
        prop_assert_eq!(ack.value, Value::from(expected));
        prop_assert_eq!(ack.version, version);
        prop_assert_eq!(ack.status == AckStatus::Completed, valid);
    }
}
