//! Device-twin behaviour through the full event loop: periodic reporting,
//! desired-property writes, and the update gate's reported decision.

use co2monitor::alarm::AlarmState;
use co2monitor::app::events::AppEvent;
use co2monitor::app::ports::Inbound;
use co2monitor::config::SystemConfig;
use co2monitor::twin::{PushOutcome, TwinWrite};
use co2monitor::update_gate::{UpdateDecision, UpdateKind, UpdateRequest};
use serde_json::Value;

use crate::mock_hw::{make_loop, run, MockCloud};

fn write(name: &str, value: Value, version: u32) -> Inbound {
    Inbound::TwinWrite(TwinWrite::new(name, value, version))
}

// ── Reported properties ───────────────────────────────────────

#[test]
fn periodic_push_sends_only_changes() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    run(&mut lp, 500, 30_000, 500);

    let first = &lp.ports().cloud.reports[0];
    assert_eq!(first.len(), 12);
    assert_eq!(first["CarbonDioxide"], 600);
    assert_eq!(first["MaxHumidity"], 45);
    assert_eq!(first["StartupUtc"], "2026-03-01T08:00:00Z");
    assert_eq!(first["SoftwareVersion"], "3.02");
    assert!(first.get("DeferredUpdateRequest").is_none());

    run(&mut lp, 30_500, 60_000, 500);
    assert_eq!(lp.ports().cloud.reports.len(), 1, "unchanged state is not re-sent");
    assert!(lp
        .ports()
        .sink
        .events
        .contains(&AppEvent::TwinReported(PushOutcome::Suppressed)));

    lp.ports_mut().hw.co2 = 650.0;
    run(&mut lp, 60_500, 90_000, 500);
    let delta = lp.ports().cloud.reports.last().unwrap();
    assert_eq!(delta.len(), 2);
    assert_eq!(delta["CarbonDioxide"], 650);
    assert_eq!(delta["MaxCarbonDioxide"], 650);
}

#[test]
fn dropped_push_is_retried_in_full() {
    let mut cloud = MockCloud::online();
    cloud.fail = true;
    let mut lp = make_loop(SystemConfig::default(), cloud);
    run(&mut lp, 500, 30_000, 500);
    assert!(lp.ports().cloud.reports.is_empty());

    lp.ports_mut().cloud.fail = false;
    run(&mut lp, 30_500, 60_000, 500);
    assert_eq!(lp.ports().cloud.reports.len(), 1);
    assert_eq!(lp.ports().cloud.reports[0].len(), 12);
}

// ── Desired-property writes ───────────────────────────────────

#[test]
fn alert_level_zero_is_rejected_with_retained_value() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().cloud.inbound.push_back(write("AlertLevel", Value::from(0), 5));
    lp.step(500);

    assert_eq!(lp.app().alert_level_ppm(), 1000);
    let acks = lp.ports().cloud.acks_for("AlertLevel");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0]["value"], 1000);
    assert_eq!(acks[0]["ac"], 400);
    assert_eq!(acks[0]["av"], 5);
}

#[test]
fn write_queued_before_sample_applies_first() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().cloud.inbound.push_back(write("AlertLevel", Value::from(1200), 2));
    lp.ports_mut().hw.co2 = 1_100.0;
    lp.step(500);

    assert_eq!(lp.app().alert_level_ppm(), 1200);
    assert_eq!(lp.app().alarm_state(), AlarmState::Normal);
    assert_eq!(lp.ports().cloud.acks_for("AlertLevel")[0]["ac"], 200);

    lp.ports_mut().hw.co2 = 1_250.0;
    lp.step(1_000);
    assert_eq!(lp.app().alarm_state(), AlarmState::Alerting);
}

#[test]
fn altitude_write_changes_compensation() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut()
        .cloud
        .inbound
        .push_back(write("AltitudeInMeters", Value::from(1500), 1));
    lp.step(500);

    assert_eq!(lp.app().altitude_m(), 1500);
    let co2 = lp.app().latest().unwrap().co2_ppm;
    assert!((715..=723).contains(&co2), "compensated CO2 was {co2}");
}

#[test]
fn read_only_and_unknown_properties_are_refused() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut()
        .cloud
        .inbound
        .push_back(write("Temperature", Value::from(30), 1));
    lp.ports_mut().cloud.inbound.push_back(write("Colour", Value::from(1), 1));
    lp.step(500);

    assert_eq!(lp.ports().cloud.acks_for("Temperature")[0]["ac"], 400);
    assert_eq!(lp.ports().cloud.acks_for("Colour")[0]["ac"], 404);
}

#[test]
fn inbound_flood_never_starves_timers() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    for i in 0..40 {
        lp.ports_mut()
            .cloud
            .inbound
            .push_back(write("AlertLevel", Value::from(900 + i), i as u32));
    }
    lp.step(30_000);
    assert_eq!(lp.ports().system.kicks, 1);
    assert_eq!(lp.ports().cloud.acks_for("AlertLevel").len(), 20);

    lp.step(30_500);
    assert_eq!(lp.ports().cloud.acks_for("AlertLevel").len(), 40);
    assert_eq!(lp.app().alert_level_ppm(), 939);
}

// ── Update gate ───────────────────────────────────────────────

#[test]
fn update_deferred_while_alerting_and_accepted_after() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().hw.co2 = 1_500.0;
    lp.step(500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Alerting);

    lp.ports_mut().system.pending = Some(UpdateRequest {
        kind: UpdateKind::System,
        requested_at: 1_000,
    });
    lp.step(1_000);
    assert_eq!(
        lp.ports().system.decisions,
        vec![UpdateDecision::Defer {
            retry_after_ms: 600_000
        }]
    );
    let reported = lp.ports().cloud.reports.last().unwrap();
    assert!(reported["DeferredUpdateRequest"]
        .as_str()
        .unwrap()
        .starts_with("System update deferred"));

    lp.ports_mut().hw.co2 = 600.0;
    run(&mut lp, 1_500, 9_500, 500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Normal);

    lp.ports_mut().system.pending = Some(UpdateRequest {
        kind: UpdateKind::Application,
        requested_at: 10_000,
    });
    lp.step(10_000);
    assert_eq!(lp.ports().system.decisions.last(), Some(&UpdateDecision::Accept));
    assert_eq!(
        lp.app().deferred_update(),
        Some("Application update accepted at uptime 10s")
    );
}
