//! End-to-end tests for the event loop: timers → queue → service → ports.

use co2monitor::alarm::AlarmState;
use co2monitor::app::events::AppEvent;
use co2monitor::app::ports::Inbound;
use co2monitor::app::service::Flow;
use co2monitor::config::SystemConfig;
use co2monitor::error::SensorError;
use co2monitor::scheduler::TimerId;
use co2monitor::supervisor::{ExitCode, LivenessFault};
use serde_json::Value;

use crate::mock_hw::{make_loop, run, ActuatorCall, MockCloud, TestLoop};

fn method_call(request_id: u32, name: &str) -> Inbound {
    Inbound::MethodCall {
        request_id,
        name: name.try_into().unwrap(),
        payload: Value::Null,
    }
}

/// Step until the loop asks to exit; returns the exit time and code.
fn run_until_exit(lp: &mut TestLoop, from: u64, limit: u64) -> (u64, ExitCode) {
    let mut t = from;
    loop {
        assert!(t <= limit, "no exit before {limit}ms");
        if let Flow::Exit(code) = lp.step(t) {
            return (t, code);
        }
        t += 500;
    }
}

// ── Alarm hysteresis ──────────────────────────────────────────

#[test]
fn reference_scenario_holds_alarm_through_cooldown() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());

    let readings = [800.0, 950.0, 1050.0, 1040.0, 990.0, 900.0];
    let mut states = Vec::new();
    for (i, co2) in readings.into_iter().enumerate() {
        lp.ports_mut().hw.co2 = co2;
        lp.step(500 * (i as u64 + 1));
        states.push(lp.app().alarm_state());
    }
    use AlarmState::{Alerting, Normal};
    assert_eq!(states, [Normal, Normal, Alerting, Alerting, Alerting, Alerting]);

    // First below-threshold sample was at 2500 ms; cooldown ends at 10500.
    run(&mut lp, 3_500, 10_000, 500);
    assert_eq!(lp.app().alarm_state(), Alerting);

    lp.step(10_500);
    assert_eq!(lp.app().alarm_state(), Normal);
    assert!(!lp.ports().hw.buzzer_on());
    assert!(!lp.scheduler().is_armed(TimerId::AlertPulse));
}

#[test]
fn recrossing_restarts_cooldown() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    lp.ports_mut().hw.co2 = 1_200.0;
    lp.step(500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Alerting);

    lp.ports_mut().hw.co2 = 900.0;
    run(&mut lp, 1_000, 4_500, 500);
    lp.ports_mut().hw.co2 = 1_100.0;
    lp.step(5_000);
    lp.ports_mut().hw.co2 = 900.0;
    run(&mut lp, 5_500, 13_000, 500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Alerting);

    lp.step(13_500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Normal);
}

#[test]
fn alert_pulses_repeat_every_period() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    lp.ports_mut().hw.co2 = 2_000.0;
    run(&mut lp, 500, 17_500, 500);

    // Entry pulse at 500, then pulses at 8500 and 16500.
    assert_eq!(lp.ports().hw.buzzer_pulses(), 3);
    assert!(!lp.ports().hw.buzzer_on());
}

#[test]
fn quiet_mode_button_mutes_buzzer() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    lp.ports_mut().hw.presses.push_back(true);
    lp.step(100);
    assert!(lp.app().quiet_mode());

    lp.ports_mut().hw.co2 = 1_500.0;
    run(&mut lp, 500, 9_000, 500);
    assert_eq!(lp.app().alarm_state(), AlarmState::Alerting);
    assert_eq!(lp.ports().hw.buzzer_pulses(), 0);

    lp.ports_mut().hw.presses.push_back(true);
    run(&mut lp, 9_100, 16_500, 100);
    assert!(!lp.app().quiet_mode());
    assert_eq!(lp.ports().hw.buzzer_pulses(), 1);
}

// ── Liveness ──────────────────────────────────────────────────

#[test]
fn watchdog_kicks_while_sampling_then_restarts_on_streak() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    run(&mut lp, 500, 90_000, 500);
    assert_eq!(lp.ports().system.kicks, 3);

    // Streak reaches 60 at 120 s (still tolerated), 120 at 150 s.
    lp.ports_mut().hw.fail = Some(SensorError::Bus);
    let (at, code) = run_until_exit(&mut lp, 90_500, 200_000);

    assert_eq!(code, ExitCode::LivenessRestart);
    assert_eq!(at, 155_000);
    assert_eq!(lp.ports().system.kicks, 4);
    assert!(lp.ports().sink.events.contains(&AppEvent::LivenessFailed(
        LivenessFault::FailureStreak(120)
    )));
    assert_eq!(lp.ports().hw.calls.last(), Some(&ActuatorCall::AllOff));
}

#[test]
fn missing_samples_trigger_stale_restart() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    lp.ports_mut().hw.fail = Some(SensorError::NotReady);

    let (at, code) = run_until_exit(&mut lp, 500, 200_000);
    assert_eq!(code, ExitCode::LivenessRestart);
    assert_eq!(at, 155_000);
    assert_eq!(lp.app().failure_streak(), 0);
    assert!(lp.ports().sink.events.contains(&AppEvent::LivenessFailed(
        LivenessFault::StaleSamples(150_000)
    )));
}

// ── Direct methods ────────────────────────────────────────────

#[test]
fn restart_device_acks_then_exits_after_grace() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().cloud.inbound.push_back(method_call(7, "RestartDevice"));
    lp.step(1_000);

    let (id, resp) = &lp.ports().cloud.responses[0];
    assert_eq!(*id, 7);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.payload["message"], "Restarting device in 5 seconds");
    assert_eq!(lp.app().pending_restart(), Some(ExitCode::RestartRequested));

    let (at, code) = run_until_exit(&mut lp, 1_500, 20_000);
    assert_eq!((at, code), (6_000, ExitCode::RestartRequested));
}

#[test]
fn unknown_method_is_404() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().cloud.inbound.push_back(method_call(8, "FactoryReset"));
    lp.step(1_000);

    let (id, resp) = &lp.ports().cloud.responses[0];
    assert_eq!(*id, 8);
    assert_eq!(resp.status, 404);
    assert_eq!(lp.app().pending_restart(), None);
    assert!(!lp.scheduler().is_armed(TimerId::DelayedRestart));
}

// ── Telemetry and network LED ─────────────────────────────────

#[test]
fn telemetry_published_every_minute() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::online());
    lp.ports_mut().hw.co2 = 742.0;
    run(&mut lp, 500, 120_000, 500);

    let sent = &lp.ports().cloud.telemetry;
    assert_eq!(sent.len(), 2);
    let body: Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(body["co2"], 742);
    assert_eq!(body["humidity"], 45.0);
}

#[test]
fn telemetry_failure_is_dropped_not_retried() {
    let mut cloud = MockCloud::online();
    cloud.fail = true;
    let mut lp = make_loop(SystemConfig::default(), cloud);
    run(&mut lp, 500, 60_000, 500);
    assert!(lp.ports().cloud.telemetry.is_empty());

    lp.ports_mut().cloud.fail = false;
    run(&mut lp, 60_500, 119_500, 500);
    assert!(lp.ports().cloud.telemetry.is_empty());
    lp.step(120_000);
    assert_eq!(lp.ports().cloud.telemetry.len(), 1);
}

#[test]
fn network_led_flashes_only_while_connected() {
    let mut lp = make_loop(SystemConfig::default(), MockCloud::default());
    run(&mut lp, 100, 1_000, 100);
    assert!(!lp.ports().hw.calls.contains(&ActuatorCall::NetworkLed(true)));

    lp.ports_mut().cloud.connected = true;
    lp.step(1_500);
    assert_eq!(
        lp.ports()
            .hw
            .calls
            .iter()
            .rev()
            .find(|c| matches!(c, ActuatorCall::NetworkLed(_))),
        Some(&ActuatorCall::NetworkLed(true))
    );
    lp.step(1_600);
    assert_eq!(
        lp.ports()
            .hw
            .calls
            .iter()
            .rev()
            .find(|c| matches!(c, ActuatorCall::NetworkLed(_))),
        Some(&ActuatorCall::NetworkLed(false))
    );
    assert!(lp
        .ports()
        .sink
        .events
        .contains(&AppEvent::ConnectionChanged(true)));
}
