//! Application service: the hexagonal core.
//!
//! [`AppService`] owns every domain component (sampler, session maxima,
//! alarm FSM, twin synchronizer, update gate, liveness supervisor and the
//! LED pattern engine) and exposes one handler per timer plus one for
//! inbound commands.  All I/O flows through the [`Ports`] bundle injected
//! at call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                 │        AppService          │
//! ActuatorPort ◀──│ Sampler · Alarm · Twin     │ ──▶ CloudPort
//!                 │ Gate · Supervisor · LEDs   │ ──▶ SystemPort
//!                 └────────────────────────────┘
//! ```
//!
//! Handlers never block; each runs to completion before the event loop
//! dispatches the next event.

use log::{debug, info, warn};

use crate::alarm::context::AlarmAction;
use crate::alarm::{AlarmMachine, AlarmState};
use crate::config::SystemConfig;
use crate::drivers::led_patterns::LedPatternEngine;
use crate::error::{SensorError, TransportError};
use crate::scheduler::{Millis, Scheduler, TimerId};
use crate::supervisor::{ExitCode, LivenessSupervisor, LivenessVerdict};
use crate::telemetry::{Sampler, SessionMaxima, TelemetryPayload, TelemetrySample};
use crate::twin::TwinSync;
use crate::update_gate::{self, UpdateGate, UpdateRequest};

use super::commands::{AppCommand, DirectMethod};
use super::events::AppEvent;
use super::ports::{
    ActuatorPort, CloudPort, EventSink, MethodResponse, Ports, SensorPort, SystemPort,
    TELEMETRY_CONTENT, TELEMETRY_PROPERTIES,
};
use crate::twin::TwinWrite;

/// What the event loop should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Leave the loop and end the process with this code.
    Exit(ExitCode),
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    sampler: Sampler,
    maxima: SessionMaxima,
    latest: Option<TelemetrySample>,
    alarm: AlarmMachine,
    twin: TwinSync,
    gate: UpdateGate,
    supervisor: LivenessSupervisor,
    leds: LedPatternEngine,
    /// Buzzer pulses suppressed by the button.
    quiet: bool,
    /// Last connection state seen by the network LED handler.
    connected: bool,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** arm any timer: call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, startup_utc: String, now: Millis) -> Self {
        Self {
            sampler: Sampler::new(config.default_altitude_m),
            maxima: SessionMaxima::default(),
            latest: None,
            alarm: AlarmMachine::new(config.default_alert_level_ppm, config.alert_cooldown_ms),
            twin: TwinSync::new(startup_utc),
            gate: UpdateGate::new(config.defer_retry_ms),
            supervisor: LivenessSupervisor::new(&config, now),
            leds: LedPatternEngine::new(),
            quiet: false,
            connected: false,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter the initial alarm state, drive the actuators to match it and
    /// arm the autostart timers.
    pub fn start(
        &mut self,
        now: Millis,
        sched: &mut Scheduler,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        sched.start(now);
        let actions = self.alarm.start(now);
        self.apply_alarm_actions(&actions, now, sched, hw);
        sink.emit(&AppEvent::Started {
            alert_level_ppm: self.alarm.threshold(),
            altitude_m: self.sampler.altitude_m(),
        });
        info!(
            "AppService started: alert level {} ppm, altitude {} m",
            self.alarm.threshold(),
            self.sampler.altitude_m()
        );
    }

    // ── Timer dispatch ────────────────────────────────────────

    /// Run the handler bound to `id`.
    pub fn handle_timer<H, C, S, E>(
        &mut self,
        id: TimerId,
        now: Millis,
        sched: &mut Scheduler,
        io: &mut Ports<H, C, S, E>,
    ) -> Flow
    where
        H: SensorPort + ActuatorPort,
        C: CloudPort,
        S: SystemPort,
        E: EventSink,
    {
        match id {
            TimerId::ReadTelemetry => self.read_telemetry(now, sched, io),
            TimerId::PublishTelemetry => self.publish_telemetry(io),
            TimerId::UpdateTwins => self.push_twin(io),
            TimerId::Watchdog => self.check_liveness(now, sched, io),
            TimerId::AlertPulse => {
                if self.alarm.is_alerting() {
                    self.pulse_buzzer(now, sched, &mut io.hw);
                } else {
                    sched.cancel(TimerId::AlertPulse);
                }
            }
            TimerId::BuzzerOff => io.hw.set_buzzer(false),
            TimerId::DelayedRestart => {
                let code = self
                    .supervisor
                    .pending_restart()
                    .unwrap_or(ExitCode::RestartRequested);
                self.leds.clear_all();
                io.hw.all_off();
                info!("Restarting now, exit code {code}");
                return Flow::Exit(code);
            }
            TimerId::ReadButtons => self.read_buttons(sched, io),
            TimerId::StatusLed => {
                let (r, g, b) = self.leds.tick(self.config.status_led_refresh_ms);
                io.hw.set_status_led(r, g, b);
            }
            TimerId::NetworkLedOn => self.flash_network_led(now, sched, io),
            TimerId::NetworkLedOff => io.hw.set_network_led(false),
        }
        Flow::Continue
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one inbound command (twin write, direct method, update
    /// notification).
    pub fn handle_command<H, C, S, E>(
        &mut self,
        cmd: AppCommand,
        now: Millis,
        sched: &mut Scheduler,
        io: &mut Ports<H, C, S, E>,
    ) -> Flow
    where
        H: SensorPort + ActuatorPort,
        C: CloudPort,
        S: SystemPort,
        E: EventSink,
    {
        match cmd {
            AppCommand::TwinWrite(write) => self.apply_twin_write(&write, io),
            AppCommand::DirectMethod(DirectMethod::RestartDevice) => {
                self.schedule_restart(ExitCode::RestartRequested, now, sched, &mut io.sink);
            }
            AppCommand::UpdateAvailable(request) => self.decide_update(&request, io),
        }
        Flow::Continue
    }

    /// Immediate response for an accepted direct method.  The method's
    /// effect is applied later, from the event queue.
    pub fn method_response(&self, method: DirectMethod) -> MethodResponse {
        match method {
            DirectMethod::RestartDevice => MethodResponse::ok(&format!(
                "Restarting device in {} seconds",
                self.config.restart_grace_ms / 1000
            )),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn alert_level_ppm(&self) -> i32 {
        self.alarm.threshold()
    }

    pub fn altitude_m(&self) -> i32 {
        self.sampler.altitude_m()
    }

    /// Most recent good sample, if any.
    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }

    pub fn maxima(&self) -> &SessionMaxima {
        &self.maxima
    }

    pub fn quiet_mode(&self) -> bool {
        self.quiet
    }

    pub fn failure_streak(&self) -> u32 {
        self.supervisor.failure_streak()
    }

    pub fn pending_restart(&self) -> Option<ExitCode> {
        self.supervisor.pending_restart()
    }

    pub fn deferred_update(&self) -> Option<&str> {
        self.twin.deferred_update()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Handlers ──────────────────────────────────────────────

    fn read_telemetry<H, C, S, E>(
        &mut self,
        now: Millis,
        sched: &mut Scheduler,
        io: &mut Ports<H, C, S, E>,
    ) where
        H: SensorPort + ActuatorPort,
        E: EventSink,
    {
        let sample = match self.sampler.sample(&mut io.hw, now) {
            Ok(sample) => sample,
            Err(SensorError::NotReady) => {
                debug!("Sensor: no fresh measurement yet");
                return;
            }
            Err(error) => {
                self.supervisor.record_sensor_error(error);
                self.leds.set_fault_pattern(true);
                let streak = self.supervisor.failure_streak();
                warn!("Sensor read failed: {error} (streak {streak})");
                io.sink.emit(&AppEvent::SensorFault { error, streak });
                return;
            }
        };

        self.supervisor.record_sample(now);
        if self.leds.fault_active() {
            self.leds.set_fault_pattern(false);
        }
        self.maxima.update(&sample);
        self.latest = Some(sample);

        let eval = self.alarm.evaluate(sample.co2_ppm, now);
        if let Some((from, to)) = eval.transition {
            io.sink.emit(&AppEvent::AlarmChanged {
                from,
                to,
                co2_ppm: sample.co2_ppm,
                threshold_ppm: self.alarm.threshold(),
            });
        }
        self.apply_alarm_actions(&eval.actions, now, sched, &mut io.hw);
    }

    fn publish_telemetry<H, C, S, E>(&mut self, io: &mut Ports<H, C, S, E>)
    where
        C: CloudPort,
        E: EventSink,
    {
        let Some(sample) = self.latest else {
            debug!("Telemetry: no sample yet, skipping publish");
            return;
        };

        let result = TelemetryPayload::from(&sample)
            .to_json()
            .map_err(|_| TransportError::Encode)
            .and_then(|json| {
                io.cloud
                    .publish_telemetry(&json, &TELEMETRY_PROPERTIES, &TELEMETRY_CONTENT)
            });
        match result {
            Ok(()) => io.sink.emit(&AppEvent::TelemetryPublished(sample)),
            Err(e) => {
                warn!("Telemetry dropped: {e}");
                io.sink.emit(&AppEvent::TelemetryDropped(e));
            }
        }
    }

    fn push_twin<H, C, S, E>(&mut self, io: &mut Ports<H, C, S, E>)
    where
        C: CloudPort,
        E: EventSink,
    {
        let state = self.twin.reported_state(
            &self.alarm,
            &self.sampler,
            self.latest.as_ref(),
            &self.maxima,
        );
        match self.twin.push(&state, &mut io.cloud) {
            Ok(outcome) => io.sink.emit(&AppEvent::TwinReported(outcome)),
            Err(e) => {
                warn!("Twin report dropped: {e}");
                io.sink.emit(&AppEvent::TwinReportDropped(e));
            }
        }
    }

    fn check_liveness<H, C, S, E>(
        &mut self,
        now: Millis,
        sched: &mut Scheduler,
        io: &mut Ports<H, C, S, E>,
    ) where
        S: SystemPort,
        E: EventSink,
    {
        match self.supervisor.check(now) {
            LivenessVerdict::Kick => {
                io.system.kick_watchdog();
                io.sink.emit(&AppEvent::WatchdogKicked);
            }
            LivenessVerdict::Restart(fault) => {
                warn!("Liveness check failed: {fault}; watchdog not kicked");
                io.sink.emit(&AppEvent::LivenessFailed(fault));
                self.schedule_restart(ExitCode::LivenessRestart, now, sched, &mut io.sink);
            }
        }
    }

    fn read_buttons<H, C, S, E>(&mut self, sched: &mut Scheduler, io: &mut Ports<H, C, S, E>)
    where
        H: SensorPort + ActuatorPort,
        E: EventSink,
    {
        if !io.hw.button_pressed() {
            return;
        }
        self.quiet = !self.quiet;
        if self.quiet {
            io.hw.set_buzzer(false);
            sched.cancel(TimerId::BuzzerOff);
        }
        info!("Quiet mode {}", if self.quiet { "on" } else { "off" });
        io.sink.emit(&AppEvent::QuietModeChanged(self.quiet));
    }

    fn flash_network_led<H, C, S, E>(
        &mut self,
        now: Millis,
        sched: &mut Scheduler,
        io: &mut Ports<H, C, S, E>,
    ) where
        H: ActuatorPort,
        C: CloudPort,
        E: EventSink,
    {
        let connected = io.cloud.is_connected();
        if connected != self.connected {
            self.connected = connected;
            io.sink.emit(&AppEvent::ConnectionChanged(connected));
        }
        if connected {
            io.hw.set_network_led(true);
            sched.arm(TimerId::NetworkLedOff, now);
        } else {
            io.hw.set_network_led(false);
        }
    }

    fn apply_twin_write<H, C, S, E>(&mut self, write: &TwinWrite, io: &mut Ports<H, C, S, E>)
    where
        C: CloudPort,
        E: EventSink,
    {
        let ack = self
            .twin
            .apply_write(write, &mut self.alarm, &mut self.sampler);
        if let Err(e) = self.twin.send_ack(&ack, &mut io.cloud) {
            warn!("Twin ack for '{}' dropped: {e}", ack.name);
            io.sink.emit(&AppEvent::TwinReportDropped(e));
        }
        io.sink.emit(&AppEvent::TwinWriteAcked {
            name: ack.name,
            status: ack.status,
            in_effect: ack.value,
        });
    }

    fn decide_update<H, C, S, E>(&mut self, request: &UpdateRequest, io: &mut Ports<H, C, S, E>)
    where
        C: CloudPort,
        S: SystemPort,
        E: EventSink,
    {
        let decision = self.gate.decide(request, self.alarm.state());
        io.system.respond_update(decision);

        let description = update_gate::describe(request, decision);
        info!("Update gate: {description}");
        self.twin.record_deferral(description);
        io.sink.emit(&AppEvent::UpdateDecided {
            kind: request.kind,
            decision,
        });
        self.push_twin(io);
    }

    // ── Internal ──────────────────────────────────────────────

    /// Latch a restart and arm the grace timer.  Later requests are
    /// ignored once one is pending.
    fn schedule_restart(
        &mut self,
        code: ExitCode,
        now: Millis,
        sched: &mut Scheduler,
        sink: &mut impl EventSink,
    ) {
        if self.supervisor.request_restart(code) {
            sched.arm(TimerId::DelayedRestart, now);
            sink.emit(&AppEvent::RestartScheduled(code));
        }
    }

    fn pulse_buzzer(&mut self, now: Millis, sched: &mut Scheduler, hw: &mut impl ActuatorPort) {
        if self.quiet {
            debug!("Buzzer pulse suppressed (quiet mode)");
            return;
        }
        hw.set_buzzer(true);
        sched.arm(TimerId::BuzzerOff, now);
    }

    /// Translate alarm FSM actions into timer and port calls.
    fn apply_alarm_actions(
        &mut self,
        actions: &[AlarmAction],
        now: Millis,
        sched: &mut Scheduler,
        hw: &mut impl ActuatorPort,
    ) {
        for action in actions {
            match *action {
                AlarmAction::SoundBuzzer => self.pulse_buzzer(now, sched, hw),
                AlarmAction::SilenceBuzzer => {
                    hw.set_buzzer(false);
                    sched.cancel(TimerId::BuzzerOff);
                }
                AlarmAction::ArmPulse => sched.arm(TimerId::AlertPulse, now),
                AlarmAction::EnsurePulse => {
                    if !sched.is_armed(TimerId::AlertPulse) {
                        sched.arm(TimerId::AlertPulse, now);
                    }
                }
                AlarmAction::CancelPulse => sched.cancel(TimerId::AlertPulse),
                AlarmAction::Indicate(state) => {
                    self.leds.show_alarm_state(state);
                    let (r, g, b) = self.leds.tick(0);
                    hw.set_status_led(r, g, b);
                }
            }
        }
    }
}
