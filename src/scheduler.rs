//! Timer registry and scheduler engine.
//!
//! Every timer the firmware uses is declared once, at startup, in the
//! table built by [`build_timer_table`].  The scheduler keeps one deadline
//! per timer and notifies a [`SchedulerDelegate`] when a deadline passes;
//! the event loop implements the delegate to push timer events into the
//! same queue that carries inbound cloud messages.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Timer table (static)                      │
//! │  ReadTelemetry · PublishTelemetry · UpdateTwins · Watchdog   │
//! │  AlertPulse · BuzzerOff · DelayedRestart · ReadButtons       │
//! │  StatusLed · NetworkLedOn · NetworkLedOff                    │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ deadline passed
//!                             ▼
//!                   SchedulerDelegate::on_timer_fired
//!                             │
//!                             ▼
//!                    EventQueue → AppService
//! ```
//!
//! One-shot timers are idempotent-cancelable: arming a timer that is
//! already pending replaces its deadline.

use log::debug;

use crate::app::ports::SchedulerDelegate;
use crate::config::SystemConfig;

/// Monotonic time in milliseconds since boot.
pub type Millis = u64;

// ═══════════════════════════════════════════════════════════════
//  Timer identity and registry
// ═══════════════════════════════════════════════════════════════

/// Every timer in the system.  Discriminants index the timer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerId {
    ReadTelemetry = 0,
    PublishTelemetry = 1,
    UpdateTwins = 2,
    Watchdog = 3,
    AlertPulse = 4,
    BuzzerOff = 5,
    DelayedRestart = 6,
    ReadButtons = 7,
    StatusLed = 8,
    NetworkLedOn = 9,
    NetworkLedOff = 10,
}

impl TimerId {
    /// Total number of timers: used to size the table array.
    pub const COUNT: usize = 11;

    pub const ALL: [Self; Self::COUNT] = [
        Self::ReadTelemetry,
        Self::PublishTelemetry,
        Self::UpdateTwins,
        Self::Watchdog,
        Self::AlertPulse,
        Self::BuzzerOff,
        Self::DelayedRestart,
        Self::ReadButtons,
        Self::StatusLed,
        Self::NetworkLedOn,
        Self::NetworkLedOff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadTelemetry => "tmr_read_telemetry",
            Self::PublishTelemetry => "tmr_publish_telemetry",
            Self::UpdateTwins => "tmr_update_device_twins",
            Self::Watchdog => "tmr_watchdog",
            Self::AlertPulse => "tmr_co2_alert_pulse",
            Self::BuzzerOff => "tmr_buzzer_off_oneshot",
            Self::DelayedRestart => "tmr_delayed_restart",
            Self::ReadButtons => "tmr_read_buttons",
            Self::StatusLed => "tmr_status_led",
            Self::NetworkLedOn => "tmr_network_led_on",
            Self::NetworkLedOff => "tmr_network_led_off_oneshot",
        }
    }
}

/// How a timer re-arms after it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires every `period_ms` until cancelled.
    Periodic { period_ms: u32 },
    /// Fires once, then disarms.
    OneShot { delay_ms: u32 },
}

/// One row of the timer table.
#[derive(Debug, Clone, Copy)]
pub struct TimerSpec {
    pub id: TimerId,
    pub kind: TimerKind,
    /// `Some(delay)` = armed by [`Scheduler::start`]; `None` = armed on
    /// demand by a handler.
    pub autostart_ms: Option<u32>,
}

/// Build the timer table from configuration.  Called once at startup.
pub fn build_timer_table(config: &SystemConfig) -> [TimerSpec; TimerId::COUNT] {
    let periodic = |id, period_ms, autostart_ms| TimerSpec {
        id,
        kind: TimerKind::Periodic { period_ms },
        autostart_ms,
    };
    let oneshot = |id, delay_ms| TimerSpec {
        id,
        kind: TimerKind::OneShot { delay_ms },
        autostart_ms: None,
    };

    [
        periodic(
            TimerId::ReadTelemetry,
            config.sample_interval_ms,
            Some(config.settle_delay_ms),
        ),
        periodic(
            TimerId::PublishTelemetry,
            config.publish_interval_ms,
            Some(config.publish_interval_ms),
        ),
        periodic(
            TimerId::UpdateTwins,
            config.twin_report_interval_ms,
            Some(config.twin_report_interval_ms),
        ),
        periodic(
            TimerId::Watchdog,
            config.watchdog_interval_ms,
            Some(config.watchdog_interval_ms),
        ),
        periodic(TimerId::AlertPulse, config.alert_pulse_ms, None),
        oneshot(TimerId::BuzzerOff, config.buzzer_on_ms),
        oneshot(TimerId::DelayedRestart, config.restart_grace_ms),
        periodic(
            TimerId::ReadButtons,
            config.button_poll_ms,
            Some(config.button_poll_ms),
        ),
        periodic(
            TimerId::StatusLed,
            config.status_led_refresh_ms,
            Some(config.status_led_refresh_ms),
        ),
        periodic(
            TimerId::NetworkLedOn,
            config.network_led_period_ms,
            Some(config.network_led_period_ms),
        ),
        oneshot(TimerId::NetworkLedOff, config.network_led_on_ms),
    ]
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The scheduler engine.
///
/// Decoupled from the event system: when a timer fires it invokes the
/// [`SchedulerDelegate`] rather than dispatching a handler itself, so
/// handlers always run from the serialized event queue.
pub struct Scheduler {
    /// Fixed-size table indexed by `TimerId as usize`.
    table: [TimerSpec; TimerId::COUNT],
    /// Next fire time per timer; `None` = disarmed.
    deadlines: [Option<Millis>; TimerId::COUNT],
}

impl Scheduler {
    pub fn new(table: [TimerSpec; TimerId::COUNT]) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, s)| s.id as usize == i),
            "timer table out of order"
        );
        Self {
            table,
            deadlines: [None; TimerId::COUNT],
        }
    }

    /// Arm every autostart timer relative to `now`.
    pub fn start(&mut self, now: Millis) {
        for spec in &self.table {
            if let Some(delay) = spec.autostart_ms {
                self.deadlines[spec.id as usize] = Some(now + Millis::from(delay));
                debug!("Scheduler: '{}' armed (+{}ms)", spec.id.name(), delay);
            }
        }
    }

    /// Arm `id` with its table delay (one-shot) or period (periodic).
    /// Replaces any pending deadline.
    pub fn arm(&mut self, id: TimerId, now: Millis) {
        let delay = match self.table[id as usize].kind {
            TimerKind::Periodic { period_ms } => period_ms,
            TimerKind::OneShot { delay_ms } => delay_ms,
        };
        self.arm_after(id, now, delay);
    }

    /// Arm `id` to first fire `delay_ms` from `now`.
    pub fn arm_after(&mut self, id: TimerId, now: Millis, delay_ms: u32) {
        self.deadlines[id as usize] = Some(now + Millis::from(delay_ms));
    }

    /// Disarm `id`.  Cancelling a disarmed timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.deadlines[id as usize] = None;
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.deadlines[id as usize].is_some()
    }

    pub fn deadline(&self, id: TimerId) -> Option<Millis> {
        self.deadlines[id as usize]
    }

    /// Earliest pending deadline, for the idle wait in the main loop.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.deadlines.iter().flatten().copied().min()
    }

    /// Fire every timer whose deadline is at or before `now`, earliest
    /// first (ties broken by table order).  Each timer fires at most once
    /// per poll; a periodic timer that fell several periods behind fires
    /// once and is re-armed one period from `now`.
    ///
    /// Returns the number of timers fired.
    pub fn poll(&mut self, now: Millis, delegate: &mut dyn SchedulerDelegate) -> usize {
        let mut fired_mask: u16 = 0;
        let mut fired = 0;

        loop {
            let due = self
                .deadlines
                .iter()
                .enumerate()
                .filter(|&(i, _)| fired_mask & (1u16 << i) == 0)
                .filter_map(|(i, &deadline)| match deadline {
                    Some(at) if at <= now => Some((at, i)),
                    _ => None,
                })
                .min();

            let Some((at, idx)) = due else { break };
            fired_mask |= 1u16 << idx;
            fired += 1;

            let spec = self.table[idx];
            self.deadlines[idx] = match spec.kind {
                TimerKind::Periodic { period_ms } => {
                    let next = at + Millis::from(period_ms);
                    Some(if next <= now {
                        now + Millis::from(period_ms)
                    } else {
                        next
                    })
                }
                TimerKind::OneShot { .. } => None,
            };

            delegate.on_timer_fired(spec.id);
        }

        fired
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
