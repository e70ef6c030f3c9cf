//! Shared mutable context threaded through every alarm handler.
//!
//! `AlarmContext` is the blackboard the state handlers read from and write
//! to: the latest CO2 reading, the alert level, the cooldown deadline and
//! the actions the handlers request.  The service drains the actions after
//! every evaluation and applies them to the scheduler and actuators.

use heapless::Vec;

use super::AlarmState;
use crate::scheduler::Millis;

/// Upper bound on actions emitted by a single evaluation (exit + enter).
pub const MAX_ACTIONS: usize = 8;

/// Side effects requested by state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    /// Start one buzzer pulse now (subject to quiet mode).
    SoundBuzzer,
    /// Stop the buzzer and any pending buzzer-off timer.
    SilenceBuzzer,
    /// (Re)arm the periodic alert pulse from now.
    ArmPulse,
    /// Make sure the periodic alert pulse is armed, without moving it.
    EnsurePulse,
    /// Disarm the periodic alert pulse.
    CancelPulse,
    /// Show the indicator for this state.
    Indicate(AlarmState),
}

/// The shared context passed to every alarm handler.
#[derive(Debug, Clone)]
pub struct AlarmContext {
    // -- Timing --
    /// Time of the evaluation in progress.
    pub now: Millis,
    /// When the current state was entered.
    pub entered_at: Millis,

    // -- Input --
    /// Latest compensated CO2 reading (ppm).
    pub co2_ppm: i32,

    // -- Configuration --
    /// Alert level (ppm).  Inclusive: `co2 >= threshold` is above.
    pub threshold_ppm: i32,
    /// How long CO2 must stay below the alert level to clear.
    pub cooldown_ms: u32,

    // -- Hysteresis --
    /// Set on the first below-threshold sample while alerting; cleared if
    /// CO2 re-crosses the threshold before it elapses.
    pub cooldown_deadline: Option<Millis>,

    // -- Outputs --
    pub actions: Vec<AlarmAction, MAX_ACTIONS>,
}

impl AlarmContext {
    pub fn new(threshold_ppm: i32, cooldown_ms: u32) -> Self {
        Self {
            now: 0,
            entered_at: 0,
            co2_ppm: 0,
            threshold_ppm,
            cooldown_ms,
            cooldown_deadline: None,
            actions: Vec::new(),
        }
    }

    pub fn above_threshold(&self) -> bool {
        self.co2_ppm >= self.threshold_ppm
    }

    /// Milliseconds spent in the current state.
    pub fn ms_in_state(&self) -> Millis {
        self.now.saturating_sub(self.entered_at)
    }

    pub fn push(&mut self, action: AlarmAction) {
        if self.actions.push(action).is_err() {
            debug_assert!(false, "alarm action buffer overflow");
        }
    }
}
