//! Function-pointer finite state machine for the CO2 alarm.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐ │
//! │  │ State    │ on_enter  │ on_exit  │ on_update         │ │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤ │
//! │  │ Normal   │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  │ Alerting │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │ │
//! │  └──────────┴───────────┴──────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each evaluation calls `on_update` for the **current** state with the
//! newest CO2 reading.  If it returns `Some(next_id)`, the engine runs
//! `on_exit` for the current state, then `on_enter` for the next.
//! Handlers never touch hardware: they push [`AlarmAction`]s into the
//! context, and [`AlarmMachine::evaluate`] hands them back to the caller.

pub mod context;
pub mod states;

use heapless::Vec;
use log::info;

pub use context::{AlarmAction, AlarmContext, MAX_ACTIONS};

use crate::config::{MAX_ALERT_LEVEL_PPM, MIN_ALERT_LEVEL_PPM};
use crate::error::ValidationError;
use crate::scheduler::Millis;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Alarm states.  Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlarmState {
    Normal = 0,
    Alerting = 1,
}

impl AlarmState {
    pub const COUNT: usize = 2;

    /// Convert an index back to `AlarmState`.  Out-of-range indices fall
    /// back to `Alerting` so a corrupted index can never silence the alarm.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Normal,
            1 => Self::Alerting,
            _ => {
                debug_assert!(false, "invalid alarm state index: {idx}");
                Self::Alerting
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Alerting => "Alerting",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut AlarmContext);

/// Signature for the per-sample update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut AlarmContext) -> Option<AlarmState>;

/// Static descriptor for a single alarm state.
pub struct StateDescriptor {
    pub id: AlarmState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The state table plus a pointer to the active row.
pub struct Fsm {
    table: [StateDescriptor; AlarmState::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; AlarmState::COUNT], initial: AlarmState) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut AlarmContext) {
        info!("Alarm FSM starting in state: {}", self.table[self.current].name);
        ctx.entered_at = ctx.now;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state once.  Returns `(from, to)` when a
    /// transition happened.
    pub fn tick(&mut self, ctx: &mut AlarmContext) -> Option<(AlarmState, AlarmState)> {
        let next = (self.table[self.current].on_update)(ctx)?;
        let from = self.current_state();
        self.transition(next, ctx);
        Some((from, next))
    }

    pub fn current_state(&self) -> AlarmState {
        AlarmState::from_index(self.current)
    }

    fn transition(&mut self, next: AlarmState, ctx: &mut AlarmContext) {
        let next_idx = next as usize;

        info!(
            "Alarm transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.entered_at = ctx.now;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Alarm machine (engine + context)
// ---------------------------------------------------------------------------

/// Result of feeding one CO2 reading into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// `(from, to)` if the state changed.
    pub transition: Option<(AlarmState, AlarmState)>,
    /// Side effects to apply, in order.
    pub actions: Vec<AlarmAction, MAX_ACTIONS>,
}

/// Owns the alarm FSM and its context.  The alert level lives here and is
/// only changed through [`set_threshold`](Self::set_threshold).
pub struct AlarmMachine {
    fsm: Fsm,
    ctx: AlarmContext,
}

impl AlarmMachine {
    pub fn new(threshold_ppm: i32, cooldown_ms: u32) -> Self {
        Self {
            fsm: Fsm::new(states::build_state_table(), AlarmState::Normal),
            ctx: AlarmContext::new(threshold_ppm, cooldown_ms),
        }
    }

    /// Enter the initial `Normal` state.  Returns its entry actions.
    pub fn start(&mut self, now: Millis) -> Vec<AlarmAction, MAX_ACTIONS> {
        self.ctx.now = now;
        self.fsm.start(&mut self.ctx);
        core::mem::take(&mut self.ctx.actions)
    }

    /// Feed one compensated CO2 reading.
    pub fn evaluate(&mut self, co2_ppm: i32, now: Millis) -> Evaluation {
        self.ctx.now = now;
        self.ctx.co2_ppm = co2_ppm;
        let transition = self.fsm.tick(&mut self.ctx);
        Evaluation {
            transition,
            actions: core::mem::take(&mut self.ctx.actions),
        }
    }

    pub fn state(&self) -> AlarmState {
        self.fsm.current_state()
    }

    pub fn is_alerting(&self) -> bool {
        self.state() == AlarmState::Alerting
    }

    pub fn threshold(&self) -> i32 {
        self.ctx.threshold_ppm
    }

    /// Replace the alert level.  Takes effect at the next evaluation.
    pub fn set_threshold(&mut self, ppm: i32) -> Result<(), ValidationError> {
        if !(MIN_ALERT_LEVEL_PPM..=MAX_ALERT_LEVEL_PPM).contains(&ppm) {
            return Err(ValidationError::OutOfRange);
        }
        if ppm != self.ctx.threshold_ppm {
            info!("Alert level {} -> {} ppm", self.ctx.threshold_ppm, ppm);
            self.ctx.threshold_ppm = ppm;
        }
        Ok(())
    }

    pub fn cooldown_deadline(&self) -> Option<Millis> {
        self.ctx.cooldown_deadline
    }
}
