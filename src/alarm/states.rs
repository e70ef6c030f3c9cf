//! Concrete state handler functions and table builder.
//!
//! ```text
//!  NORMAL ──[co2 >= alert level]──▶ ALERTING
//!    ▲                                 │  ▲
//!    │                    [co2 < level]│  │[co2 >= level]
//!    │                                 ▼  │  cooldown cancelled
//!    └───[below for cooldown_ms]─── (cooldown running)
//! ```

use log::{info, warn};

use super::context::{AlarmAction, AlarmContext};
use super::{AlarmState, StateDescriptor};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; AlarmState::COUNT] {
    [
        // Index 0: Normal
        StateDescriptor {
            id: AlarmState::Normal,
            name: "Normal",
            on_enter: Some(normal_enter),
            on_exit: None,
            on_update: normal_update,
        },
        // Index 1: Alerting
        StateDescriptor {
            id: AlarmState::Alerting,
            name: "Alerting",
            on_enter: Some(alerting_enter),
            on_exit: Some(alerting_exit),
            on_update: alerting_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL state
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut AlarmContext) {
    ctx.push(AlarmAction::SilenceBuzzer);
    ctx.push(AlarmAction::CancelPulse);
    ctx.push(AlarmAction::Indicate(AlarmState::Normal));
    info!(
        "NORMAL: CO2 {} ppm, alert level {} ppm",
        ctx.co2_ppm, ctx.threshold_ppm
    );
}

fn normal_update(ctx: &mut AlarmContext) -> Option<AlarmState> {
    if ctx.above_threshold() {
        return Some(AlarmState::Alerting);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALERTING state
// ═══════════════════════════════════════════════════════════════════════════

fn alerting_enter(ctx: &mut AlarmContext) {
    ctx.cooldown_deadline = None;
    ctx.push(AlarmAction::SoundBuzzer);
    ctx.push(AlarmAction::ArmPulse);
    ctx.push(AlarmAction::Indicate(AlarmState::Alerting));
    warn!(
        "ALERTING: CO2 {} ppm >= alert level {} ppm",
        ctx.co2_ppm, ctx.threshold_ppm
    );
}

fn alerting_exit(ctx: &mut AlarmContext) {
    ctx.cooldown_deadline = None;
    info!(
        "ALERTING: cleared after {}ms, CO2 {} ppm",
        ctx.ms_in_state(),
        ctx.co2_ppm
    );
}

fn alerting_update(ctx: &mut AlarmContext) -> Option<AlarmState> {
    if ctx.above_threshold() {
        if ctx.cooldown_deadline.take().is_some() {
            info!(
                "ALERTING: CO2 back up to {} ppm, cooldown cancelled",
                ctx.co2_ppm
            );
        }
        ctx.push(AlarmAction::EnsurePulse);
        return None;
    }

    let deadline = *ctx
        .cooldown_deadline
        .get_or_insert(ctx.now + u64::from(ctx.cooldown_ms));

    if ctx.now >= deadline {
        return Some(AlarmState::Normal);
    }
    None
}
