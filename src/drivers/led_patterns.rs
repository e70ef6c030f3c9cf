//! LED pattern engine with priority-based pattern selection.
//!
//! Generates time-varying RGB values for the status LED.  The
//! `StatusLed` timer calls `tick()` every refresh, and the engine outputs
//! the RGB tuple to feed into `StatusLed::set_colour()`.
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Sensor fault**: amber fast blink while reads are failing
//! 2. **Alarm state**: red rapid flash (alerting) or green heartbeat (normal)
//!
//! A fault never hides an active alarm: while alerting, the red flash and
//! the amber blink take turns in [`OVERLAY_SLOT_MS`] slots, red first.
//!
//! ## Pattern types
//!
//! | Pattern      | Description                      | Rate   |
//! |-------------|----------------------------------|--------|
//! | Solid        | Constant colour                  | -      |
//! | FastBlink    | On/off square wave               | 4 Hz   |
//! | DoubleBlink  | Two quick flashes, then pause    | 1 Hz   |
//! | RapidFlash   | Very fast on/off                 | 8 Hz   |

use crate::alarm::AlarmState;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    FastBlink,
    DoubleBlink,
    RapidFlash,
    Off,
}

/// A pattern request with colour and type.
#[derive(Debug, Clone, Copy)]
pub struct PatternRequest {
    pub colour: Rgb,
    pub pattern: PatternId,
    pub priority: u8,
}

/// Length of each turn when the fault and alert patterns share the LED.
pub const OVERLAY_SLOT_MS: u32 = 1_000;

/// LED pattern engine. Stack-allocated, no heap.
pub struct LedPatternEngine {
    phase_ms: u32,
    /// Free-running clock for overlay slots; never reset by pattern changes.
    overlay_ms: u32,
    alerting: bool,
    active: Option<PatternRequest>,
    alarm_request: Option<PatternRequest>,
    fault_request: Option<PatternRequest>,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            phase_ms: 0,
            overlay_ms: 0,
            alerting: false,
            active: None,
            alarm_request: None,
            fault_request: None,
        }
    }

    /// Set the alarm-layer pattern (priority 2).
    pub fn set_alarm_pattern(&mut self, colour: Rgb, pattern: PatternId) {
        self.alarm_request = Some(PatternRequest {
            colour,
            pattern,
            priority: 2,
        });
    }

    /// Show the standard indicator for `state`.
    pub fn show_alarm_state(&mut self, state: AlarmState) {
        self.alerting = state == AlarmState::Alerting;
        match state {
            AlarmState::Normal => self.set_alarm_pattern(COLOUR_NORMAL, PatternId::DoubleBlink),
            AlarmState::Alerting => self.set_alarm_pattern(COLOUR_ALERT, PatternId::RapidFlash),
        }
    }

    /// Set or clear the sensor-fault pattern (priority 1: highest).
    pub fn set_fault_pattern(&mut self, active: bool) {
        if active {
            self.fault_request = Some(PatternRequest {
                colour: COLOUR_SENSOR_FAULT,
                pattern: PatternId::FastBlink,
                priority: 1,
            });
        } else {
            self.fault_request = None;
        }
    }

    pub fn fault_active(&self) -> bool {
        self.fault_request.is_some()
    }

    /// Clear all patterns: LED will be off.
    pub fn clear_all(&mut self) {
        self.alarm_request = None;
        self.fault_request = None;
        self.active = None;
        self.alerting = false;
        self.phase_ms = 0;
        self.overlay_ms = 0;
    }

    /// Advance the pattern phase and return the current RGB output.
    /// `delta_ms` is the time since the last call.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        self.overlay_ms = self.overlay_ms.wrapping_add(delta_ms);

        let selected = self.select_active();
        let reset_phase = match (&self.active, &selected) {
            (Some(prev), Some(next)) => {
                prev.priority != next.priority
                    || prev.pattern != next.pattern
                    || prev.colour != next.colour
            }
            (None, Some(_)) => true,
            _ => false,
        };
        if reset_phase {
            self.phase_ms = 0;
        }
        self.active = selected;

        match &self.active {
            Some(req) => self.generate(req.colour, req.pattern),
            None => (0, 0, 0),
        }
    }

    fn select_active(&self) -> Option<PatternRequest> {
        // Priority: fault (1) > alarm (2), except that an active alert
        // shares the LED with the fault.
        match (self.fault_request, self.alarm_request) {
            (Some(fault), Some(alarm)) if self.alerting => {
                if (self.overlay_ms / OVERLAY_SLOT_MS) % 2 == 0 {
                    Some(alarm)
                } else {
                    Some(fault)
                }
            }
            (fault, alarm) => fault.or(alarm),
        }
    }

    fn generate(&self, colour: Rgb, pattern: PatternId) -> Rgb {
        let lit = match pattern {
            PatternId::Solid => true,
            PatternId::Off => false,
            PatternId::FastBlink => (self.phase_ms % 250) < 125,
            PatternId::DoubleBlink => {
                let cycle = self.phase_ms % 1000;
                cycle < 100 || (200..300).contains(&cycle)
            }
            PatternId::RapidFlash => (self.phase_ms % 125) < 63,
        };
        if lit { colour } else { (0, 0, 0) }
    }
}

// ── Well-known colour constants ──────────────────────────────

pub const COLOUR_NORMAL: Rgb = (0, 255, 0); // Green
pub const COLOUR_ALERT: Rgb = (255, 0, 0); // Red
pub const COLOUR_SENSOR_FAULT: Rgb = (255, 140, 0); // Amber

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_pattern_returns_exact_colour() {
        let mut engine = LedPatternEngine::new();
        engine.set_alarm_pattern(COLOUR_NORMAL, PatternId::Solid);
        assert_eq!(engine.tick(1000), COLOUR_NORMAL);
    }

    #[test]
    fn off_pattern_returns_black() {
        let mut engine = LedPatternEngine::new();
        engine.set_alarm_pattern(COLOUR_NORMAL, PatternId::Off);
        assert_eq!(engine.tick(1000), (0, 0, 0));
    }

    #[test]
    fn fault_overrides_normal_heartbeat() {
        let mut engine = LedPatternEngine::new();
        engine.show_alarm_state(AlarmState::Normal);
        engine.set_fault_pattern(true);
        // Fast blink starts lit at phase 0.
        assert_eq!(engine.tick(0), COLOUR_SENSOR_FAULT);
        assert_eq!(engine.tick(1_000), COLOUR_SENSOR_FAULT);
    }

    #[test]
    fn fault_while_alerting_alternates_with_alert() {
        let mut engine = LedPatternEngine::new();
        engine.show_alarm_state(AlarmState::Alerting);
        engine.set_fault_pattern(true);

        assert_eq!(engine.tick(0), COLOUR_ALERT);
        assert_eq!(engine.tick(OVERLAY_SLOT_MS), COLOUR_SENSOR_FAULT);
        assert_eq!(engine.tick(OVERLAY_SLOT_MS), COLOUR_ALERT);

        engine.set_fault_pattern(false);
        assert_eq!(engine.tick(OVERLAY_SLOT_MS), COLOUR_ALERT);
    }

    #[test]
    fn clearing_fault_falls_back_to_alarm() {
        let mut engine = LedPatternEngine::new();
        engine.set_alarm_pattern(COLOUR_ALERT, PatternId::Solid);
        engine.set_fault_pattern(true);
        let _ = engine.tick(0);
        engine.set_fault_pattern(false);
        assert_eq!(engine.tick(1000), COLOUR_ALERT);
    }

    #[test]
    fn alerting_flashes_red() {
        let mut engine = LedPatternEngine::new();
        engine.show_alarm_state(AlarmState::Alerting);
        assert_eq!(engine.tick(0), COLOUR_ALERT);
        assert_eq!(engine.tick(100), (0, 0, 0));
        assert_eq!(engine.tick(50), COLOUR_ALERT);
    }

    #[test]
    fn normal_heartbeat_double_blinks() {
        let mut engine = LedPatternEngine::new();
        engine.show_alarm_state(AlarmState::Normal);
        let frames: Vec<Rgb> = (0..10).map(|i| engine.tick(if i == 0 { 0 } else { 100 })).collect();
        let lit = frames.iter().filter(|&&c| c == COLOUR_NORMAL).count();
        assert_eq!(lit, 2, "two flashes per second: {frames:?}");
    }

    #[test]
    fn state_change_restarts_phase() {
        let mut engine = LedPatternEngine::new();
        engine.show_alarm_state(AlarmState::Normal);
        engine.tick(0);
        engine.tick(150); // dark gap of the heartbeat
        engine.show_alarm_state(AlarmState::Alerting);
        assert_eq!(engine.tick(100), COLOUR_ALERT, "phase reset on switch");
    }

    #[test]
    fn no_pattern_returns_black() {
        let mut engine = LedPatternEngine::new();
        assert_eq!(engine.tick(1000), (0, 0, 0));
    }
}
