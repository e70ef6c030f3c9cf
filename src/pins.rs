//! GPIO / peripheral pin assignments for the CO2 monitor board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I²C bus (SCD30 CO2 sensor + LPS22HH barometer)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// SCD30 supports up to 100 kHz with clock stretching.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// Buzzer (passive piezo, LEDC square wave)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 10;
/// Piezo resonant frequency.
pub const BUZZER_FREQ_HZ: u32 = 2_700;

// ---------------------------------------------------------------------------
// Status LED (discrete RGB, common cathode)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 11;
pub const LED_G_GPIO: i32 = 12;
pub const LED_B_GPIO: i32 = 13;
pub const LED_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Network LED (single colour, active-low)
// ---------------------------------------------------------------------------

pub const NETWORK_LED_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Button B: quiet mode (active-low with external pull-up)
// ---------------------------------------------------------------------------

pub const BUTTON_B_GPIO: i32 = 21;
