//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                      |
//! |------------|-----------------|----------------------------------|
//! | `hardware` | SensorPort      | SCD30 + LPS22HH over I²C, button |
//! |            | ActuatorPort    | LEDC buzzer/RGB, network LED     |
//! | `cloud`    | CloudPort       | Offline stand-in for the twin    |
//! | `system`   | SystemPort      | Task watchdog, update agent      |
//! | `log_sink` | EventSink       | Serial log output                |
//! | `time`     | -               | ESP32 system timer, wall clock   |

pub mod cloud;
pub mod hardware;
pub mod log_sink;
pub mod system;
pub mod time;
