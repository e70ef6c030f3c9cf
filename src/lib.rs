//! CO2 monitor firmware library.
//!
//! Exposes the domain core, the event loop and the adapters for
//! integration testing and for the binary.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module; host
//! builds get simulation stubs.

#![deny(unused_must_use)]

pub mod alarm;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod scheduler;
pub mod supervisor;
pub mod telemetry;
pub mod twin;
pub mod update_gate;

pub mod adapters;
pub mod drivers;
pub mod sensors;

pub mod pins;
