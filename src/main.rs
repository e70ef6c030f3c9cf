//! CO2 Monitor Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   OfflineCloud   SystemAdapter │
//! │  (Sensor+Actuator) (EventSink)    (CloudPort)    (SystemPort)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Sampler · Alarm FSM · Twin · Update gate · Liveness   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (timer registry) → EventQueue → EventLoop           │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use log::info;

use co2monitor::adapters::cloud::OfflineCloud;
use co2monitor::adapters::hardware::HardwareAdapter;
use co2monitor::adapters::log_sink::LogEventSink;
use co2monitor::adapters::system::SystemAdapter;
use co2monitor::adapters::time::Esp32TimeAdapter;
use co2monitor::app::ports::Ports;
use co2monitor::app::service::Flow;
use co2monitor::config::{SystemConfig, FIRMWARE_VERSION};
use co2monitor::drivers::button::ButtonDriver;
use co2monitor::drivers::buzzer::BuzzerDriver;
use co2monitor::drivers::hw_init;
use co2monitor::drivers::network_led::NetworkLed;
use co2monitor::drivers::status_led::StatusLed;
use co2monitor::drivers::watchdog::Watchdog;
use co2monitor::pins;
use co2monitor::runtime::EventLoop;
use co2monitor::sensors::SensorHub;
use co2monitor::supervisor::{init_step, ExitCode};

/// Longest idle wait between loop iterations (milliseconds).
const MAX_IDLE_MS: u64 = 50;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CO2 Monitor v{}                   ║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    init_step("Config validation", config.validate()).unwrap_or_else(|c| restart(c));

    // ── 2. Peripherals ────────────────────────────────────────
    init_step("HAL init", hw_init::init_peripherals()).unwrap_or_else(|c| restart(c));

    let peripherals =
        init_step("Peripherals", Peripherals::take()).unwrap_or_else(|c| restart(c));
    let i2c = init_step(
        "I2C bus",
        I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio8,
            peripherals.pins.gpio9,
            &I2cConfig::new().baudrate(100.kHz().into()),
        ),
    )
    .unwrap_or_else(|c| restart(c));

    let mut sensor_hub = SensorHub::new(i2c, Ets);
    let interval_secs = (config.sample_interval_ms / 1000).max(2) as u16;
    init_step("Sensor init", sensor_hub.init(interval_secs)).unwrap_or_else(|c| restart(c));

    let watchdog = init_step("Watchdog init", Watchdog::new(config.watchdog_timeout_ms))
        .unwrap_or_else(|c| restart(c));

    // ── 3. Adapters ───────────────────────────────────────────
    let time = Esp32TimeAdapter::new();
    let io = Ports {
        hw: HardwareAdapter::new(
            sensor_hub,
            BuzzerDriver::new(),
            StatusLed::new(),
            NetworkLed::default(),
            ButtonDriver::new(pins::BUTTON_B_GPIO),
        ),
        cloud: OfflineCloud::new(),
        system: SystemAdapter::new(watchdog),
        sink: LogEventSink::new(),
    };

    // ── 4. Event loop ─────────────────────────────────────────
    let mut event_loop = init_step(
        "Startup",
        EventLoop::new(config, time.startup_utc(), io, time.uptime_ms()),
    )
    .unwrap_or_else(|c| restart(c));
    info!("System ready. Entering event loop.");

    loop {
        let now = time.uptime_ms();
        if let Flow::Exit(code) = event_loop.step(now) {
            restart(code);
        }

        let wait = event_loop
            .next_deadline()
            .map_or(MAX_IDLE_MS, |at| at.saturating_sub(time.uptime_ms()))
            .min(MAX_IDLE_MS);
        FreeRtos::delay_ms(wait.max(1) as u32);
    }
}

/// Teardown is restart-based: log the cause and reboot.
fn restart(code: ExitCode) -> ! {
    info!("Exiting with {code}");
    // SAFETY: esp_restart never returns; all actuators were switched off
    // by the DelayedRestart handler or were never enabled.
    unsafe { esp_idf_svc::sys::esp_restart() }
}
