//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! Both sensors share one I²C bus.  The hub owns the bus and the delay
//! provider and lends them to each driver call, so no bus-sharing wrapper
//! is needed.

pub mod lps22hh;
pub mod scd30;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::error::{InitError, SensorError};
use crate::telemetry::RawReading;
use lps22hh::Lps22hh;
use scd30::Scd30;

/// Aggregates the CO2 and pressure sensors behind one read call.
pub struct SensorHub<I2C, D> {
    i2c: I2C,
    delay: D,
    scd30: Scd30,
    lps22hh: Lps22hh,
}

impl<I2C: I2c, D: DelayNs> SensorHub<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            scd30: Scd30::default(),
            lps22hh: Lps22hh::default(),
        }
    }

    /// Probe both sensors and start continuous measurement.
    pub fn init(&mut self, interval_secs: u16) -> Result<(), InitError> {
        let fw = self
            .scd30
            .firmware_version(&mut self.i2c, &mut self.delay)
            .map_err(|_| InitError::SensorProbeFailed)?;
        info!("SCD30: firmware {}.{}", fw >> 8, fw & 0xFF);

        self.scd30
            .set_interval(&mut self.i2c, interval_secs)
            .and_then(|()| self.scd30.start_continuous(&mut self.i2c, 0))
            .map_err(|_| InitError::SensorProbeFailed)?;

        self.lps22hh
            .init(&mut self.i2c)
            .map_err(|_| InitError::SensorProbeFailed)?;
        Ok(())
    }

    /// One combined reading.  Returns [`SensorError::NotReady`] while the
    /// SCD30 has no fresh measurement; nothing is cached between calls.
    pub fn read(&mut self) -> Result<RawReading, SensorError> {
        if !self.scd30.data_ready(&mut self.i2c, &mut self.delay)? {
            return Err(SensorError::NotReady);
        }
        let m = self.scd30.read_measurement(&mut self.i2c, &mut self.delay)?;
        let p = self.lps22hh.read(&mut self.i2c).inspect_err(|e| {
            warn!("LPS22HH read failed: {e}");
        })?;

        Ok(RawReading {
            co2_ppm: m.co2_ppm,
            temperature_c: m.temperature_c,
            humidity_pct: m.humidity_pct,
            pressure_hpa: p.pressure_hpa,
        })
    }
}

// ── Test doubles shared by the driver tests ───────────────────
