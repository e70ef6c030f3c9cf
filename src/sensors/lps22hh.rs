//! ST LPS22HH barometric pressure sensor.
//!
//! Register-mapped I²C device.  Pressure is a 24-bit two's-complement
//! value in LSB/4096 hPa; temperature is 16-bit in LSB/100 °C.  The
//! register address auto-increments (CTRL_REG2.IF_ADD_INC, default on),
//! so one burst read covers both.

use embedded_hal::i2c::I2c;
use log::info;

use crate::error::SensorError;

/// SA0 pulled high.
pub const LPS22HH_ADDR: u8 = 0x5D;

const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL_REG1: u8 = 0x10;
const REG_PRESS_OUT_XL: u8 = 0x28;

const WHO_AM_I_VALUE: u8 = 0xB3;
/// ODR = 1 Hz, block data update.
const CTRL_REG1_1HZ_BDU: u8 = 0x12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    pub pressure_hpa: f32,
    pub temperature_c: f32,
}

pub struct Lps22hh {
    address: u8,
}

impl Default for Lps22hh {
    fn default() -> Self {
        Self::new(LPS22HH_ADDR)
    }
}

impl Lps22hh {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    /// Check the device ID and start continuous conversion.
    pub fn init<I: I2c>(&self, i2c: &mut I) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        i2c.write_read(self.address, &[REG_WHO_AM_I], &mut id)
            .map_err(|_| SensorError::Bus)?;
        if id[0] != WHO_AM_I_VALUE {
            return Err(SensorError::OutOfRange);
        }
        i2c.write(self.address, &[REG_CTRL_REG1, CTRL_REG1_1HZ_BDU])
            .map_err(|_| SensorError::Bus)?;
        info!("LPS22HH: online at 0x{:02X}, 1 Hz", self.address);
        Ok(())
    }

    pub fn read<I: I2c>(&self, i2c: &mut I) -> Result<PressureReading, SensorError> {
        let mut buf = [0u8; 5];
        i2c.write_read(self.address, &[REG_PRESS_OUT_XL], &mut buf)
            .map_err(|_| SensorError::Bus)?;
        Ok(decode(&buf))
    }
}

fn decode(buf: &[u8; 5]) -> PressureReading {
    // Sign-extend the 24-bit pressure through the top byte of an i32.
    let raw_p = i32::from_le_bytes([0, buf[0], buf[1], buf[2]]) >> 8;
    let raw_t = i16::from_le_bytes([buf[3], buf[4]]);
    PressureReading {
        pressure_hpa: raw_p as f32 / 4096.0,
        temperature_c: f32::from(raw_t) / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::mock::MockBus;

    #[test]
    fn decodes_datasheet_scale() {
        // 1013.25 hPa * 4096 = 4_150_272 = 0x3F_5400; 23.45 °C = 2345 = 0x0929
        let r = decode(&[0x00, 0x54, 0x3F, 0x29, 0x09]);
        assert!((r.pressure_hpa - 1013.25).abs() < 0.001);
        assert!((r.temperature_c - 23.45).abs() < 0.001);
    }

    #[test]
    fn negative_temperature() {
        let r = decode(&[0x00, 0x00, 0x3E, 0x0C, 0xFE]); // -5.00 °C
        assert!((r.temperature_c + 5.0).abs() < 0.001);
    }

    #[test]
    fn init_rejects_wrong_device() {
        let mut bus = MockBus::default();
        bus.reads.push_back(vec![0xB1]);
        assert_eq!(Lps22hh::default().init(&mut bus), Err(SensorError::OutOfRange));
    }

    #[test]
    fn init_configures_odr() {
        let mut bus = MockBus::default();
        bus.reads.push_back(vec![WHO_AM_I_VALUE]);
        Lps22hh::default().init(&mut bus).unwrap();
        assert_eq!(bus.writes, vec![vec![REG_WHO_AM_I], vec![REG_CTRL_REG1, 0x12]]);
    }
}
