//! Sensirion SCD30 NDIR CO2 / temperature / humidity sensor.
//!
//! I²C protocol: 16-bit big-endian commands, every 16-bit data word
//! followed by a CRC-8 (poly 0x31, init 0xFF).  Reads are a command write,
//! a short pause, then a plain read.
//!
//! | Command             | Code     | Payload                   |
//! |---------------------|----------|---------------------------|
//! | Start continuous    | `0x0010` | ambient pressure (mbar)   |
//! | Set interval        | `0x4600` | seconds (2 – 1800)        |
//! | Data ready          | `0x0202` | → 1 word                  |
//! | Read measurement    | `0x0300` | → 6 words (3 × f32)       |
//! | Firmware version    | `0xD100` | → 1 word                  |

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;

pub const SCD30_ADDR: u8 = 0x61;

const CMD_START_CONTINUOUS: u16 = 0x0010;
const CMD_SET_INTERVAL: u16 = 0x4600;
const CMD_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASUREMENT: u16 = 0x0300;
const CMD_FIRMWARE_VERSION: u16 = 0xD100;

/// Minimum pause between a command write and the following read.
const READ_DELAY_MS: u32 = 3;

/// Sensirion CRC-8 over one data word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// One measurement triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scd30Measurement {
    pub co2_ppm: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Bus-less driver: the hub lends the shared bus for each call.
pub struct Scd30 {
    address: u8,
}

impl Default for Scd30 {
    fn default() -> Self {
        Self::new(SCD30_ADDR)
    }
}

impl Scd30 {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    /// Read the firmware version; doubles as a presence check.
    pub fn firmware_version<I: I2c>(
        &self,
        i2c: &mut I,
        delay: &mut impl DelayNs,
    ) -> Result<u16, SensorError> {
        let mut buf = [0u8; 3];
        self.read_words(i2c, delay, CMD_FIRMWARE_VERSION, &mut buf)?;
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }

    pub fn set_interval<I: I2c>(&self, i2c: &mut I, seconds: u16) -> Result<(), SensorError> {
        self.command_with_arg(i2c, CMD_SET_INTERVAL, seconds.clamp(2, 1800))
    }

    /// Start continuous measurement.  `pressure_mbar = 0` disables the
    /// sensor's own pressure compensation.
    pub fn start_continuous<I: I2c>(
        &self,
        i2c: &mut I,
        pressure_mbar: u16,
    ) -> Result<(), SensorError> {
        self.command_with_arg(i2c, CMD_START_CONTINUOUS, pressure_mbar)
    }

    pub fn data_ready<I: I2c>(
        &self,
        i2c: &mut I,
        delay: &mut impl DelayNs,
    ) -> Result<bool, SensorError> {
        let mut buf = [0u8; 3];
        self.read_words(i2c, delay, CMD_DATA_READY, &mut buf)?;
        Ok(u16::from_be_bytes([buf[0], buf[1]]) == 1)
    }

    pub fn read_measurement<I: I2c>(
        &self,
        i2c: &mut I,
        delay: &mut impl DelayNs,
    ) -> Result<Scd30Measurement, SensorError> {
        let mut buf = [0u8; 18];
        self.read_words(i2c, delay, CMD_READ_MEASUREMENT, &mut buf)?;

        let float_at = |i: usize| {
            f32::from_be_bytes([buf[i], buf[i + 1], buf[i + 3], buf[i + 4]])
        };
        Ok(Scd30Measurement {
            co2_ppm: float_at(0),
            temperature_c: float_at(6),
            humidity_pct: float_at(12),
        })
    }

    // ── Internal ──────────────────────────────────────────────

    fn command_with_arg<I: I2c>(&self, i2c: &mut I, cmd: u16, arg: u16) -> Result<(), SensorError> {
        let [c0, c1] = cmd.to_be_bytes();
        let [a0, a1] = arg.to_be_bytes();
        let frame = [c0, c1, a0, a1, crc8(&[a0, a1])];
        i2c.write(self.address, &frame).map_err(|_| SensorError::Bus)
    }

    /// Send `cmd`, wait, then read `buf.len() / 3` CRC-checked words.
    fn read_words<I: I2c>(
        &self,
        i2c: &mut I,
        delay: &mut impl DelayNs,
        cmd: u16,
        buf: &mut [u8],
    ) -> Result<(), SensorError> {
        i2c.write(self.address, &cmd.to_be_bytes())
            .map_err(|_| SensorError::Bus)?;
        delay.delay_ms(READ_DELAY_MS);
        i2c.read(self.address, buf).map_err(|_| SensorError::Bus)?;

        for word in buf.chunks_exact(3) {
            if crc8(&word[..2]) != word[2] {
                return Err(SensorError::Crc);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::mock::{MockBus, NoDelay};

    fn words(data: &[u8]) -> Vec<u8> {
        data.chunks_exact(2)
            .flat_map(|w| [w[0], w[1], crc8(w)])
            .collect()
    }

    #[test]
    fn crc_matches_sensirion_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn start_continuous_frame() {
        let mut bus = MockBus::default();
        Scd30::default().start_continuous(&mut bus, 0).unwrap();
        assert_eq!(bus.writes, vec![vec![0x00, 0x10, 0x00, 0x00, 0x81]]);
    }

    #[test]
    fn decodes_measurement() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&812.5f32.to_be_bytes());
        raw.extend_from_slice(&22.25f32.to_be_bytes());
        raw.extend_from_slice(&41.0f32.to_be_bytes());

        let mut bus = MockBus::default();
        bus.reads.push_back(words(&raw));

        let m = Scd30::default()
            .read_measurement(&mut bus, &mut NoDelay)
            .unwrap();
        assert_eq!(bus.writes, vec![vec![0x03, 0x00]]);
        assert_eq!(m.co2_ppm, 812.5);
        assert_eq!(m.temperature_c, 22.25);
        assert_eq!(m.humidity_pct, 41.0);
    }

    #[test]
    fn corrupted_word_is_crc_error() {
        let mut frame = words(&[0x00, 0x01]);
        frame[2] ^= 0xFF;
        let mut bus = MockBus::default();
        bus.reads.push_back(frame);
        assert_eq!(
            Scd30::default().data_ready(&mut bus, &mut NoDelay),
            Err(SensorError::Crc)
        );
    }

    #[test]
    fn nack_is_bus_error() {
        let mut bus = MockBus::default();
        bus.nack = true;
        assert_eq!(
            Scd30::default().firmware_version(&mut bus, &mut NoDelay),
            Err(SensorError::Bus)
        );
    }
}
