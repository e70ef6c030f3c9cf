//! Unified error types for the CO2 monitor firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level event loop's error handling uniform.  All variants are `Copy`
//! so they can be passed through the sampler, twin synchronizer and
//! supervisor without allocation.
//!
//! | Variant      | Recovery                                               |
//! |--------------|--------------------------------------------------------|
//! | `Sensor`     | skip this sampling tick, retry on the next cadence     |
//! | `Validation` | reject the remote write, keep and acknowledge old value|
//! | `Transport`  | drop this cycle's payload, next periodic push retries  |
//! | `Init`       | abort startup with a distinct exit code                |

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The sensor transport failed or returned implausible data.
    Sensor(SensorError),
    /// A remote write carried a value of the wrong type or range.
    Validation(ValidationError),
    /// The cloud transport could not accept a payload.
    Transport(TransportError),
    /// Peripheral initialisation failed.
    Init(InitError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// A single failed read.  Never mutates shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed (NACK, arbitration loss, bus timeout).
    Bus,
    /// A data word failed its CRC-8 check.
    Crc,
    /// The sensor has no new measurement yet.  Not counted as a failure.
    NotReady,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl SensorError {
    /// Whether this error counts towards the liveness failure streak.
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::NotReady)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::NotReady => write!(f, "measurement not ready"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The encoded value is not the property's declared type.
    WrongType,
    /// The value is outside the accepted range.
    OutOfRange,
    /// No twin property with that name exists.
    UnknownProperty,
    /// The property is reported-only and cannot be written remotely.
    ReadOnly,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType => write!(f, "wrong value type"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::UnknownProperty => write!(f, "unknown property"),
            Self::ReadOnly => write!(f, "property is read-only"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The cloud connection is down.
    NotConnected,
    /// The outbound queue is full or the send was refused.
    SendFailed,
    /// The payload could not be encoded.
    Encode,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::SendFailed => write!(f, "send failed"),
            Self::Encode => write!(f, "payload encoding failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

/// Errors during one-shot peripheral initialisation.  Fatal: the firmware
/// exits with [`ExitCode::InitFailed`](crate::supervisor::ExitCode::InitFailed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    I2cInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed,
    SensorProbeFailed,
    WatchdogConfigFailed(i32),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2cInitFailed(rc) => write!(f, "I2C master init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::LedcInitFailed => write!(f, "LEDC timer/channel config failed"),
            Self::SensorProbeFailed => write!(f, "CO2 sensor did not respond"),
            Self::WatchdogConfigFailed(rc) => write!(f, "watchdog config failed (rc={rc})"),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_is_not_a_failure() {
        assert!(!SensorError::NotReady.is_failure());
        assert!(SensorError::Bus.is_failure());
        assert!(SensorError::Crc.is_failure());
        assert!(SensorError::OutOfRange.is_failure());
    }

    #[test]
    fn display_prefixes_domain() {
        let e: Error = ValidationError::OutOfRange.into();
        assert_eq!(e.to_string(), "validation: value out of range");
        let e: Error = InitError::I2cInitFailed(-1).into();
        assert_eq!(e.to_string(), "init: I2C master init failed (rc=-1)");
    }
}
