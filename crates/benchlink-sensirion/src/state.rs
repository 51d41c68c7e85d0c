//! Sensor initialization state machine.
//!
//! ```text
//! Unpowered --power on--> Powering --settled--> CrcPending --disable CRC--> Ready
//!     ^                                              ^                        |
//!     |                                              +------soft reset--------+
//!     +----------------------- power off (from any state) --------------------+
//! ```
//!
//! Sensors without a CRC-disable command go from `Powering` straight to
//! `Ready`. Only `Ready` accepts measurement and configuration commands.

use std::fmt;

use benchlink_core::error::{Error, Result};

/// Where a sensor is in its power-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SensorState {
    /// Supply off.
    #[default]
    Unpowered,
    /// Supply on, waiting for the sensor to boot.
    Powering,
    /// Booted, CRC not yet disabled.
    CrcPending,
    /// Accepting commands.
    Ready,
}

impl SensorState {
    /// Fail with `NotReady` unless the sensor is in `Ready`.
    pub fn require_ready(self) -> Result<()> {
        self.require(SensorState::Ready)
    }

    /// Fail with `NotReady` unless the sensor is in `wanted`.
    pub fn require(self, wanted: SensorState) -> Result<()> {
        if self == wanted {
            Ok(())
        } else {
            Err(Error::NotReady(self.to_string()))
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorState::Unpowered => write!(f, "unpowered"),
            SensorState::Powering => write!(f, "powering"),
            SensorState::CrcPending => write!(f, "CRC pending"),
            SensorState::Ready => write!(f, "ready"),
        }
    }
}
