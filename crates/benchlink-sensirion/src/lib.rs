//! Sensirion sensor backend for benchlink.
//!
//! Sensirion sensors are reached over I2C through a sensor bridge (the
//! [`SensorBridge`](benchlink_core::SensorBridge) seam). This crate
//! provides:
//!
//! - **Command codec** ([`command`]) -- 16-bit command words, arguments and
//!   the Sensirion CRC-8.
//! - **State machine** ([`state`]) -- the power-up sequence every sensor
//!   goes through before it accepts commands.
//! - **Sensor port** ([`sensor`]) -- the gate between a sensor and the
//!   bridge; nothing reaches the bridge out of sequence.
//! - **Sensors** ([`sht85`], [`stc31`]) -- both implement
//!   [`Instrument`](benchlink_core::Instrument).
//! - **Builder** ([`builder`]) -- [`SensorBuilder`], returning initialized
//!   sensors.

pub mod builder;
pub mod command;
pub mod sensor;
pub mod sht85;
pub mod state;
pub mod stc31;

pub use builder::SensorBuilder;
pub use sht85::{Repeatability, Sht85, Sht85Reading};
pub use state::SensorState;
pub use stc31::{Stc31, Stc31Param, Stc31Reading};

/// Manufacturer reported in [`InstrumentInfo`](benchlink_core::InstrumentInfo).
pub const MANUFACTURER: &str = "Sensirion";
