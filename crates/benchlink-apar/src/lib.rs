//! APAR AR6X2 temperature controller backend for benchlink.
//!
//! The AR6X2 is driven through single 16-bit registers:
//!
//! - **Register map** ([`registers`]) -- addresses, tenths encoding, the
//!   envelopes and the [`ControlMode`] that owns both mode registers.
//! - **Facade** ([`controller`]) -- [`Ar6x2`], with range-aware setpoint
//!   clamping and the two-step ramp program, implementing
//!   [`Instrument`](benchlink_core::Instrument).
//! - **Builder** ([`builder`]) -- [`Ar6x2Builder`], which puts a Modbus RTU
//!   [`RtuBus`](benchlink_transport::RtuBus) under the controller.
//!
//! The facade works on any [`RegisterBus`](benchlink_core::RegisterBus).
//! The register layer has no integrity check of its own; the RTU CRC in
//! the transport is the only one.

pub mod builder;
pub mod controller;
pub mod registers;

pub use builder::Ar6x2Builder;
pub use controller::{Ar6x2, RampStep};
pub use registers::{AparParam, ControlMode};
