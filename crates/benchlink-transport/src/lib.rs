//! Transport implementations for benchlink.
//!
//! This crate provides concrete implementations of the seams defined in
//! `benchlink-core`:
//!
//! - [`SerialTransport`]: serial ports (RS-232, RS-485 adapters, USB virtual
//!   COM ports), implementing [`Transport`](benchlink_core::Transport)
//! - [`RtuBus`]: a Modbus RTU [`RegisterBus`](benchlink_core::RegisterBus)
//!   built on a `tokio-modbus` client context
//!
//! # Example
//!
//! ```no_run
//! use benchlink_core::RegisterBus;
//! use benchlink_transport::{RtuBus, SerialConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let config = SerialConfig::new(19200);
//! let mut bus = RtuBus::open("/dev/ttyUSB0", &config, 1, Duration::from_millis(500))?;
//! let raw = bus.read_register(0x00).await?;
//! # Ok(())
//! # }
//! ```

pub mod rtu;
pub mod serial;

pub use rtu::RtuBus;
pub use serial::{Parity, SerialConfig, SerialTransport, StopBits, open_stream};
