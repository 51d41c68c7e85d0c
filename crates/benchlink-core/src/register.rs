//! Numbered 16-bit register access.
//!
//! Temperature controllers expose their configuration as single 16-bit
//! registers at fixed addresses. The [`RegisterBus`] trait is the seam
//! between the register codec and whatever carries the register frames.
//!
//! # Integrity
//!
//! A `RegisterBus` carries no integrity check of its own. Register codecs
//! trust whatever value the bus returns: any CRC or framing validation is
//! the responsibility of the bus implementation (for example the Modbus RTU
//! CRC in `benchlink-transport`). This is a weaker guarantee than the
//! checksummed binary protocol and codecs must not pretend otherwise.

use async_trait::async_trait;

use crate::error::Result;

/// Read/write access to the 16-bit registers of one slave device.
#[async_trait]
pub trait RegisterBus: Send + Sync {
    /// Read one register.
    async fn read_register(&mut self, address: u16) -> Result<u16>;

    /// Write one register.
    async fn write_register(&mut self, address: u16, value: u16) -> Result<()>;

    /// Release the underlying transport.
    async fn close(&mut self) -> Result<()>;
}
