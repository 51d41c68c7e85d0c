//! Transport trait for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an instrument.
//! Implementations exist for serial ports and for mock transports used in
//! testing.
//!
//! Protocol codecs never call a `Transport` directly; they go through a
//! [`Link`](crate::link::Link), which serializes request/response exchanges
//! on a shared bus.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an instrument.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Protocol-level concerns (addressing, framing, checksums) are
/// handled by the codecs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the instrument.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying transport.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the instrument into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::TransportClosed`](crate::error::Error::TransportClosed).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently open.
    fn is_connected(&self) -> bool;
}
