//! BrooksBuilder -- fluent builder for [`Brooks0254`] hubs.
//!
//! Separates configuration from construction so that callers can set up the
//! serial port, network address and timeout before the bus is opened.
//!
//! # Example
//!
//! ```no_run
//! use benchlink_brooks::BrooksBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let unit = BrooksBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .address(42)
//!     .command_timeout(Duration::from_millis(800))
//!     .build()
//!     .await?;
//! let mut channel = unit.channel(1).await?;
//! channel.set_setpoint(55.0).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::link::Link;
use benchlink_core::transport::Transport;
use benchlink_transport::SerialTransport;

use crate::hub::Brooks0254;

/// Factory default baud rate of the 0254.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Fluent builder for [`Brooks0254`].
pub struct BrooksBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    address: Option<u32>,
    command_timeout: Duration,
}

impl Default for BrooksBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BrooksBuilder {
    /// Create a builder with factory defaults (9600 baud, no address, 1 s
    /// timeout).
    pub fn new() -> Self {
        BrooksBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            address: None,
            command_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Address the unit by its five-digit network address. Needed when more
    /// than one unit shares the bus.
    pub fn address(mut self, address: u32) -> Self {
        self.address = Some(address);
        self
    }

    /// Set the timeout for a single request/response exchange.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Build a [`Brooks0254`] on a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `benchlink-test-harness`) and for callers that manage the transport
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Brooks0254> {
        let link = Link::new(transport, self.command_timeout);
        Brooks0254::new(link, self.address)
    }

    /// Build a [`Brooks0254`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<Brooks0254> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::Transport("serial_port is required for build()".into()))?;
        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
