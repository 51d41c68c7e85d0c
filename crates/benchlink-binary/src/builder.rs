//! BinaryMfcBuilder -- fluent builder for [`BinaryMfc`] instances.
//!
//! # Example
//!
//! ```no_run
//! use benchlink_binary::BinaryMfcBuilder;
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let mut mfc = BinaryMfcBuilder::new()
//!     .serial_port("/dev/ttyUSB1")
//!     .build()
//!     .await?;
//! mfc.set_gas_type("N2").await?;
//! mfc.set_setpoint(0.25).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::link::Link;
use benchlink_core::transport::Transport;
use benchlink_transport::SerialTransport;

use crate::device::BinaryMfc;

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Fluent builder for [`BinaryMfc`].
pub struct BinaryMfcBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    model: String,
}

impl Default for BinaryMfcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryMfcBuilder {
    /// Create a builder with defaults (9600 baud, 500 ms timeout).
    pub fn new() -> Self {
        BinaryMfcBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            command_timeout: DEFAULT_TIMEOUT,
            model: "binary MFC".into(),
        }
    }

    /// Set the serial port path.
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the timeout for a single request/response exchange.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Model string reported in the instrument info.
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Build on a caller-provided transport.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<BinaryMfc> {
        let link = Link::new(transport, self.command_timeout);
        Ok(BinaryMfc::new(link, &self.model))
    }

    /// Build on a serial port. Requires [`serial_port()`](Self::serial_port).
    pub async fn build(self) -> Result<BinaryMfc> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::Transport("serial_port is required for build()".into()))?;
        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
