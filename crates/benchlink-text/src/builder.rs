//! TextSensorBuilder -- fluent builder for [`TextSensor`] instances.
//!
//! # Example
//!
//! ```no_run
//! use benchlink_text::TextSensorBuilder;
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let mut dmm = TextSensorBuilder::new()
//!     .serial_port("/dev/ttyUSB3")
//!     .query("READ?")
//!     .buffer_size(256)
//!     .build()
//!     .await?;
//! let line = dmm.poll().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::link::Link;
use benchlink_core::transport::Transport;
use benchlink_transport::{Parity, SerialConfig, SerialTransport};

use crate::buffer::DEFAULT_BUFFER_SIZE;
use crate::sensor::{DEFAULT_QUERY, TextSensor};

/// Line settings most bench instruments ship with: 9600 baud, 8N1.
pub const DEFAULT_SERIAL: SerialConfig = SerialConfig::new(9600);

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Fluent builder for [`TextSensor`].
pub struct TextSensorBuilder {
    serial_port: Option<String>,
    serial: SerialConfig,
    command_timeout: Duration,
    query: String,
    buffer_size: usize,
    model: String,
}

impl Default for TextSensorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSensorBuilder {
    /// Create a builder with defaults (9600 8N1, 1 s, `:MEAS?`, 64 samples).
    pub fn new() -> Self {
        TextSensorBuilder {
            serial_port: None,
            serial: DEFAULT_SERIAL,
            command_timeout: DEFAULT_TIMEOUT,
            query: DEFAULT_QUERY.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            model: "text sensor".into(),
        }
    }

    /// Set the serial port path.
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial.baud_rate = baud;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.serial = self.serial.parity(parity);
        self
    }

    /// Set the timeout for one query/reply exchange.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Query sent on every poll, without the trailing line feed.
    pub fn query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    /// Number of samples kept.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Model string reported in the instrument info.
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Build on a caller-provided transport.
    ///
    /// Fails before any I/O if the query or buffer size is invalid.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<TextSensor> {
        let link = Link::new(transport, self.command_timeout);
        let mut sensor = TextSensor::new(link, &self.model);
        sensor.set_query(&self.query)?;
        sensor.set_buffer_size(self.buffer_size)?;
        Ok(sensor)
    }

    /// Build on a serial port. Requires [`serial_port()`](Self::serial_port).
    pub async fn build(self) -> Result<TextSensor> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::Transport("serial_port is required for build()".into()))?;
        let transport = SerialTransport::open_with_config(port, self.serial).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
