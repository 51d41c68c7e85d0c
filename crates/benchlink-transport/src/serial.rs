//! Serial port transport for instrument communication.
//!
//! [`SerialTransport`] implements the [`Transport`] trait for RS-232/RS-485
//! adapters and USB virtual COM ports.
//!
//! Line settings of the supported instruments (each builder carries its own
//! [`SerialConfig`]):
//! - Brooks 0254 (ASCII multidrop): 9600 8N1
//! - Binary checksummed MFCs: 9600 8N1
//! - APAR AR6X2 (Modbus RTU): 19200 8N1, parity selectable
//! - Text sensors: 9600 8N1
//!
//! # Example
//!
//! ```no_run
//! use benchlink_transport::SerialTransport;
//! use benchlink_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! // Ask channel 1 of a Brooks 0254 for its measurement
//! transport.send(b"AZ.1K\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use benchlink_core::error::{Error, Result};
use benchlink_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

pub use tokio_serial::{Parity, StopBits};

/// Line settings for one instrument family.
///
/// Every supported instrument uses 8 data bits and no flow control, so only
/// the baud rate, parity and stop bits vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialConfig {
    /// 8N1 at `baud_rate`.
    pub const fn new(baud_rate: u32) -> Self {
        SerialConfig {
            baud_rate,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    pub const fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub const fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig::new(9600)
    }
}

/// Open `port` as a raw async stream with 8 data bits and no flow control.
///
/// Shared by [`SerialTransport`] and [`RtuBus::open`](crate::RtuBus::open).
pub fn open_stream(port: &str, config: &SerialConfig) -> Result<SerialStream> {
    tracing::debug!(
        port = %port,
        baud_rate = config.baud_rate,
        parity = ?config.parity,
        stop_bits = ?config.stop_bits,
        "Opening serial port"
    );

    let mut stream = tokio_serial::new(port, config.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(config.parity)
        .stop_bits(config.stop_bits)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| {
            tracing::error!(port = %port, error = %e, "Failed to open serial port");
            Error::Transport(format!("Failed to open serial port {}: {}", port, e))
        })?;

    // RS-485 adapters use RTS for direction control; leave it deasserted.
    if let Err(e) = stream.write_request_to_send(false) {
        tracing::warn!(port = %port, error = %e, "Failed to de-assert RTS");
    }

    tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");
    Ok(stream)
}

/// Serial port transport for instrument communication.
///
/// The port is released on [`close`](Transport::close) or on drop; after
/// closing, `send` and `receive` fail with [`Error::TransportClosed`].
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate`, 8N1.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(port, SerialConfig::new(baud_rate)).await
    }

    /// Open a serial port with explicit line settings.
    ///
    /// ```no_run
    /// # use benchlink_transport::{Parity, SerialConfig, SerialTransport};
    /// # async fn example() -> benchlink_core::Result<()> {
    /// let config = SerialConfig::new(19200).parity(Parity::Even);
    /// let transport = SerialTransport::open_with_config("/dev/ttyUSB0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        let stream = open_stream(port, &config)?;
        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::TransportClosed)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?data,
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(
                port = %self.port_name,
                error = %e,
                "Failed to send data"
            );
            map_io_error(e)
        })?;

        // Flush to ensure data is transmitted immediately
        port.flush().await.map_err(|e| {
            tracing::error!(
                port = %self.port_name,
                error = %e,
                "Failed to flush serial port"
            );
            Error::Io(e)
        })?;

        tracing::trace!(port = %self.port_name, "Data sent successfully");

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::TransportClosed)?;

        tracing::trace!(
            port = %self.port_name,
            buf_len = buf.len(),
            timeout_ms = timeout.as_millis(),
            "Waiting for data"
        );

        let result = tokio::time::timeout(timeout, port.read(buf)).await;

        match result {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to receive data"
                );
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(port = %self.port_name, "Closing serial port");

            // Flush any pending data before closing
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            // The port will be dropped here, which closes it
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// A vanished USB adapter shows up as a broken pipe; report it as a closed
/// transport so callers stop issuing requests.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => {
            Error::TransportClosed
        }
        _ => Error::Io(e),
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_config_default_is_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
    }

    #[test]
    fn serial_config_overrides_line_settings() {
        let config = SerialConfig::new(19200).parity(Parity::Even).stop_bits(StopBits::Two);
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::Two);
    }

    #[test]
    fn broken_pipe_maps_to_transport_closed() {
        let e = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
        assert!(matches!(map_io_error(e), Error::TransportClosed));
        let e = std::io::Error::other("glitch");
        assert!(matches!(map_io_error(e), Error::Io(_)));
    }

    #[tokio::test]
    async fn opening_missing_port_fails() {
        let result = SerialTransport::open("/dev/benchlink-does-not-exist", 9600).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        let result = open_stream("/dev/benchlink-does-not-exist", &SerialConfig::new(19200));
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
