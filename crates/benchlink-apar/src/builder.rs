//! Ar6x2Builder -- fluent builder for [`Ar6x2`] controllers.
//!
//! # Example
//!
//! ```no_run
//! use benchlink_apar::{Ar6x2Builder, ControlMode};
//!
//! # async fn example() -> benchlink_core::Result<()> {
//! let mut oven = Ar6x2Builder::new()
//!     .serial_port("/dev/ttyUSB2")
//!     .slave(3)
//!     .build()
//!     .await?;
//! oven.set_range(20.0, 400.0).await?;
//! oven.set_setpoint(250.0).await?;
//! oven.set_control_mode(ControlMode::Heating).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;
use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::register::RegisterBus;
use benchlink_transport::{Parity, RtuBus, SerialConfig};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::controller::Ar6x2;

/// Line settings the AR6X2 ships with: 19200 baud, 8N1.
pub const DEFAULT_SERIAL: SerialConfig = SerialConfig::new(19_200);

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default Modbus slave address.
pub const DEFAULT_SLAVE: u8 = 1;

/// Fluent builder for [`Ar6x2`].
pub struct Ar6x2Builder {
    serial_port: Option<String>,
    serial: SerialConfig,
    command_timeout: Duration,
    slave: u8,
}

impl Default for Ar6x2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Ar6x2Builder {
    /// Create a builder with defaults (19200 8N1, 500 ms, slave 1).
    pub fn new() -> Self {
        Ar6x2Builder {
            serial_port: None,
            serial: DEFAULT_SERIAL,
            command_timeout: DEFAULT_TIMEOUT,
            slave: DEFAULT_SLAVE,
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

    /// Override the parity, for controllers configured for 8E1 or 8O1.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.serial = self.serial.parity(parity);
        self
    }

    /// Set the timeout for a single request/response exchange.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Modbus slave address (1..=247).
    pub fn slave(mut self, slave: u8) -> Self {
        self.slave = slave;
        self
    }

    /// Build on an already constructed register bus.
    pub async fn build_with_bus(self, bus: Box<dyn RegisterBus>) -> Result<Ar6x2> {
        Ar6x2::open(bus).await
    }

    /// Build on a caller-provided byte stream, speaking Modbus RTU.
    pub async fn build_with_stream<T>(self, stream: T) -> Result<Ar6x2>
    where
        T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
    {
        let bus = RtuBus::attach(stream, self.slave, self.command_timeout)?;
        self.build_with_bus(Box::new(bus)).await
    }

    /// Build on a serial port. Requires [`serial_port()`](Self::serial_port).
    pub async fn build(self) -> Result<Ar6x2> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::Transport("serial_port is required for build()".into()))?;
        let bus = RtuBus::open(port, &self.serial, self.slave, self.command_timeout)?;
        self.build_with_bus(Box::new(bus)).await
    }
}
