//! Modbus RTU register bus.
//!
//! [`RtuBus`] implements [`RegisterBus`] on a `tokio-modbus` client
//! [`Context`] bound to one slave. Only two Modbus functions are used:
//!
//! - `0x03` read holding registers (always quantity 1)
//! - `0x06` write single register
//!
//! The context sits behind a [`tokio::sync::Mutex`] so clones of the bus
//! share one serial line and never overlap a request with another reply.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::error::Elapsed;
use tokio_modbus::client::{Context, Reader, Writer, rtu};
use tokio_modbus::slave::Slave;
use tracing::{debug, warn};

use benchlink_core::error::{Error, Rejection, Result};
use benchlink_core::register::RegisterBus;

use crate::serial::{SerialConfig, open_stream};

/// A Modbus RTU register bus to one slave.
#[derive(Clone)]
pub struct RtuBus {
    ctx: Arc<Mutex<Option<Context>>>,
    slave: u8,
    timeout: Duration,
}

impl RtuBus {
    /// Speak RTU to `slave` (1..=247) over any byte stream.
    pub fn attach<T>(transport: T, slave: u8, timeout: Duration) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Debug + Unpin + Send + 'static,
    {
        check_slave(slave)?;
        let ctx = rtu::attach_slave(transport, Slave(slave));
        Ok(RtuBus {
            ctx: Arc::new(Mutex::new(Some(ctx))),
            slave,
            timeout,
        })
    }

    /// Open `port` with `config` and speak RTU to `slave`.
    pub fn open(port: &str, config: &SerialConfig, slave: u8, timeout: Duration) -> Result<Self> {
        check_slave(slave)?;
        let stream = open_stream(port, config)?;
        Self::attach(stream, slave, timeout)
    }

    /// Slave address.
    pub fn slave(&self) -> u8 {
        self.slave
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn settle<T>(
        &self,
        address: u16,
        outcome: std::result::Result<tokio_modbus::Result<T>, Elapsed>,
    ) -> Result<T> {
        match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(code))) => {
                warn!(slave = self.slave, register = address, exception = ?code, "device returned Modbus exception");
                Err(Error::DeviceRejected(Rejection::Exception(u8::from(code))))
            }
            Ok(Err(e)) => Err(Error::Transport(format!("Modbus RTU: {e}"))),
            Err(_) => {
                debug!(slave = self.slave, register = address, "Modbus request timed out");
                Err(Error::Timeout)
            }
        }
    }
}

fn check_slave(slave: u8) -> Result<()> {
    if !(1..=247).contains(&slave) {
        return Err(Error::ValueOutOfRange {
            name: "slave address".into(),
            value: slave as f64,
            min: 1.0,
            max: 247.0,
        });
    }
    Ok(())
}

#[async_trait]
impl RegisterBus for RtuBus {
    async fn read_register(&mut self, address: u16) -> Result<u16> {
        let mut guard = self.ctx.lock().await;
        let ctx = guard.as_mut().ok_or(Error::TransportClosed)?;
        let outcome = tokio::time::timeout(self.timeout, ctx.read_holding_registers(address, 1)).await;
        let words = self.settle(address, outcome)?;
        match words.as_slice() {
            [value] => {
                debug!(slave = self.slave, register = address, value, "read register");
                Ok(*value)
            }
            _ => Err(Error::Protocol(format!(
                "expected one word for register 0x{address:04X}, got {words:?}"
            ))),
        }
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let mut guard = self.ctx.lock().await;
        let ctx = guard.as_mut().ok_or(Error::TransportClosed)?;
        let outcome = tokio::time::timeout(self.timeout, ctx.write_single_register(address, value)).await;
        self.settle(address, outcome)?;
        debug!(slave = self.slave, register = address, value, "wrote register");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.ctx.lock().await.take().is_some() {
            debug!(slave = self.slave, "closed Modbus RTU bus");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{CRC_16_MODBUS, Crc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

    fn with_crc(mut frame: Vec<u8>) -> Vec<u8> {
        let crc = CRC_MODBUS.checksum(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    /// Answer each 8-byte request with whatever `reply` returns; `None`
    /// leaves the request unanswered.
    fn fake_device<F>(mut reply: F) -> (DuplexStream, tokio::task::JoinHandle<Vec<Vec<u8>>>)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        let (client, mut server) = duplex(256);
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut request = [0u8; 8];
            while server.read_exact(&mut request).await.is_ok() {
                seen.push(request.to_vec());
                if let Some(bytes) = reply(&request) {
                    if server.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
            }
            seen
        });
        (client, handle)
    }

    #[tokio::test]
    async fn read_register_decodes_value() {
        let (stream, device) = fake_device(|req| Some(with_crc(vec![req[0], 0x03, 0x02, 0x00, 0xFA])));
        let mut bus = RtuBus::attach(stream, 1, Duration::from_millis(200)).unwrap();

        assert_eq!(bus.read_register(0x00).await.unwrap(), 250);
        bus.close().await.unwrap();
        drop(bus);

        let seen = device.await.unwrap();
        assert_eq!(seen, vec![vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]]);
    }

    #[tokio::test]
    async fn write_register_accepts_echo() {
        let (stream, device) = fake_device(|req| Some(req.to_vec()));
        let mut bus = RtuBus::attach(stream, 2, Duration::from_millis(200)).unwrap();

        bus.write_register(0x1A, 1000).await.unwrap();
        bus.close().await.unwrap();
        drop(bus);

        let seen = device.await.unwrap();
        assert_eq!(seen[0], with_crc(vec![0x02, 0x06, 0x00, 0x1A, 0x03, 0xE8]));
    }

    #[tokio::test]
    async fn exception_reply_is_rejection() {
        let (stream, _device) = fake_device(|req| Some(with_crc(vec![req[0], req[1] | 0x80, 0x02])));
        let mut bus = RtuBus::attach(stream, 1, Duration::from_millis(200)).unwrap();

        let err = bus.write_register(0x99, 1).await.unwrap_err();
        assert!(matches!(err, Error::DeviceRejected(Rejection::Exception(0x02))));
        let err = bus.read_register(0x99).await.unwrap_err();
        assert!(matches!(err, Error::DeviceRejected(Rejection::Exception(0x02))));
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let (stream, _device) = fake_device(|_| None);
        let mut bus = RtuBus::attach(stream, 1, Duration::from_millis(30)).unwrap();

        let err = bus.read_register(0x00).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test]
    async fn clones_share_one_line() {
        let (stream, device) = fake_device(|req| Some(with_crc(vec![req[0], 0x03, 0x02, 0x00, req[3]])));
        let bus = RtuBus::attach(stream, 1, Duration::from_millis(200)).unwrap();

        let mut tasks = Vec::new();
        for register in 1..=4u16 {
            let mut bus = bus.clone();
            tasks.push(tokio::spawn(async move { bus.read_register(register).await }));
        }
        for (register, task) in (1..=4u16).zip(tasks) {
            assert_eq!(task.await.unwrap().unwrap(), register);
        }

        let mut bus = bus;
        bus.close().await.unwrap();
        drop(bus);
        assert_eq!(device.await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn closed_bus_refuses_requests() {
        let (stream, _device) = fake_device(|req| Some(req.to_vec()));
        let mut bus = RtuBus::attach(stream, 1, Duration::from_millis(200)).unwrap();
        let mut sibling = bus.clone();

        bus.close().await.unwrap();
        assert!(matches!(sibling.read_register(0).await, Err(Error::TransportClosed)));
        assert!(matches!(sibling.write_register(0, 1).await, Err(Error::TransportClosed)));
    }

    #[test]
    fn slave_address_is_validated() {
        let (a, _b) = duplex(8);
        assert!(RtuBus::attach(a, 0, Duration::from_millis(10)).is_err());
        let (a, _b) = duplex(8);
        assert!(RtuBus::attach(a, 248, Duration::from_millis(10)).is_err());
    }
}
