//! Sensor bridge abstraction.
//!
//! Sensirion sensors are reached through a USB sensor bridge speaking SHDLC.
//! The bridge exposes two ports, each with a switchable supply and an I2C
//! master. [`SensorBridge`] captures exactly the primitives the sensor
//! drivers need; one bridge is shared by every sensor plugged into it via a
//! [`BridgeHandle`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::types::BridgePort;

/// Primitives offered by an I2C sensor bridge.
///
/// Errors reported by the bridge itself (NACK, I2C timeout) surface as
/// [`Error::Transport`](crate::Error::Transport) or
/// [`Error::Timeout`](crate::Error::Timeout); I2C replies carry no in-band
/// status.
#[async_trait]
pub trait SensorBridge: Send + Sync {
    /// Switch the supply of `port` on.
    async fn switch_supply_on(&mut self, port: BridgePort) -> Result<()>;

    /// Switch the supply of `port` off.
    async fn switch_supply_off(&mut self, port: BridgePort) -> Result<()>;

    /// Write `tx` to the I2C device at `address` and read `rx_len` bytes.
    ///
    /// With `rx_len == 0` this is a plain write and returns an empty vector.
    async fn transceive_i2c(
        &mut self,
        port: BridgePort,
        address: u8,
        tx: &[u8],
        rx_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>>;

    /// Set the supply voltage of `port`, in volts.
    async fn set_supply_voltage(&mut self, port: BridgePort, volts: f64) -> Result<()>;

    /// Set the I2C clock frequency of `port`, in hertz.
    async fn set_i2c_frequency(&mut self, port: BridgePort, hz: u32) -> Result<()>;

    /// Measure the analog input of `port`, in volts.
    async fn measure_voltage(&mut self, port: BridgePort) -> Result<f64>;

    /// Blink the LED of `port`.
    async fn blink_led(&mut self, port: BridgePort) -> Result<()>;
}

/// A sensor bridge shared between several sensors.
///
/// The mutex serializes bridge calls the same way a
/// [`Link`](crate::link::Link) serializes serial exchanges.
pub type BridgeHandle = Arc<Mutex<Box<dyn SensorBridge>>>;

/// Wrap a bridge into a shareable handle.
pub fn bridge_handle(bridge: Box<dyn SensorBridge>) -> BridgeHandle {
    Arc::new(Mutex::new(bridge))
}
