//! One sensor on one bridge port.
//!
//! [`SensorPort`] owns the sensor's [`SensorState`] and is the only path to
//! the bridge's I2C transfer. Every transfer checks the state first, so a
//! command issued out of sequence fails with `NotReady` before the bridge is
//! touched.

use std::time::Duration;

use tracing::{debug, warn};

use benchlink_core::bridge::BridgeHandle;
use benchlink_core::error::Result;
use benchlink_core::types::BridgePort;

use crate::command;
use crate::state::SensorState;

/// I2C transfer timeout used by the sensor drivers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Time given to a sensor to boot after its supply is switched on.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(125);

/// A sensor's bridge port, I2C address and initialization state.
pub struct SensorPort {
    bridge: BridgeHandle,
    port: BridgePort,
    address: u8,
    state: SensorState,
    timeout: Duration,
    settle: Duration,
}

impl SensorPort {
    /// A sensor at `address` on `port`, initially unpowered.
    pub fn new(bridge: BridgeHandle, port: BridgePort, address: u8) -> Self {
        SensorPort {
            bridge,
            port,
            address,
            state: SensorState::Unpowered,
            timeout: DEFAULT_TIMEOUT,
            settle: DEFAULT_SETTLE,
        }
    }

    /// Override the I2C transfer timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Override the power-up settle time.
    pub fn set_settle(&mut self, settle: Duration) {
        self.settle = settle;
    }

    /// Current state.
    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Bridge port.
    pub fn port(&self) -> BridgePort {
        self.port
    }

    /// I2C address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Switch the supply on, wait for the sensor to boot and enter `booted`.
    ///
    /// If this future is dropped during the wait the sensor stays in
    /// `Powering` and keeps refusing commands.
    pub async fn power_on(&mut self, booted: SensorState) -> Result<()> {
        self.bridge.lock().await.switch_supply_on(self.port).await?;
        self.state = SensorState::Powering;
        debug!(port = %self.port, address = self.address, "supply on");
        tokio::time::sleep(self.settle).await;
        self.state = booted;
        Ok(())
    }

    /// Switch the supply off.
    pub async fn power_off(&mut self) -> Result<()> {
        self.bridge.lock().await.switch_supply_off(self.port).await?;
        self.state = SensorState::Unpowered;
        debug!(port = %self.port, address = self.address, "supply off");
        Ok(())
    }

    /// Record a state change caused by a command (CRC disable, soft reset).
    pub(crate) fn enter(&mut self, state: SensorState) {
        debug!(port = %self.port, address = self.address, from = %self.state, to = %state, "state change");
        self.state = state;
    }

    /// Send a command in `Ready` and read `rx_len` bytes.
    pub async fn send(&mut self, cmd: u16, arg: Option<u16>, rx_len: usize) -> Result<Vec<u8>> {
        self.state.require_ready()?;
        self.transfer(&command::encode_command(cmd, arg), rx_len).await
    }

    /// Send a command that is only valid in `state`.
    pub(crate) async fn send_in(&mut self, state: SensorState, cmd: u16) -> Result<Vec<u8>> {
        self.state.require(state)?;
        self.transfer(&command::encode_command(cmd, None), 0).await
    }

    async fn transfer(&mut self, tx: &[u8], rx_len: usize) -> Result<Vec<u8>> {
        let mut bridge = self.bridge.lock().await;
        let rx = bridge
            .transceive_i2c(self.port, self.address, tx, rx_len, self.timeout)
            .await
            .inspect_err(|e| {
                warn!(port = %self.port, address = self.address, tx = ?tx, error = %e, "I2C transfer failed");
            })?;
        debug!(port = %self.port, address = self.address, tx = ?tx, rx = ?rx, "I2C transfer");
        Ok(rx)
    }

    /// Analog input voltage of the port, in volts.
    pub async fn analog_measurement(&mut self) -> Result<f64> {
        self.bridge.lock().await.measure_voltage(self.port).await
    }

    /// Blink the port LED.
    pub async fn blink(&mut self) -> Result<()> {
        self.bridge.lock().await.blink_led(self.port).await
    }

    /// Set the port supply voltage, in volts.
    pub async fn set_supply_voltage(&mut self, volts: f64) -> Result<()> {
        self.bridge.lock().await.set_supply_voltage(self.port, volts).await
    }

    /// Set the port I2C clock, in hertz.
    pub async fn set_i2c_frequency(&mut self, hz: u32) -> Result<()> {
        self.bridge.lock().await.set_i2c_frequency(self.port, hz).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::bridge::bridge_handle;
    use benchlink_core::error::Error;
    use benchlink_test_harness::{BridgeCall, MockBridge};

    fn port(handle: &MockBridge) -> SensorPort {
        let mut sensor = SensorPort::new(bridge_handle(Box::new(handle.clone())), BridgePort::One, 0x29);
        sensor.set_settle(Duration::ZERO);
        sensor
    }

    #[tokio::test]
    async fn unpowered_sensor_never_reaches_the_bridge() {
        let handle = MockBridge::new();
        let mut sensor = port(&handle);
        assert!(matches!(
            sensor.send(0x3639, None, 6).await,
            Err(Error::NotReady(_))
        ));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn power_cycle() {
        let handle = MockBridge::new();
        let mut sensor = port(&handle);
        sensor.power_on(SensorState::CrcPending).await.unwrap();
        assert_eq!(sensor.state(), SensorState::CrcPending);
        sensor.power_off().await.unwrap();
        assert_eq!(sensor.state(), SensorState::Unpowered);
        assert_eq!(
            handle.calls(),
            vec![BridgeCall::SupplyOn(BridgePort::One), BridgeCall::SupplyOff(BridgePort::One)]
        );
    }

    #[tokio::test]
    async fn pass_throughs_need_no_power() {
        let handle = MockBridge::new();
        handle.set_voltage(1.25);
        let mut sensor = port(&handle);
        assert_eq!(sensor.analog_measurement().await.unwrap(), 1.25);
        sensor.blink().await.unwrap();
        sensor.set_supply_voltage(3.3).await.unwrap();
        sensor.set_i2c_frequency(400_000).await.unwrap();
        assert_eq!(
            handle.calls(),
            vec![
                BridgeCall::MeasureVoltage(BridgePort::One),
                BridgeCall::Blink(BridgePort::One),
                BridgeCall::SupplyVoltage(BridgePort::One, 3.3),
                BridgeCall::I2cFrequency(BridgePort::One, 400_000),
            ]
        );
    }
}
