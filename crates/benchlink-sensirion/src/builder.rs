//! SensorBuilder -- fluent builder for Sensirion sensors on a bridge port.
//!
//! # Example
//!
//! ```no_run
//! use benchlink_core::{BridgeHandle, BridgePort};
//! use benchlink_sensirion::SensorBuilder;
//!
//! # async fn example(bridge: BridgeHandle) -> benchlink_core::Result<()> {
//! let mut co2 = SensorBuilder::new(BridgePort::One)
//!     .build_stc31(bridge.clone())
//!     .await?;
//! co2.set_binary_gas("CO2 in air, 0-25%").await?;
//!
//! let mut climate = SensorBuilder::new(BridgePort::Two)
//!     .build_sht85(bridge)
//!     .await?;
//! let reading = climate.measure().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use benchlink_core::bridge::BridgeHandle;
use benchlink_core::error::Result;
use benchlink_core::types::BridgePort;

use crate::sensor::{DEFAULT_SETTLE, DEFAULT_TIMEOUT, SensorPort};
use crate::sht85::{self, Repeatability, Sht85};
use crate::stc31::{self, Stc31};

/// Fluent builder for [`Sht85`] and [`Stc31`].
///
/// The built sensor is powered and fully initialized.
pub struct SensorBuilder {
    port: BridgePort,
    command_timeout: Duration,
    settle_time: Duration,
    repeatability: Repeatability,
}

impl SensorBuilder {
    /// Create a builder for a sensor on `port` (100 ms I2C timeout, 125 ms
    /// power-up settle).
    pub fn new(port: BridgePort) -> Self {
        SensorBuilder {
            port,
            command_timeout: DEFAULT_TIMEOUT,
            settle_time: DEFAULT_SETTLE,
            repeatability: Repeatability::default(),
        }
    }

    /// Set the I2C transfer timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set how long to wait after switching the supply on.
    pub fn settle_time(mut self, settle: Duration) -> Self {
        self.settle_time = settle;
        self
    }

    /// SHT85 measurement repeatability.
    pub fn repeatability(mut self, repeatability: Repeatability) -> Self {
        self.repeatability = repeatability;
        self
    }

    fn sensor_port(&self, bridge: BridgeHandle, address: u8) -> SensorPort {
        let mut sensor = SensorPort::new(bridge, self.port, address);
        sensor.set_timeout(self.command_timeout);
        sensor.set_settle(self.settle_time);
        sensor
    }

    /// Power an SHT85 and return it ready.
    pub async fn build_sht85(self, bridge: BridgeHandle) -> Result<Sht85> {
        let mut sht = Sht85::from_port(self.sensor_port(bridge, sht85::I2C_ADDRESS));
        sht.set_repeatability(self.repeatability);
        sht.power_on().await?;
        Ok(sht)
    }

    /// Power an STC31, disable its CRC and return it ready.
    pub async fn build_stc31(self, bridge: BridgeHandle) -> Result<Stc31> {
        let mut stc = Stc31::from_port(self.sensor_port(bridge, stc31::I2C_ADDRESS));
        stc.initialize().await?;
        Ok(stc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SensorState;
    use benchlink_core::bridge::bridge_handle;
    use benchlink_core::instrument::Instrument;
    use benchlink_test_harness::{BridgeCall, MockBridge};

    #[tokio::test]
    async fn stc31_is_initialized() {
        let handle = MockBridge::new();
        let stc = SensorBuilder::new(BridgePort::Two)
            .settle_time(Duration::ZERO)
            .build_stc31(bridge_handle(Box::new(handle.clone())))
            .await
            .unwrap();
        assert_eq!(stc.state(), SensorState::Ready);
        assert_eq!(stc.info().model, "STC31");
        assert_eq!(handle.calls()[0], BridgeCall::SupplyOn(BridgePort::Two));
        assert_eq!(handle.transfers(), vec![(0x29, vec![0x37, 0x68])]);
    }

    #[tokio::test]
    async fn sht85_is_ready_without_transfers() {
        let handle = MockBridge::new();
        let sht = SensorBuilder::new(BridgePort::One)
            .settle_time(Duration::ZERO)
            .repeatability(Repeatability::Medium)
            .build_sht85(bridge_handle(Box::new(handle.clone())))
            .await
            .unwrap();
        assert_eq!(sht.state(), SensorState::Ready);
        assert_eq!(sht.repeatability(), Repeatability::Medium);
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn two_sensors_share_one_bridge() {
        let handle = MockBridge::new();
        let bridge = bridge_handle(Box::new(handle.clone()));
        let mut stc = SensorBuilder::new(BridgePort::One)
            .settle_time(Duration::ZERO)
            .build_stc31(bridge.clone())
            .await
            .unwrap();
        let mut sht = SensorBuilder::new(BridgePort::Two)
            .settle_time(Duration::ZERO)
            .build_sht85(bridge)
            .await
            .unwrap();
        handle.clear_calls();

        handle.set_voltage(0.5);
        assert_eq!(stc.analog_measurement().await.unwrap(), 0.5);
        sht.blink().await.unwrap();
        assert_eq!(
            handle.calls(),
            vec![
                BridgeCall::MeasureVoltage(BridgePort::One),
                BridgeCall::Blink(BridgePort::Two),
            ]
        );
    }
}
