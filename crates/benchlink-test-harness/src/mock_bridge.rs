//! Mock sensor bridge.
//!
//! [`MockBridge`] records every bridge call and answers I2C reads from a
//! queue of canned replies. Clones share state, so a test can keep a handle
//! after boxing the bridge into a [`BridgeHandle`](benchlink_core::BridgeHandle).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use benchlink_core::bridge::SensorBridge;
use benchlink_core::error::{Error, Result};
use benchlink_core::types::BridgePort;

/// One call made on the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    /// `switch_supply_on(port)`
    SupplyOn(BridgePort),
    /// `switch_supply_off(port)`
    SupplyOff(BridgePort),
    /// `transceive_i2c(port, address, tx, rx_len, _)`
    Transceive {
        /// Bridge port.
        port: BridgePort,
        /// 7-bit I2C address.
        address: u8,
        /// Bytes written.
        tx: Vec<u8>,
        /// Bytes requested.
        rx_len: usize,
    },
    /// `set_supply_voltage(port, volts)`
    SupplyVoltage(BridgePort, f64),
    /// `set_i2c_frequency(port, hz)`
    I2cFrequency(BridgePort, u32),
    /// `measure_voltage(port)`
    MeasureVoltage(BridgePort),
    /// `blink_led(port)`
    Blink(BridgePort),
}

#[derive(Debug)]
enum Reply {
    Data(Vec<u8>),
    Nack,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<BridgeCall>,
    replies: VecDeque<Reply>,
    voltage: f64,
}

/// A [`SensorBridge`] that records calls and replays canned I2C replies.
#[derive(Debug, Clone, Default)]
pub struct MockBridge {
    state: Arc<Mutex<State>>,
}

impl MockBridge {
    /// Create a bridge with no queued replies.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("mock bridge poisoned".into()))
    }

    /// Queue the reply for the next I2C read (`rx_len > 0`).
    pub fn push_reply(&self, data: &[u8]) {
        if let Ok(mut state) = self.state() {
            state.replies.push_back(Reply::Data(data.to_vec()));
        }
    }

    /// Make the next I2C transfer fail as if the sensor did not acknowledge.
    pub fn push_nack(&self) {
        if let Ok(mut state) = self.state() {
            state.replies.push_back(Reply::Nack);
        }
    }

    /// Value returned by `measure_voltage`.
    pub fn set_voltage(&self, volts: f64) {
        if let Ok(mut state) = self.state() {
            state.voltage = volts;
        }
    }

    /// All calls, in order.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.state().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Only the I2C transfers, as `(address, tx)` pairs.
    pub fn transfers(&self) -> Vec<(u8, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BridgeCall::Transceive { address, tx, .. } => Some((address, tx)),
                _ => None,
            })
            .collect()
    }

    /// Number of I2C transfers so far.
    pub fn transceive_count(&self) -> usize {
        self.transfers().len()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state() {
            state.calls.clear();
        }
    }

    fn record(&self, call: BridgeCall) -> Result<()> {
        self.state()?.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl SensorBridge for MockBridge {
    async fn switch_supply_on(&mut self, port: BridgePort) -> Result<()> {
        self.record(BridgeCall::SupplyOn(port))
    }

    async fn switch_supply_off(&mut self, port: BridgePort) -> Result<()> {
        self.record(BridgeCall::SupplyOff(port))
    }

    async fn transceive_i2c(
        &mut self,
        port: BridgePort,
        address: u8,
        tx: &[u8],
        rx_len: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        state.calls.push(BridgeCall::Transceive {
            port,
            address,
            tx: tx.to_vec(),
            rx_len,
        });
        if rx_len == 0 {
            if matches!(state.replies.front(), Some(Reply::Nack)) {
                state.replies.pop_front();
                return Err(Error::Transport(format!("I2C NACK from 0x{address:02X}")));
            }
            return Ok(Vec::new());
        }
        match state.replies.pop_front() {
            Some(Reply::Data(mut data)) => {
                data.resize(rx_len, 0);
                Ok(data)
            }
            Some(Reply::Nack) => Err(Error::Transport(format!("I2C NACK from 0x{address:02X}"))),
            None => Err(Error::Timeout),
        }
    }

    async fn set_supply_voltage(&mut self, port: BridgePort, volts: f64) -> Result<()> {
        self.record(BridgeCall::SupplyVoltage(port, volts))
    }

    async fn set_i2c_frequency(&mut self, port: BridgePort, hz: u32) -> Result<()> {
        self.record(BridgeCall::I2cFrequency(port, hz))
    }

    async fn measure_voltage(&mut self, port: BridgePort) -> Result<f64> {
        let mut state = self.state()?;
        state.calls.push(BridgeCall::MeasureVoltage(port));
        Ok(state.voltage)
    }

    async fn blink_led(&mut self, port: BridgePort) -> Result<()> {
        self.record(BridgeCall::Blink(port))
    }
}
