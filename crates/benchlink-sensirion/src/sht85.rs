//! SHT85 temperature and humidity sensor.
//!
//! The SHT85 sits at I2C address 0x44. It has no CRC-disable command, so it
//! is ready as soon as it has booted and every reply word is CRC-checked.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use benchlink_core::bridge::BridgeHandle;
use benchlink_core::error::{Error, Result};
use benchlink_core::instrument::Instrument;
use benchlink_core::types::{BridgePort, InstrumentInfo, Measurement, Protocol, Value};

use crate::command;
use crate::sensor::SensorPort;
use crate::state::SensorState;

/// I2C address of the SHT85.
pub const I2C_ADDRESS: u8 = 0x44;

/// Length of a measurement reply: two CRC-protected words.
const MEASUREMENT_LEN: usize = 6;

/// Measurement repeatability. Higher repeatability takes longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repeatability {
    /// `0x2400`
    #[default]
    High,
    /// `0x240B`
    Medium,
    /// `0x2416`
    Low,
}

impl Repeatability {
    /// All repeatabilities.
    pub const ALL: [Repeatability; 3] = [Repeatability::High, Repeatability::Medium, Repeatability::Low];

    /// Single-shot measurement command.
    pub fn command(self) -> u16 {
        match self {
            Repeatability::High => 0x2400,
            Repeatability::Medium => 0x240B,
            Repeatability::Low => 0x2416,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Repeatability::High => "high",
            Repeatability::Medium => "medium",
            Repeatability::Low => "low",
        }
    }
}

impl fmt::Display for Repeatability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Repeatability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Repeatability::ALL
            .into_iter()
            .find(|r| r.label() == s)
            .ok_or_else(|| Error::UnknownEnumValue {
                table: "repeatability",
                value: s.to_string(),
            })
    }
}

/// One temperature/humidity reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sht85Reading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percent relative humidity.
    pub humidity: f64,
}

impl Sht85Reading {
    /// Decode a CRC-protected measurement reply.
    pub fn decode(reply: &[u8]) -> Result<Self> {
        match command::verified_words(reply)?.as_slice() {
            &[t, rh] => Ok(Sht85Reading {
                temperature: -45.0 + 175.0 * t as f64 / 65535.0,
                humidity: 100.0 * rh as f64 / 65535.0,
            }),
            words => Err(Error::Protocol(format!(
                "SHT85 measurement has {} words, expected 2",
                words.len()
            ))),
        }
    }
}

/// An SHT85 on one port of a sensor bridge.
pub struct Sht85 {
    sensor: SensorPort,
    repeatability: Repeatability,
    info: InstrumentInfo,
}

impl Sht85 {
    /// Attach to a sensor on `port` without powering it.
    pub fn new(bridge: BridgeHandle, port: BridgePort) -> Self {
        Self::from_port(SensorPort::new(bridge, port, I2C_ADDRESS))
    }

    pub(crate) fn from_port(sensor: SensorPort) -> Self {
        Sht85 {
            sensor,
            repeatability: Repeatability::default(),
            info: InstrumentInfo {
                manufacturer: crate::MANUFACTURER,
                model: "SHT85".to_string(),
                protocol: Protocol::I2cCommand,
            },
        }
    }

    /// Attach to a sensor on `port` and power it up.
    pub async fn open(bridge: BridgeHandle, port: BridgePort) -> Result<Self> {
        let mut sht = Self::new(bridge, port);
        sht.power_on().await?;
        Ok(sht)
    }

    /// Initialization state.
    pub fn state(&self) -> SensorState {
        self.sensor.state()
    }

    /// Switch the supply on and wait for the sensor to boot.
    pub async fn power_on(&mut self) -> Result<()> {
        self.sensor.power_on(SensorState::Ready).await
    }

    /// Switch the supply off.
    pub async fn power_off(&mut self) -> Result<()> {
        self.sensor.power_off().await
    }

    /// Repeatability used by [`measure`](Self::measure).
    pub fn repeatability(&self) -> Repeatability {
        self.repeatability
    }

    /// Select the measurement repeatability.
    pub fn set_repeatability(&mut self, repeatability: Repeatability) {
        self.repeatability = repeatability;
    }

    /// Take a single-shot measurement.
    pub async fn measure(&mut self) -> Result<Sht85Reading> {
        let reply = self
            .sensor
            .send(self.repeatability.command(), None, MEASUREMENT_LEN)
            .await?;
        let reading = Sht85Reading::decode(&reply)?;
        debug!(temperature = reading.temperature, humidity = reading.humidity, "SHT85 reading");
        Ok(reading)
    }

    /// Bridge port analog input, in volts.
    pub async fn analog_measurement(&mut self) -> Result<f64> {
        self.sensor.analog_measurement().await
    }

    /// Blink the bridge port LED.
    pub async fn blink(&mut self) -> Result<()> {
        self.sensor.blink().await
    }

    /// Set the bridge port supply voltage.
    pub async fn set_supply_voltage(&mut self, volts: f64) -> Result<()> {
        self.sensor.set_supply_voltage(volts).await
    }

    /// Set the bridge port I2C clock.
    pub async fn set_i2c_frequency(&mut self, hz: u32) -> Result<()> {
        self.sensor.set_i2c_frequency(hz).await
    }
}

#[async_trait]
impl Instrument for Sht85 {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        match name {
            "temperature" => Ok(Value::Number(self.measure().await?.temperature)),
            "humidity" => Ok(Value::Number(self.measure().await?.humidity)),
            "repeatability" => Ok(Value::Label(self.repeatability.to_string())),
            _ => Err(Error::UnknownParameter(name.to_string())),
        }
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "repeatability" => {
                let r: Repeatability = value.expect_label(name)?.parse()?;
                self.set_repeatability(r);
                Ok(())
            }
            "temperature" | "humidity" => Err(Error::ReadOnly(name.to_string())),
            _ => Err(Error::UnknownParameter(name.to_string())),
        }
    }

    /// Temperature as `primary`, humidity as `secondary`.
    async fn get_measurement(&mut self) -> Result<Measurement> {
        let reading = self.measure().await?;
        Ok(Measurement::now(reading.temperature, Some(reading.humidity)))
    }

    async fn close(&mut self) -> Result<()> {
        self.power_off().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::bridge::bridge_handle;
    use benchlink_test_harness::MockBridge;
    use std::time::Duration;

    fn word(raw: u16) -> [u8; 3] {
        let b = raw.to_be_bytes();
        [b[0], b[1], command::crc8(&b)]
    }

    fn reply(t: u16, rh: u16) -> Vec<u8> {
        [word(t), word(rh)].concat()
    }

    async fn ready(handle: &MockBridge) -> Sht85 {
        let mut port = SensorPort::new(bridge_handle(Box::new(handle.clone())), BridgePort::Two, I2C_ADDRESS);
        port.set_settle(Duration::ZERO);
        let mut sht = Sht85::from_port(port);
        sht.power_on().await.unwrap();
        sht
    }

    #[test]
    fn formulas() {
        let r = Sht85Reading::decode(&reply(0, 65535)).unwrap();
        assert_eq!(r.temperature, -45.0);
        assert_eq!(r.humidity, 100.0);
        let r = Sht85Reading::decode(&reply(65535, 0)).unwrap();
        assert_eq!(r.temperature, 130.0);
        assert_eq!(r.humidity, 0.0);
    }

    #[tokio::test]
    async fn powered_sensor_is_ready() {
        let handle = MockBridge::new();
        let sht = ready(&handle).await;
        assert_eq!(sht.state(), SensorState::Ready);
    }

    #[tokio::test]
    async fn measurement_uses_selected_repeatability() {
        let handle = MockBridge::new();
        let mut sht = ready(&handle).await;
        handle.push_reply(&reply(0x6666, 0x8000));
        handle.push_reply(&reply(0x6666, 0x8000));

        sht.measure().await.unwrap();
        sht.write("repeatability", Value::from("low")).await.unwrap();
        let m = sht.get_measurement().await.unwrap();

        assert_eq!(
            handle.transfers(),
            vec![(0x44, vec![0x24, 0x00]), (0x44, vec![0x24, 0x16])]
        );
        assert!((m.primary - (-45.0 + 175.0 * 0x6666 as f64 / 65535.0)).abs() < 1e-9);
        assert!((m.secondary.unwrap() - 100.0 * 0x8000 as f64 / 65535.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn corrupt_word_is_rejected() {
        let handle = MockBridge::new();
        let mut sht = ready(&handle).await;
        let mut bad = reply(0x6666, 0x8000);
        bad[4] ^= 0x01;
        handle.push_reply(&bad);
        assert!(matches!(sht.measure().await, Err(Error::ChecksumMismatch { .. })));
    }

    #[tokio::test]
    async fn unpowered_read_is_not_ready() {
        let handle = MockBridge::new();
        let mut sht = Sht85::new(bridge_handle(Box::new(handle.clone())), BridgePort::One);
        assert!(matches!(sht.read("temperature").await, Err(Error::NotReady(_))));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn names_are_checked() {
        let handle = MockBridge::new();
        let mut sht = ready(&handle).await;
        assert!(matches!(sht.read("co2").await, Err(Error::UnknownParameter(_))));
        assert!(matches!(
            sht.write("humidity", Value::Number(50.0)).await,
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            sht.write("repeatability", Value::from("extreme")).await,
            Err(Error::UnknownEnumValue { .. })
        ));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn close_powers_off() {
        let handle = MockBridge::new();
        let mut sht = ready(&handle).await;
        sht.close().await.unwrap();
        assert_eq!(sht.state(), SensorState::Unpowered);
    }
}
