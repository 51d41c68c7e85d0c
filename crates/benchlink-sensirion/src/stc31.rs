//! STC31 thermal-conductivity CO2 sensor.
//!
//! The STC31 sits at I2C address 0x29. After power-up it must have its CRC
//! disabled before any other command; a soft reset re-enables the CRC and
//! sends the sensor back to [`SensorState::CrcPending`]. Replies are read
//! without CRC bytes.

use std::str::FromStr;
use std::sync::LazyLock;

use async_trait::async_trait;
use tracing::{debug, info};

use benchlink_core::bridge::BridgeHandle;
use benchlink_core::enumeration::BiMap;
use benchlink_core::error::{Error, Result};
use benchlink_core::instrument::Instrument;
use benchlink_core::scaling::Envelope;
use benchlink_core::types::{BridgePort, InstrumentInfo, Measurement, Protocol, Value};

use crate::command;
use crate::sensor::SensorPort;
use crate::state::SensorState;

/// I2C address of the STC31.
pub const I2C_ADDRESS: u8 = 0x29;

const DISABLE_CRC: u16 = 0x3768;
const SET_BINARY_GAS: u16 = 0x3615;
const SET_RELATIVE_HUMIDITY: u16 = 0x3624;
const SET_TEMPERATURE: u16 = 0x361E;
const SET_PRESSURE: u16 = 0x362F;
const MEASURE_GAS: u16 = 0x3639;
const FORCED_RECALIBRATION: u16 = 0x3661;
const ASC_ENABLE: u16 = 0x3FEF;
const ASC_DISABLE: u16 = 0x3F6E;
const SELF_TEST: u16 = 0x365B;
const SOFT_RESET: u16 = 0x0006;

/// Offset of the gas concentration and recalibration encodings.
const GAS_OFFSET: f64 = 16_384.0;
/// Counts per 100 % of gas concentration.
const GAS_SPAN: f64 = 32_768.0;

/// Relative humidity compensation, percent.
pub const HUMIDITY_ENVELOPE: Envelope = Envelope::new(0.0, 100.0);
/// Temperature compensation, degrees Celsius.
pub const TEMPERATURE_ENVELOPE: Envelope = Envelope::new(-163.84, 163.835);
/// Pressure compensation, mbar.
pub const PRESSURE_ENVELOPE: Envelope = Envelope::new(0.0, 65_535.0);
/// Forced recalibration reference, percent.
pub const RECALIBRATION_ENVELOPE: Envelope = Envelope::new(0.0, 100.0);

/// Binary gas mixtures the sensor can be calibrated for.
pub static BINARY_GAS: LazyLock<BiMap<u16>> = LazyLock::new(|| {
    BiMap::new(
        "binary gas",
        &[
            ("CO2 in N2, 0-100%", 0x0000),
            ("CO2 in air, 0-100%", 0x0001),
            ("CO2 in N2, 0-25%", 0x0002),
            ("CO2 in air, 0-25%", 0x0003),
        ],
    )
});

/// One gas measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stc31Reading {
    /// Gas concentration, percent by volume.
    pub concentration: f64,
    /// Sensor temperature, degrees Celsius.
    pub temperature: f64,
}

impl Stc31Reading {
    /// Decode a measurement reply (concentration, temperature, reserved).
    pub fn decode(reply: &[u8]) -> Result<Self> {
        let gas = command::word_at(reply, 0)?;
        let temp = command::word_at(reply, 2)?;
        Ok(Stc31Reading {
            concentration: 100.0 * (gas as f64 - GAS_OFFSET) / GAS_SPAN,
            temperature: temp as i16 as f64 / 200.0,
        })
    }
}

/// An STC31 on one port of a sensor bridge.
pub struct Stc31 {
    sensor: SensorPort,
    info: InstrumentInfo,
}

impl Stc31 {
    /// Attach to a sensor on `port` without powering it.
    pub fn new(bridge: BridgeHandle, port: BridgePort) -> Self {
        Self::from_port(SensorPort::new(bridge, port, I2C_ADDRESS))
    }

    pub(crate) fn from_port(sensor: SensorPort) -> Self {
        Stc31 {
            sensor,
            info: InstrumentInfo {
                manufacturer: crate::MANUFACTURER,
                model: "STC31".to_string(),
                protocol: Protocol::I2cCommand,
            },
        }
    }

    /// Attach to a sensor on `port`, power it and disable its CRC.
    pub async fn open(bridge: BridgeHandle, port: BridgePort) -> Result<Self> {
        let mut stc = Self::new(bridge, port);
        stc.initialize().await?;
        Ok(stc)
    }

    /// Power the sensor and disable its CRC.
    pub async fn initialize(&mut self) -> Result<()> {
        self.power_on().await?;
        self.disable_crc().await
    }

    /// Initialization state.
    pub fn state(&self) -> SensorState {
        self.sensor.state()
    }

    /// Switch the supply on and wait for the sensor to boot.
    pub async fn power_on(&mut self) -> Result<()> {
        self.sensor.power_on(SensorState::CrcPending).await
    }

    /// Switch the supply off.
    pub async fn power_off(&mut self) -> Result<()> {
        self.sensor.power_off().await
    }

    /// Disable the reply CRC. Only valid right after boot or soft reset.
    pub async fn disable_crc(&mut self) -> Result<()> {
        self.sensor.send_in(SensorState::CrcPending, DISABLE_CRC).await?;
        self.sensor.enter(SensorState::Ready);
        Ok(())
    }

    async fn command(&mut self, cmd: u16, arg: Option<u16>) -> Result<()> {
        self.sensor.send(cmd, arg, 0).await?;
        Ok(())
    }

    /// Select the binary gas mixture by label (see [`BINARY_GAS`]).
    pub async fn set_binary_gas(&mut self, gas: &str) -> Result<()> {
        let code = BINARY_GAS.code(gas)?;
        self.command(SET_BINARY_GAS, Some(code)).await?;
        info!(gas, "STC31 binary gas set");
        Ok(())
    }

    /// Set the relative humidity used for compensation, percent.
    pub async fn set_relative_humidity(&mut self, rh: f64) -> Result<()> {
        let rh = HUMIDITY_ENVELOPE.check("relative_humidity", rh)?;
        self.command(SET_RELATIVE_HUMIDITY, Some((65_535.0 * rh / 100.0) as u16))
            .await
    }

    /// Set the temperature used for compensation, degrees Celsius.
    pub async fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        let t = TEMPERATURE_ENVELOPE.check("temperature", temperature)?;
        self.command(SET_TEMPERATURE, Some((200.0 * t) as i16 as u16))
            .await
    }

    /// Set the pressure used for compensation, mbar.
    pub async fn set_pressure(&mut self, mbar: u16) -> Result<()> {
        self.command(SET_PRESSURE, Some(mbar)).await
    }

    /// Measure the gas concentration and sensor temperature.
    pub async fn measure(&mut self) -> Result<Stc31Reading> {
        let reply = self.sensor.send(MEASURE_GAS, None, 6).await?;
        let reading = Stc31Reading::decode(&reply)?;
        debug!(
            concentration = reading.concentration,
            temperature = reading.temperature,
            "STC31 reading"
        );
        Ok(reading)
    }

    /// Measure the gas concentration, percent by volume.
    pub async fn measure_gas_concentration(&mut self) -> Result<f64> {
        Ok(self.measure().await?.concentration)
    }

    /// Recalibrate against a known reference concentration, percent.
    pub async fn forced_recalibration(&mut self, reference: f64) -> Result<()> {
        let reference = RECALIBRATION_ENVELOPE.check("forced_recalibration", reference)?;
        let arg = (reference * GAS_SPAN / 100.0) as u16 + GAS_OFFSET as u16;
        self.command(FORCED_RECALIBRATION, Some(arg)).await?;
        info!(reference, "STC31 recalibrated");
        Ok(())
    }

    /// Switch automatic self calibration on or off.
    pub async fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<()> {
        let cmd = if enabled { ASC_ENABLE } else { ASC_DISABLE };
        self.command(cmd, None).await
    }

    /// Run the built-in self test and return the raw status word.
    pub async fn self_test(&mut self) -> Result<u16> {
        let reply = self.sensor.send(SELF_TEST, None, 2).await?;
        command::word_at(&reply, 0)
    }

    /// Reset the sensor. The CRC must be disabled again afterwards.
    pub async fn soft_reset(&mut self) -> Result<()> {
        self.command(SOFT_RESET, None).await?;
        self.sensor.enter(SensorState::CrcPending);
        Ok(())
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

/// Parameters reachable through [`Instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stc31Param {
    /// Gas concentration, percent (read-only).
    GasConcentration,
    /// Sensor temperature, °C (read-only).
    GasTemperature,
    /// Raw self-test word (read-only).
    SelfTest,
    /// Binary gas mixture label (write-only).
    BinaryGas,
    /// Humidity compensation, percent (write-only).
    RelativeHumidity,
    /// Temperature compensation, °C (write-only).
    Temperature,
    /// Pressure compensation, mbar (write-only).
    Pressure,
    /// Forced recalibration reference, percent (write-only).
    ForcedRecalibration,
    /// Automatic self-calibration flag (write-only).
    AutomaticSelfCalibration,
}

impl Stc31Param {
    /// All parameters.
    pub const ALL: [Stc31Param; 9] = [
        Stc31Param::GasConcentration,
        Stc31Param::GasTemperature,
        Stc31Param::SelfTest,
        Stc31Param::BinaryGas,
        Stc31Param::RelativeHumidity,
        Stc31Param::Temperature,
        Stc31Param::Pressure,
        Stc31Param::ForcedRecalibration,
        Stc31Param::AutomaticSelfCalibration,
    ];

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            Stc31Param::GasConcentration => "gas_concentration",
            Stc31Param::GasTemperature => "gas_temperature",
            Stc31Param::SelfTest => "self_test",
            Stc31Param::BinaryGas => "binary_gas",
            Stc31Param::RelativeHumidity => "relative_humidity",
            Stc31Param::Temperature => "temperature",
            Stc31Param::Pressure => "pressure",
            Stc31Param::ForcedRecalibration => "forced_recalibration",
            Stc31Param::AutomaticSelfCalibration => "automatic_self_calibration",
        }
    }

    /// Whether the sensor can report this parameter. The rest are
    /// compensation and calibration inputs it only accepts.
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            Stc31Param::GasConcentration | Stc31Param::GasTemperature | Stc31Param::SelfTest
        )
    }
}

impl FromStr for Stc31Param {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Stc31Param::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

#[async_trait]
impl Instrument for Stc31 {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        let param: Stc31Param = name.parse()?;
        match param {
            Stc31Param::GasConcentration => Ok(Value::Number(self.measure().await?.concentration)),
            Stc31Param::GasTemperature => Ok(Value::Number(self.measure().await?.temperature)),
            Stc31Param::SelfTest => Ok(Value::Number(self.self_test().await? as f64)),
            _ => Err(Error::InvalidValue(format!("{} is write-only", param.name()))),
        }
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let param: Stc31Param = name.parse()?;
        let name = param.name();
        match param {
            Stc31Param::BinaryGas => self.set_binary_gas(value.expect_label(name)?).await,
            Stc31Param::RelativeHumidity => {
                self.set_relative_humidity(value.expect_number(name)?).await
            }
            Stc31Param::Temperature => self.set_temperature(value.expect_number(name)?).await,
            Stc31Param::Pressure => {
                let mbar = PRESSURE_ENVELOPE.check(name, value.expect_number(name)?)?;
                self.set_pressure(mbar.round() as u16).await
            }
            Stc31Param::ForcedRecalibration => {
                self.forced_recalibration(value.expect_number(name)?).await
            }
            Stc31Param::AutomaticSelfCalibration => {
                self.set_automatic_self_calibration(value.expect_flag(name)?)
                    .await
            }
            Stc31Param::GasConcentration | Stc31Param::GasTemperature | Stc31Param::SelfTest => {
                Err(Error::ReadOnly(name.to_string()))
            }
        }
    }

    /// Gas concentration as `primary`, sensor temperature as `secondary`.
    async fn get_measurement(&mut self) -> Result<Measurement> {
        let reading = self.measure().await?;
        Ok(Measurement::now(reading.concentration, Some(reading.temperature)))
    }

    async fn close(&mut self) -> Result<()> {
        self.power_off().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::bridge::bridge_handle;
    use benchlink_test_harness::{BridgeCall, MockBridge};
    use std::time::Duration;

    fn unpowered(handle: &MockBridge) -> Stc31 {
        let mut port = SensorPort::new(bridge_handle(Box::new(handle.clone())), BridgePort::One, I2C_ADDRESS);
        port.set_settle(Duration::ZERO);
        Stc31::from_port(port)
    }

    async fn ready(handle: &MockBridge) -> Stc31 {
        let mut stc = unpowered(handle);
        stc.initialize().await.unwrap();
        handle.clear_calls();
        stc
    }

    // ---------------------------------------------------------------
    // Initialization sequence
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn command_while_unpowered_never_transceives() {
        let handle = MockBridge::new();
        let mut stc = unpowered(&handle);
        assert!(matches!(
            stc.set_binary_gas("CO2 in air, 0-25%").await,
            Err(Error::NotReady(_))
        ));
        assert!(matches!(stc.measure().await, Err(Error::NotReady(_))));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn crc_must_be_disabled_before_commands() {
        let handle = MockBridge::new();
        let mut stc = unpowered(&handle);
        stc.power_on().await.unwrap();
        assert_eq!(stc.state(), SensorState::CrcPending);
        assert!(matches!(stc.self_test().await, Err(Error::NotReady(_))));
        assert_eq!(handle.transceive_count(), 0);

        stc.disable_crc().await.unwrap();
        assert_eq!(stc.state(), SensorState::Ready);
        assert_eq!(
            handle.calls(),
            vec![
                BridgeCall::SupplyOn(BridgePort::One),
                BridgeCall::Transceive {
                    port: BridgePort::One,
                    address: 0x29,
                    tx: vec![0x37, 0x68],
                    rx_len: 0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn disable_crc_is_refused_when_unpowered_or_ready() {
        let handle = MockBridge::new();
        let mut stc = unpowered(&handle);
        assert!(matches!(stc.disable_crc().await, Err(Error::NotReady(_))));
        let mut stc = ready(&handle).await;
        assert!(matches!(stc.disable_crc().await, Err(Error::NotReady(_))));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[tokio::test]
    async fn nacked_crc_disable_stays_pending() {
        let handle = MockBridge::new();
        let mut stc = unpowered(&handle);
        handle.push_nack();
        assert!(stc.initialize().await.is_err());
        assert_eq!(stc.state(), SensorState::CrcPending);
    }

    #[tokio::test]
    async fn soft_reset_requires_crc_disable_again() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        stc.soft_reset().await.unwrap();
        assert_eq!(stc.state(), SensorState::CrcPending);
        assert!(matches!(stc.measure().await, Err(Error::NotReady(_))));
        stc.disable_crc().await.unwrap();
        assert_eq!(
            handle.transfers(),
            vec![(0x29, vec![0x00, 0x06]), (0x29, vec![0x37, 0x68])]
        );
    }

    #[tokio::test]
    async fn power_off_returns_to_unpowered() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        stc.close().await.unwrap();
        assert_eq!(stc.state(), SensorState::Unpowered);
        assert!(matches!(stc.self_test().await, Err(Error::NotReady(_))));
    }

    // ---------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn argument_encodings() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        stc.set_binary_gas("CO2 in air, 0-25%").await.unwrap();
        stc.set_relative_humidity(50.0).await.unwrap();
        stc.set_temperature(-10.0).await.unwrap();
        stc.set_pressure(1013).await.unwrap();
        stc.forced_recalibration(50.0).await.unwrap();
        stc.set_automatic_self_calibration(true).await.unwrap();
        stc.set_automatic_self_calibration(false).await.unwrap();

        let neg = (-2000i16 as u16).to_be_bytes();
        assert_eq!(
            handle.transfers(),
            vec![
                (0x29, vec![0x36, 0x15, 0x00, 0x03]),
                (0x29, vec![0x36, 0x24, 0x7F, 0xFF]),
                (0x29, vec![0x36, 0x1E, neg[0], neg[1]]),
                (0x29, vec![0x36, 0x2F, 0x03, 0xF5]),
                (0x29, vec![0x36, 0x61, 0x80, 0x00]),
                (0x29, vec![0x3F, 0xEF]),
                (0x29, vec![0x3F, 0x6E]),
            ]
        );
    }

    #[tokio::test]
    async fn validation_never_transceives() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        assert!(matches!(
            stc.set_binary_gas("CO2 in Ar").await,
            Err(Error::UnknownEnumValue { .. })
        ));
        assert!(matches!(
            stc.set_relative_humidity(100.5).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            stc.set_temperature(164.0).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            stc.forced_recalibration(-1.0).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            stc.write("pressure", Value::Number(70_000.0)).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            stc.read("binary_gas").await,
            Err(Error::InvalidValue(_))
        ));
        assert_eq!(handle.transceive_count(), 0);
    }

    #[test]
    fn parameter_names_parse() {
        for param in Stc31Param::ALL {
            assert_eq!(param.name().parse::<Stc31Param>().unwrap(), param);
        }
        assert!(matches!(
            "co2".parse::<Stc31Param>(),
            Err(Error::UnknownParameter(_))
        ));
        let readable: Vec<_> = Stc31Param::ALL.into_iter().filter(|p| p.is_readable()).collect();
        assert_eq!(
            readable,
            vec![Stc31Param::GasConcentration, Stc31Param::GasTemperature, Stc31Param::SelfTest]
        );
    }

    #[tokio::test]
    async fn instrument_dispatch_by_parameter() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;

        assert!(matches!(
            stc.write("gas_temperature", Value::Number(20.0)).await,
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(stc.read("co2").await, Err(Error::UnknownParameter(_))));
        assert!(matches!(
            stc.write("co2", Value::Number(1.0)).await,
            Err(Error::UnknownParameter(_))
        ));
        assert_eq!(handle.transceive_count(), 0);

        stc.write("relative_humidity", Value::Number(50.0)).await.unwrap();
        stc.write("automatic_self_calibration", Value::Flag(true)).await.unwrap();
        assert_eq!(handle.transceive_count(), 2);
    }

    #[tokio::test]
    async fn gas_measurement() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        // 50 %, 25.0 degC
        handle.push_reply(&[0x80, 0x00, 0x13, 0x88, 0x00, 0x00]);
        let m = stc.get_measurement().await.unwrap();
        assert_eq!(m.primary, 50.0);
        assert_eq!(m.secondary, Some(25.0));
        assert_eq!(
            handle.calls(),
            vec![BridgeCall::Transceive {
                port: BridgePort::One,
                address: 0x29,
                tx: vec![0x36, 0x39],
                rx_len: 6,
            }]
        );
    }

    #[tokio::test]
    async fn zero_offset_reads_zero_percent() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        handle.push_reply(&[0x40, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(stc.measure_gas_concentration().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn self_test_returns_raw_word() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        handle.push_reply(&[0x00, 0x00]);
        assert_eq!(stc.self_test().await.unwrap(), 0);
        handle.push_reply(&[0x00, 0x01]);
        assert_eq!(stc.read("self_test").await.unwrap(), Value::Number(1.0));
    }

    #[tokio::test]
    async fn missing_reply_is_timeout() {
        let handle = MockBridge::new();
        let mut stc = ready(&handle).await;
        assert!(matches!(stc.measure().await, Err(Error::Timeout)));
    }
}
