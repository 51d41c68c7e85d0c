//! `BinaryMfc` -- facade for a binary checksummed mass-flow controller.
//!
//! Every operation is one request frame and one reply frame through the
//! [`Link`]. Replies are checked for faults, length, checksum and echo
//! before any payload byte is used; writes additionally require the device
//! to echo the value that was written.

use async_trait::async_trait;
use tracing::{debug, warn};

use benchlink_core::error::{Error, Result};
use benchlink_core::instrument::Instrument;
use benchlink_core::link::Link;
use benchlink_core::types::{InstrumentInfo, Measurement, Protocol, Value};

use crate::frame::{self, Width};
use crate::variables::{self, BinaryVariable};

/// A binary-protocol mass-flow controller.
pub struct BinaryMfc {
    link: Link,
    info: InstrumentInfo,
}

impl BinaryMfc {
    /// Wrap an open link.
    pub fn new(link: Link, model: &str) -> Self {
        BinaryMfc {
            link,
            info: InstrumentInfo {
                manufacturer: "Generic",
                model: model.to_string(),
                protocol: Protocol::BinaryChecksum,
            },
        }
    }

    async fn exchange(&self, request: &[u8], request_code: u8, width: Width) -> Result<u16> {
        let reply = self.link.exchange(request, frame::reply_framer(width)).await?;
        frame::decode_reply(request_code, width, &reply).inspect_err(|e| {
            warn!(request = ?request, reply = ?reply, error = %e, "binary MFC reply rejected");
        })
    }

    /// Read the raw value of a variable.
    pub async fn read_raw(&mut self, var: BinaryVariable) -> Result<u16> {
        let request = frame::encode_read(var.id());
        let raw = self.exchange(&request, frame::READ, var.width()).await?;
        debug!(var = %var, id = var.id(), raw, "read");
        Ok(raw)
    }

    /// Read a variable in engineering units.
    pub async fn read_var(&mut self, var: BinaryVariable) -> Result<Value> {
        let raw = self.read_raw(var).await?;
        variables::decode_value(var, raw)
    }

    /// Validate and write a variable.
    pub async fn write_var(&mut self, var: BinaryVariable, value: Value) -> Result<()> {
        let raw = variables::encode_value(var, &value)?;
        let width = var.width();
        let request = match width {
            Width::Byte => {
                let byte = u8::try_from(raw).map_err(|_| {
                    Error::InvalidValue(format!("{var} raw value {raw} does not fit one byte"))
                })?;
                frame::encode_write8(var.id(), byte)
            }
            Width::Word => frame::encode_write16(var.id(), raw),
        };

        let echoed = self.exchange(&request, width.write_code(), width).await?;
        if echoed != raw {
            return Err(Error::Protocol(format!(
                "{var} write echoed {echoed}, expected {raw}"
            )));
        }
        debug!(var = %var, id = var.id(), %value, raw, "wrote");
        Ok(())
    }

    /// Measured flow, percent of full scale.
    pub async fn flow(&mut self) -> Result<f64> {
        let raw = self.read_raw(BinaryVariable::Flow).await?;
        Ok(variables::percent_from_raw(raw))
    }

    /// Gas temperature, degrees Celsius.
    pub async fn temperature(&mut self) -> Result<f64> {
        let raw = self.read_raw(BinaryVariable::Temperature).await?;
        Ok(variables::temperature_from_raw(raw))
    }

    /// Flow setpoint, percent of full scale.
    pub async fn setpoint(&mut self) -> Result<f64> {
        let raw = self.read_raw(BinaryVariable::Setpoint).await?;
        Ok(variables::percent_from_raw(raw))
    }

    /// Set the flow setpoint, percent of full scale.
    pub async fn set_setpoint(&mut self, percent: f64) -> Result<()> {
        self.write_var(BinaryVariable::Setpoint, Value::Number(percent))
            .await
    }

    /// Selected gas.
    pub async fn gas_type(&mut self) -> Result<String> {
        let value = self.read_var(BinaryVariable::GasType).await?;
        Ok(value.expect_label("gas_type")?.to_string())
    }

    /// Select the gas; see [`OptionTable::GasType`](crate::variables::OptionTable::GasType).
    pub async fn set_gas_type(&mut self, gas: &str) -> Result<()> {
        self.write_var(BinaryVariable::GasType, Value::from(gas)).await
    }

    /// Valve mode.
    pub async fn valve_mode(&mut self) -> Result<String> {
        let value = self.read_var(BinaryVariable::ValveMode).await?;
        Ok(value.expect_label("valve_mode")?.to_string())
    }

    /// Force the valve (`Normal`, `Closed`, `Open`).
    pub async fn set_valve_mode(&mut self, mode: &str) -> Result<()> {
        self.write_var(BinaryVariable::ValveMode, Value::from(mode)).await
    }
}

#[async_trait]
impl Instrument for BinaryMfc {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        let var: BinaryVariable = name.parse()?;
        self.read_var(var).await
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let var: BinaryVariable = name.parse()?;
        self.write_var(var, value).await
    }

    /// Flow as `primary`, gas temperature as `secondary`.
    async fn get_measurement(&mut self) -> Result<Measurement> {
        let flow = self.flow().await?;
        let temperature = self.temperature().await?;
        Ok(Measurement::now(flow, Some(temperature)))
    }

    async fn close(&mut self) -> Result<()> {
        self.link.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::error::Rejection;
    use benchlink_core::types::Fault;
    use benchlink_test_harness::{MockTransport, SentLog};
    use std::time::Duration;

    fn with_ck(body: &[u8]) -> Vec<u8> {
        let mut f = body.to_vec();
        f.push(frame::checksum(body));
        f
    }

    fn mfc(mock: MockTransport) -> (BinaryMfc, SentLog) {
        let log = mock.sent_log();
        let link = Link::new(Box::new(mock), Duration::from_millis(100));
        (BinaryMfc::new(link, "test"), log)
    }

    #[tokio::test]
    async fn write_gas_type_sends_checksummed_frame() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x64, 0x06, 0x03, 0x6D], &with_ck(&[0x64, 0x03]));
        let (mut dev, log) = mfc(mock);

        dev.set_gas_type("CO2").await.unwrap();
        assert_eq!(log.entries(), vec![vec![0x64, 0x06, 0x03, 0x6D]]);
    }

    #[tokio::test]
    async fn error_reply_surfaces_fault_set() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_read(0x00), &[frame::ERROR_CODE, 0x03, 0xF1]);
        let (mut dev, _log) = mfc(mock);

        match dev.flow().await {
            Err(Error::DeviceRejected(Rejection::Faults(faults))) => {
                assert!(faults.contains(Fault::ChecksumError));
                assert_eq!(faults.len(), 1);
            }
            other => panic!("expected fault rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_reply_is_never_decoded() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_read(0x01), &[0x60, 0x13, 0x88, 0x00]);
        let (mut dev, _log) = mfc(mock);
        assert!(matches!(
            dev.setpoint().await,
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn setpoint_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_write16(0x01, 5_000), &with_ck(&[0x66, 0x13, 0x88]));
        mock.expect(&frame::encode_read(0x01), &with_ck(&[0x60, 0x13, 0x88]));
        let (mut dev, _log) = mfc(mock);

        dev.set_setpoint(0.5).await.unwrap();
        assert_eq!(dev.setpoint().await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn mismatched_echo_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_write8(0x04, 2), &with_ck(&[0x64, 0x01]));
        let (mut dev, _log) = mfc(mock);
        assert!(matches!(
            dev.set_valve_mode("Open").await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn validation_never_touches_the_wire() {
        let (mut dev, log) = mfc(MockTransport::new());
        assert!(matches!(
            dev.set_setpoint(10.0).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            dev.set_gas_type("Xe").await,
            Err(Error::UnknownEnumValue { .. })
        ));
        assert!(matches!(
            dev.write("flow", Value::Number(1.0)).await,
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            dev.read("pressure").await,
            Err(Error::UnknownParameter(_))
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn measurement_is_flow_and_temperature() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_read(0x00), &with_ck(&[0x60, 0x27, 0x10]));
        mock.expect(&frame::encode_read(0x02), &with_ck(&[0x60, 0x00, 0x00]));
        let (mut dev, _log) = mfc(mock);

        let m = dev.get_measurement().await.unwrap();
        assert_eq!(m.primary, 1.0);
        assert!((m.secondary.unwrap() - 100.0 / 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn timeout_is_reported_without_retry() {
        let mut mock = MockTransport::new();
        mock.expect_timeout(&frame::encode_read(0x06), &[0x60]);
        let (mut dev, log) = mfc(mock);

        assert!(matches!(dev.gas_type().await, Err(Error::Timeout)));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn status_reads_raw() {
        let mut mock = MockTransport::new();
        mock.expect(&frame::encode_read(0x07), &with_ck(&[0x60, 0x81]));
        let (mut dev, _log) = mfc(mock);
        assert_eq!(dev.read("status").await.unwrap(), Value::Number(129.0));
    }
}
