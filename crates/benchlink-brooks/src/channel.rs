//! `BrooksChannel` -- one mass-flow controller channel of a Brooks 0254.
//!
//! A channel owns its own decimal-point cache and network address, while the
//! [`Link`] underneath may be shared with the other channels of the same
//! unit (or other units on the same RS-485 bus). Every numeric encode and
//! decode threads the cached [`DecimalPoint`] explicitly, and the cache only
//! changes when the unit has confirmed a decimal-point read or write.

use async_trait::async_trait;
use tracing::debug;

use benchlink_core::error::Result;
use benchlink_core::instrument::Instrument;
use benchlink_core::link::Link;
use benchlink_core::scaling::DecimalPoint;
use benchlink_core::types::{Channel, InstrumentInfo, Measurement, Protocol, Value};

use crate::params::{self, BrooksParam, EnumTable};
use crate::protocol::{self, Op};
use crate::transceive::transceive;

/// Manufacturer string reported in [`InstrumentInfo`].
pub const MANUFACTURER: &str = "Brooks Instrument";

/// One channel of a Brooks 0254 secondary electronics unit.
pub struct BrooksChannel {
    link: Link,
    channel: Channel,
    address: Option<u32>,
    scale: DecimalPoint,
    info: InstrumentInfo,
}

impl BrooksChannel {
    /// Attach to `channel` over `link` and read its decimal point to seed
    /// the scale.
    pub async fn open(link: Link, channel: Channel, address: Option<u32>) -> Result<Self> {
        let address = address.map(protocol::check_address).transpose()?;
        let mut this = BrooksChannel {
            link,
            channel,
            address,
            scale: DecimalPoint::Zero,
            info: InstrumentInfo {
                manufacturer: MANUFACTURER,
                model: format!("0254 {channel}"),
                protocol: Protocol::AsciiMultidrop,
            },
        };
        let scale = this.read_decimal_point().await?;
        debug!(channel = channel.number(), ?address, %scale, "opened 0254 channel");
        Ok(this)
    }

    /// Channel number and derived ports.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Network address used in commands, if any.
    pub fn address(&self) -> Option<u32> {
        self.address
    }

    /// Change the network address used for subsequent commands.
    ///
    /// This only changes how this facade addresses the unit; it writes
    /// nothing to the device.
    pub fn set_address(&mut self, address: Option<u32>) -> Result<()> {
        self.address = address.map(protocol::check_address).transpose()?;
        Ok(())
    }

    /// Cached decimal point, used for every scaled value.
    pub fn decimal_point(&self) -> DecimalPoint {
        self.scale
    }

    fn port(&self, param: BrooksParam) -> u8 {
        param.spec().domain.port(self.channel)
    }

    /// Read one parameter.
    ///
    /// Reading [`BrooksParam::DecimalPoint`] also refreshes the cached scale.
    pub async fn read_param(&mut self, param: BrooksParam) -> Result<Value> {
        let spec = param.spec();
        let port = self.port(param);
        let request = protocol::encode_command(self.address, port, spec.code, Op::Read);
        let response = transceive(&self.link, &request).await?;
        let value = params::decode_value(param, response.payload(), self.scale)?;

        if param == BrooksParam::DecimalPoint {
            if let Value::Label(label) = &value {
                self.scale = params::decimal_point_from_label(label)?;
            }
        }

        debug!(channel = self.channel.number(), port, code = spec.code, %value, "read {param}");
        Ok(value)
    }

    /// Write one parameter.
    ///
    /// The value is validated and encoded with the current scale before
    /// anything is sent. Writing [`BrooksParam::DecimalPoint`] updates the
    /// cached scale only once the unit has accepted the write.
    pub async fn write_param(&mut self, param: BrooksParam, value: Value) -> Result<()> {
        let spec = param.spec();
        let port = self.port(param);
        let wire = params::encode_value(param, &value, self.scale)?;
        let new_scale = match param {
            BrooksParam::DecimalPoint => Some(params::decimal_point_from_label(
                value.expect_label(spec.name)?,
            )?),
            _ => None,
        };

        let request = protocol::encode_command(self.address, port, spec.code, Op::Write(&wire));
        transceive(&self.link, &request).await?;

        if let Some(scale) = new_scale {
            self.scale = scale;
        }
        debug!(channel = self.channel.number(), port, code = spec.code, %value, wire = %wire, "wrote {param}");
        Ok(())
    }

    /// Read the decimal point from the unit and cache it.
    pub async fn read_decimal_point(&mut self) -> Result<DecimalPoint> {
        self.read_param(BrooksParam::DecimalPoint).await?;
        Ok(self.scale)
    }

    /// Write the decimal point. On rejection the previous scale stays in
    /// effect.
    pub async fn set_decimal_point(&mut self, point: DecimalPoint) -> Result<()> {
        self.write_param(BrooksParam::DecimalPoint, Value::Label(point.to_string()))
            .await
    }

    /// Gather the current flow and the totalizer.
    ///
    /// `primary` is the current value, `secondary` the total.
    pub async fn measure(&mut self) -> Result<Measurement> {
        let request = protocol::encode_measure(self.address, self.channel.input_port());
        let response = transceive(&self.link, &request).await?;
        let multiplier = self.scale.multiplier();
        let total = params::parse_number("total", response.payload(), multiplier)?;
        let current = params::parse_number("current", response.secondary()?, multiplier)?;
        debug!(channel = self.channel.number(), current, total, "measurement");
        Ok(Measurement::now(current, Some(total)))
    }

    async fn number(&mut self, param: BrooksParam) -> Result<f64> {
        self.read_param(param).await?.expect_number(param.name())
    }

    async fn label(&mut self, param: BrooksParam) -> Result<String> {
        Ok(self
            .read_param(param)
            .await?
            .expect_label(param.name())?
            .to_string())
    }

    /// Rate setpoint in engineering units.
    pub async fn setpoint(&mut self) -> Result<f64> {
        self.number(BrooksParam::Setpoint).await
    }

    /// Set the rate setpoint (`-999.999..=999.999`).
    pub async fn set_setpoint(&mut self, value: f64) -> Result<()> {
        self.write_param(BrooksParam::Setpoint, Value::Number(value)).await
    }

    /// Valve override state (`Normal`, `Closed`, `Open`).
    pub async fn valve_override(&mut self) -> Result<String> {
        self.label(BrooksParam::ValveOverride).await
    }

    /// Force the valve state.
    pub async fn set_valve_override(&mut self, state: &str) -> Result<()> {
        self.write_param(BrooksParam::ValveOverride, Value::from(state)).await
    }

    /// Gas correction factor.
    pub async fn gas_factor(&mut self) -> Result<f64> {
        self.number(BrooksParam::GasFactor).await
    }

    /// Set the gas correction factor (`0..=999.999`).
    pub async fn set_gas_factor(&mut self, factor: f64) -> Result<()> {
        self.write_param(BrooksParam::GasFactor, Value::Number(factor)).await
    }

    /// Process value full scale.
    pub async fn pv_full_scale(&mut self) -> Result<f64> {
        self.number(BrooksParam::PvFullScale).await
    }

    /// Set the process value full scale.
    pub async fn set_pv_full_scale(&mut self, value: f64) -> Result<()> {
        self.write_param(BrooksParam::PvFullScale, Value::Number(value)).await
    }

    /// Setpoint full scale.
    pub async fn sp_full_scale(&mut self) -> Result<f64> {
        self.number(BrooksParam::SpFullScale).await
    }

    /// Set the setpoint full scale.
    pub async fn set_sp_full_scale(&mut self, value: f64) -> Result<()> {
        self.write_param(BrooksParam::SpFullScale, Value::Number(value)).await
    }

    /// Input signal type.
    pub async fn pv_signal_type(&mut self) -> Result<String> {
        self.label(BrooksParam::PvSignalType).await
    }

    /// Set the input signal type; see [`EnumTable::InputSignal`] for labels.
    pub async fn set_pv_signal_type(&mut self, signal: &str) -> Result<()> {
        self.write_param(BrooksParam::PvSignalType, Value::from(signal)).await
    }

    /// Output signal type.
    pub async fn sp_signal_type(&mut self) -> Result<String> {
        self.label(BrooksParam::SpSignalType).await
    }

    /// Set the output signal type; see [`EnumTable::OutputSignal`] for labels.
    pub async fn set_sp_signal_type(&mut self, signal: &str) -> Result<()> {
        self.write_param(BrooksParam::SpSignalType, Value::from(signal)).await
    }

    /// Setpoint source.
    pub async fn setpoint_source(&mut self) -> Result<String> {
        self.label(BrooksParam::SetpointSource).await
    }

    /// Set the setpoint source.
    pub async fn set_setpoint_source(&mut self, source: &str) -> Result<()> {
        self.write_param(BrooksParam::SetpointSource, Value::from(source)).await
    }

    /// Measurement unit.
    pub async fn measurement_units(&mut self) -> Result<String> {
        self.label(BrooksParam::MeasurementUnits).await
    }

    /// Set the measurement unit; see [`EnumTable::MeasurementUnit`].
    pub async fn set_measurement_units(&mut self, unit: &str) -> Result<()> {
        self.write_param(BrooksParam::MeasurementUnits, Value::from(unit)).await
    }

    /// Rate time base.
    pub async fn time_base(&mut self) -> Result<String> {
        self.label(BrooksParam::TimeBase).await
    }

    /// Set the rate time base.
    pub async fn set_time_base(&mut self, base: &str) -> Result<()> {
        self.write_param(BrooksParam::TimeBase, Value::from(base)).await
    }

    /// Setpoint function.
    pub async fn setpoint_function(&mut self) -> Result<String> {
        self.label(BrooksParam::SetpointFunction).await
    }

    /// Set the setpoint function (`Rate`, `Batch`, `Blend`).
    pub async fn set_setpoint_function(&mut self, function: &str) -> Result<()> {
        self.write_param(BrooksParam::SetpointFunction, Value::from(function))
            .await
    }

    /// Batch quantity.
    pub async fn batch(&mut self) -> Result<f64> {
        self.number(BrooksParam::Batch).await
    }

    /// Set the batch quantity.
    pub async fn set_batch(&mut self, value: f64) -> Result<()> {
        self.write_param(BrooksParam::Batch, Value::Number(value)).await
    }

    /// Blend ratio.
    pub async fn blend(&mut self) -> Result<f64> {
        self.number(BrooksParam::Blend).await
    }

    /// Set the blend ratio (fixed three decimals).
    pub async fn set_blend(&mut self, value: f64) -> Result<()> {
        self.write_param(BrooksParam::Blend, Value::Number(value)).await
    }

    /// Labels accepted by an enumerated parameter.
    pub fn options(table: EnumTable) -> Vec<&'static str> {
        table.labels()
    }
}

#[async_trait]
impl Instrument for BrooksChannel {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        let param = params::resolve(name)?;
        self.read_param(param).await
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let param = params::resolve(name)?;
        self.write_param(param, value).await
    }

    async fn get_measurement(&mut self) -> Result<Measurement> {
        self.measure().await
    }

    /// Channels share the hub's bus, so closing one leaves the line open
    /// for its siblings. Use [`Brooks0254::close`](crate::Brooks0254::close)
    /// to release the port.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
