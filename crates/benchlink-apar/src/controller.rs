//! `Ar6x2` -- APAR AR6X2 temperature controller facade.
//!
//! The controller caches its setpoint range and held setpoint. Setpoint
//! writes are clamped into the cached range; changing the range re-clamps
//! the held setpoint in the same operation and returns the setpoint that is
//! actually in effect.

use async_trait::async_trait;
use tracing::debug;

use benchlink_core::error::{Error, Result};
use benchlink_core::instrument::Instrument;
use benchlink_core::register::RegisterBus;
use benchlink_core::types::{InstrumentInfo, Measurement, Protocol, Value};

use crate::registers::{
    self, AparParam, ControlMode, GRADIENT_ENVELOPE, HOLD_TIME_ENVELOPE, HYSTERESIS_ENVELOPE,
    RANGE_ENVELOPE, decode_tenths, encode_tenths,
};

/// One step of the ramp program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStep {
    /// Target temperature, °C. Clamped into the setpoint range.
    pub setpoint: f64,
    /// Hold time at the target, minutes. Clamped into `0..=360`.
    pub hold_minutes: f64,
    /// Hysteresis, °C (`0..=999.9`).
    pub hysteresis: f64,
}

/// An APAR AR6X2 temperature controller.
pub struct Ar6x2 {
    bus: Box<dyn RegisterBus>,
    low: f64,
    high: f64,
    setpoint: f64,
    info: InstrumentInfo,
}

impl Ar6x2 {
    /// Attach to a controller and read its range and setpoint.
    pub async fn open(mut bus: Box<dyn RegisterBus>) -> Result<Self> {
        let low = decode_tenths(bus.read_register(registers::RANGE_LOW).await?);
        let high = decode_tenths(bus.read_register(registers::RANGE_HIGH).await?);
        check_range(low, high)?;
        let setpoint = decode_tenths(bus.read_register(registers::SETPOINT_1).await?);
        debug!(low, high, setpoint, "opened AR6X2");
        Ok(Ar6x2 {
            bus,
            low,
            high,
            setpoint,
            info: InstrumentInfo {
                manufacturer: "APAR",
                model: "AR6X2".into(),
                protocol: Protocol::Register,
            },
        })
    }

    async fn put(&mut self, register: u16, raw: u16) -> Result<()> {
        self.bus.write_register(register, raw).await?;
        debug!(register, raw, "register written");
        Ok(())
    }

    async fn read_tenths(&mut self, register: u16) -> Result<f64> {
        Ok(decode_tenths(self.bus.read_register(register).await?))
    }

    /// Measured temperature, °C.
    pub async fn temperature(&mut self) -> Result<f64> {
        self.read_tenths(registers::PROCESS_VALUE).await
    }

    /// Cached setpoint range `(low, high)`.
    pub fn range(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Cached held setpoint.
    pub fn cached_setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Read the setpoint from the controller and refresh the cache.
    pub async fn setpoint(&mut self) -> Result<f64> {
        self.setpoint = self.read_tenths(registers::SETPOINT_1).await?;
        Ok(self.setpoint)
    }

    /// Write the setpoint, clamped into the current range. Returns the
    /// effective setpoint.
    pub async fn set_setpoint(&mut self, value: f64) -> Result<f64> {
        if value.is_nan() {
            return Err(Error::InvalidValue("setpoint is NaN".into()));
        }
        let effective = value.clamp(self.low, self.high);
        let raw = encode_tenths("setpoint", effective, RANGE_ENVELOPE)?;
        self.put(registers::SETPOINT_1, raw).await?;
        self.setpoint = effective;
        debug!(requested = value, effective, "setpoint");
        Ok(effective)
    }

    /// Set both range bounds, re-clamping the held setpoint.
    ///
    /// Fails with [`Error::ValueOutOfRange`] before any write when
    /// `low > high` or a bound lies outside `-199.9..=1800.0`. The setpoint
    /// register is rewritten only if clamping changed it. Returns the
    /// effective setpoint.
    pub async fn set_range(&mut self, low: f64, high: f64) -> Result<f64> {
        let low_raw = encode_tenths("range_low", low, RANGE_ENVELOPE)?;
        let high_raw = encode_tenths("range_high", high, RANGE_ENVELOPE)?;
        if low > high {
            return Err(Error::ValueOutOfRange {
                name: "range_low".into(),
                value: low,
                min: RANGE_ENVELOPE.min,
                max: high,
            });
        }

        if low != self.low {
            self.put(registers::RANGE_LOW, low_raw).await?;
            self.low = low;
        }
        if high != self.high {
            self.put(registers::RANGE_HIGH, high_raw).await?;
            self.high = high;
        }

        let clamped = self.setpoint.clamp(low, high);
        if clamped != self.setpoint {
            let raw = encode_tenths("setpoint", clamped, RANGE_ENVELOPE)?;
            self.put(registers::SETPOINT_1, raw).await?;
            debug!(from = self.setpoint, to = clamped, "setpoint re-clamped to range");
            self.setpoint = clamped;
        }
        Ok(self.setpoint)
    }

    /// Set the lower range bound. See [`set_range`](Self::set_range).
    pub async fn set_range_low(&mut self, low: f64) -> Result<f64> {
        let high = self.high;
        self.set_range(low, high).await
    }

    /// Set the upper range bound. See [`set_range`](Self::set_range).
    pub async fn set_range_high(&mut self, high: f64) -> Result<f64> {
        let low = self.low;
        self.set_range(low, high).await
    }

    /// Write the ramp gradient, clamped into `1.0..=30.0` °C/min. Returns
    /// the effective gradient.
    pub async fn set_ramp_gradient(&mut self, gradient: f64) -> Result<f64> {
        let effective = GRADIENT_ENVELOPE.clamp(gradient);
        let raw = encode_tenths("ramp_gradient", effective, GRADIENT_ENVELOPE)?;
        self.put(registers::RAMP_GRADIENT, raw).await?;
        Ok(effective)
    }

    /// Write the first-step hold time, clamped into `0..=360` minutes.
    /// Returns the effective hold time.
    pub async fn set_ramp_hold_time(&mut self, minutes: f64) -> Result<f64> {
        let effective = HOLD_TIME_ENVELOPE.clamp(minutes);
        let raw = encode_tenths("ramp_hold_time", effective, HOLD_TIME_ENVELOPE)?;
        self.put(registers::HOLD_TIME_1, raw).await?;
        Ok(effective)
    }

    /// Write the first-step hysteresis (`0..=999.9`).
    pub async fn set_hysteresis(&mut self, hysteresis: f64) -> Result<()> {
        let raw = encode_tenths("hysteresis", hysteresis, HYSTERESIS_ENVELOPE)?;
        self.put(registers::HYSTERESIS_1, raw).await
    }

    /// Program the two-step ramp: gradient, then setpoint, hold time and
    /// hysteresis of each step.
    ///
    /// Everything is validated before the first write. Step setpoints are
    /// clamped into the range, the gradient and hold times into their
    /// envelopes. The first step's setpoint becomes the held setpoint.
    pub async fn set_ramp_parameters(&mut self, gradient: f64, steps: [RampStep; 2]) -> Result<()> {
        let gradient = GRADIENT_ENVELOPE.clamp(gradient);
        let mut plan = vec![(
            registers::RAMP_GRADIENT,
            encode_tenths("ramp_gradient", gradient, GRADIENT_ENVELOPE)?,
        )];
        let step_registers = [
            (registers::SETPOINT_1, registers::HOLD_TIME_1, registers::HYSTERESIS_1),
            (registers::SETPOINT_2, registers::HOLD_TIME_2, registers::HYSTERESIS_2),
        ];
        for (step, (sp_reg, hold_reg, hyst_reg)) in steps.iter().zip(step_registers) {
            if step.setpoint.is_nan() {
                return Err(Error::InvalidValue("ramp step setpoint is NaN".into()));
            }
            let setpoint = step.setpoint.clamp(self.low, self.high);
            let hold = HOLD_TIME_ENVELOPE.clamp(step.hold_minutes);
            plan.push((sp_reg, encode_tenths("setpoint", setpoint, RANGE_ENVELOPE)?));
            plan.push((hold_reg, encode_tenths("ramp_hold_time", hold, HOLD_TIME_ENVELOPE)?));
            plan.push((
                hyst_reg,
                encode_tenths("hysteresis", step.hysteresis, HYSTERESIS_ENVELOPE)?,
            ));
        }

        for (register, raw) in plan {
            self.put(register, raw).await?;
            if register == registers::SETPOINT_1 {
                self.setpoint = decode_tenths(raw);
            }
        }
        Ok(())
    }

    /// Current output/ramp state.
    pub async fn control_mode(&mut self) -> Result<ControlMode> {
        let output = self.bus.read_register(registers::OUTPUT_MODE).await?;
        let ramp = self.bus.read_register(registers::RAMP_MODE).await?;
        ControlMode::from_registers(output, ramp)
    }

    /// Switch output/ramp state.
    pub async fn set_control_mode(&mut self, mode: ControlMode) -> Result<()> {
        for (register, raw) in mode.writes() {
            self.put(register, raw).await?;
        }
        debug!(%mode, "control mode");
        Ok(())
    }

    /// Re-read the range bounds from the controller and refresh the cache.
    ///
    /// An inverted range leaves the cache untouched.
    pub async fn read_range(&mut self) -> Result<(f64, f64)> {
        let low = self.read_tenths(registers::RANGE_LOW).await?;
        let high = self.read_tenths(registers::RANGE_HIGH).await?;
        check_range(low, high)?;
        self.low = low;
        self.high = high;
        Ok((low, high))
    }
}

/// Every clamp into the cached range relies on `low <= high`.
fn check_range(low: f64, high: f64) -> Result<()> {
    if low > high {
        return Err(Error::Protocol(format!(
            "controller reports inverted setpoint range {low}..{high}"
        )));
    }
    Ok(())
}

#[async_trait]
impl Instrument for Ar6x2 {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        let param: AparParam = name.parse()?;
        let value = match param {
            AparParam::Temperature => Value::Number(self.temperature().await?),
            AparParam::Setpoint => Value::Number(self.setpoint().await?),
            AparParam::RangeLow => Value::Number(self.read_range().await?.0),
            AparParam::RangeHigh => Value::Number(self.read_range().await?.1),
            AparParam::Hysteresis => {
                Value::Number(self.read_tenths(registers::HYSTERESIS_1).await?)
            }
            AparParam::RampGradient => {
                Value::Number(self.read_tenths(registers::RAMP_GRADIENT).await?)
            }
            AparParam::RampHoldTime => {
                Value::Number(self.read_tenths(registers::HOLD_TIME_1).await?)
            }
            AparParam::ControlMode => Value::Label(self.control_mode().await?.to_string()),
        };
        Ok(value)
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let param: AparParam = name.parse()?;
        match param {
            AparParam::Temperature => Err(Error::ReadOnly(param.name().into())),
            AparParam::Setpoint => {
                self.set_setpoint(value.expect_number(param.name())?).await?;
                Ok(())
            }
            AparParam::RangeLow => {
                self.set_range_low(value.expect_number(param.name())?).await?;
                Ok(())
            }
            AparParam::RangeHigh => {
                self.set_range_high(value.expect_number(param.name())?).await?;
                Ok(())
            }
            AparParam::Hysteresis => {
                self.set_hysteresis(value.expect_number(param.name())?).await
            }
            AparParam::RampGradient => {
                self.set_ramp_gradient(value.expect_number(param.name())?).await?;
                Ok(())
            }
            AparParam::RampHoldTime => {
                self.set_ramp_hold_time(value.expect_number(param.name())?).await?;
                Ok(())
            }
            AparParam::ControlMode => {
                let mode: ControlMode = value.expect_label(param.name())?.parse()?;
                self.set_control_mode(mode).await
            }
        }
    }

    /// Measured temperature as `primary`, held setpoint as `secondary`.
    async fn get_measurement(&mut self) -> Result<Measurement> {
        let temperature = self.temperature().await?;
        Ok(Measurement::now(temperature, Some(self.setpoint)))
    }

    async fn close(&mut self) -> Result<()> {
        self.bus.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::error::Rejection;
    use benchlink_test_harness::{MockRegisterBus, RegisterAccess};

    /// Range 0.0..=100.0, setpoint 50.0.
    async fn controller() -> (Ar6x2, MockRegisterBus) {
        let handle = MockRegisterBus::new();
        handle.set(registers::RANGE_LOW, 0);
        handle.set(registers::RANGE_HIGH, 1000);
        handle.set(registers::SETPOINT_1, 500);
        let dev = Ar6x2::open(Box::new(handle.clone())).await.unwrap();
        handle.clear_log();
        (dev, handle)
    }

    #[tokio::test]
    async fn open_seeds_cache() {
        let (dev, _handle) = controller().await;
        assert_eq!(dev.range(), (0.0, 100.0));
        assert_eq!(dev.cached_setpoint(), 50.0);
    }

    #[tokio::test]
    async fn inverted_range_fails_open() {
        let handle = MockRegisterBus::new();
        handle.set(registers::RANGE_LOW, 500);
        handle.set(registers::RANGE_HIGH, 100);
        let result = Ar6x2::open(Box::new(handle.clone())).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert!(handle.writes().is_empty());
    }

    #[tokio::test]
    async fn inverted_range_on_refresh_keeps_cache() {
        let (mut dev, handle) = controller().await;
        handle.set(registers::RANGE_LOW, 900);
        handle.set(registers::RANGE_HIGH, 200);
        assert!(matches!(dev.read_range().await, Err(Error::Protocol(_))));
        assert_eq!(dev.range(), (0.0, 100.0));
        assert_eq!(dev.set_setpoint(150.0).await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn temperature_is_signed_tenths() {
        let (mut dev, handle) = controller().await;
        handle.set_signed(registers::PROCESS_VALUE, -123);
        assert_eq!(dev.temperature().await.unwrap(), -12.3);
    }

    #[tokio::test]
    async fn setpoint_is_clamped_into_range() {
        let (mut dev, handle) = controller().await;
        assert_eq!(dev.set_setpoint(150.0).await.unwrap(), 100.0);
        assert_eq!(handle.get(registers::SETPOINT_1), 1000);
        assert_eq!(dev.set_setpoint(-5.0).await.unwrap(), 0.0);
        assert_eq!(dev.set_setpoint(42.5).await.unwrap(), 42.5);
        assert_eq!(handle.get(registers::SETPOINT_1), 425);
    }

    #[tokio::test]
    async fn raising_low_below_setpoint_leaves_it_alone() {
        let (mut dev, handle) = controller().await;
        assert_eq!(dev.set_range_low(30.0).await.unwrap(), 50.0);
        assert_eq!(handle.writes(), vec![(registers::RANGE_LOW, 300)]);
    }

    #[tokio::test]
    async fn raising_low_above_setpoint_drags_it_up() {
        let (mut dev, handle) = controller().await;
        assert_eq!(dev.set_range_low(60.0).await.unwrap(), 60.0);
        assert_eq!(
            handle.writes(),
            vec![(registers::RANGE_LOW, 600), (registers::SETPOINT_1, 600)]
        );
        assert_eq!(dev.cached_setpoint(), 60.0);
    }

    #[tokio::test]
    async fn lowering_high_below_setpoint_clamps_it() {
        let (mut dev, handle) = controller().await;
        assert_eq!(dev.set_range_high(40.0).await.unwrap(), 40.0);
        assert_eq!(
            handle.writes(),
            vec![(registers::RANGE_HIGH, 400), (registers::SETPOINT_1, 400)]
        );
    }

    #[tokio::test]
    async fn inverted_range_writes_nothing() {
        let (mut dev, handle) = controller().await;
        assert!(matches!(
            dev.set_range(80.0, 20.0).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            dev.set_range_high(1900.0).await,
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(handle.log().is_empty());
        assert_eq!(dev.range(), (0.0, 100.0));
    }

    #[tokio::test]
    async fn gradient_and_hold_are_clamped() {
        let (mut dev, handle) = controller().await;
        assert_eq!(dev.set_ramp_gradient(45.0).await.unwrap(), 30.0);
        assert_eq!(handle.get(registers::RAMP_GRADIENT), 300);
        assert_eq!(dev.set_ramp_gradient(0.2).await.unwrap(), 1.0);
        assert_eq!(handle.get(registers::RAMP_GRADIENT), 10);
        assert_eq!(dev.set_ramp_hold_time(400.0).await.unwrap(), 360.0);
        assert_eq!(handle.get(registers::HOLD_TIME_1), 3600);
    }

    #[tokio::test]
    async fn ramp_program_writes_in_order() {
        let (mut dev, handle) = controller().await;
        let steps = [
            RampStep {
                setpoint: 80.0,
                hold_minutes: 10.0,
                hysteresis: 1.5,
            },
            RampStep {
                setpoint: 120.0,
                hold_minutes: 5.0,
                hysteresis: 2.0,
            },
        ];
        dev.set_ramp_parameters(5.0, steps).await.unwrap();
        assert_eq!(
            handle.writes(),
            vec![
                (registers::RAMP_GRADIENT, 50),
                (registers::SETPOINT_1, 800),
                (registers::HOLD_TIME_1, 100),
                (registers::HYSTERESIS_1, 15),
                (registers::SETPOINT_2, 1000),
                (registers::HOLD_TIME_2, 50),
                (registers::HYSTERESIS_2, 20),
            ]
        );
        assert_eq!(dev.cached_setpoint(), 80.0);
    }

    #[tokio::test]
    async fn invalid_ramp_program_writes_nothing() {
        let (mut dev, handle) = controller().await;
        let step = RampStep {
            setpoint: 20.0,
            hold_minutes: 1.0,
            hysteresis: 1000.0,
        };
        assert!(dev.set_ramp_parameters(5.0, [step, step]).await.is_err());
        assert!(handle.log().is_empty());
    }

    #[tokio::test]
    async fn control_mode_round_trip() {
        let (mut dev, handle) = controller().await;
        dev.set_control_mode(ControlMode::Ramping).await.unwrap();
        assert_eq!(
            handle.log(),
            vec![
                RegisterAccess::Write(registers::OUTPUT_MODE, 2),
                RegisterAccess::Write(registers::RAMP_MODE, 2),
            ]
        );
        assert_eq!(dev.control_mode().await.unwrap(), ControlMode::Ramping);
        dev.set_control_mode(ControlMode::Off).await.unwrap();
        assert_eq!(dev.control_mode().await.unwrap(), ControlMode::Off);
    }

    #[tokio::test]
    async fn rejected_setpoint_keeps_cache() {
        let (mut dev, handle) = controller().await;
        handle.reject_writes_to(registers::SETPOINT_1);
        assert!(matches!(
            dev.set_setpoint(70.0).await,
            Err(Error::DeviceRejected(Rejection::Exception(0x04)))
        ));
        assert_eq!(dev.cached_setpoint(), 50.0);
    }

    #[tokio::test]
    async fn instrument_surface() {
        let (mut dev, handle) = controller().await;
        handle.set(registers::PROCESS_VALUE, 235);
        assert_eq!(dev.read("temperature").await.unwrap(), Value::Number(23.5));
        dev.write("control_mode", Value::from("Heating")).await.unwrap();
        assert_eq!(dev.read("control_mode").await.unwrap(), Value::from("Heating"));
        assert!(matches!(
            dev.write("temperature", Value::Number(1.0)).await,
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(
            dev.write("control_mode", Value::from("Cooling")).await,
            Err(Error::UnknownEnumValue { .. })
        ));
        let m = dev.get_measurement().await.unwrap();
        assert_eq!(m.primary, 23.5);
        assert_eq!(m.secondary, Some(50.0));

        dev.close().await.unwrap();
        assert!(handle.is_closed());
    }
}
