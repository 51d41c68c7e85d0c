//! AR6X2 register map and value encoding.
//!
//! Every register holds a signed 16-bit value in tenths of the engineering
//! unit (0.1 °C for temperatures, 0.1 °C/min for the ramp gradient, 0.1 min
//! for hold times). The register protocol carries no integrity check of its
//! own; whatever framing the [`RegisterBus`](benchlink_core::RegisterBus)
//! provides is all there is.

use std::fmt;
use std::str::FromStr;

use benchlink_core::error::{Error, Result};
use benchlink_core::scaling::{Envelope, decode_scaled, encode_scaled};

/// Measured process value (read-only).
pub const PROCESS_VALUE: u16 = 0x00;
/// Lower bound of the setpoint range.
pub const RANGE_LOW: u16 = 0x16;
/// Upper bound of the setpoint range.
pub const RANGE_HIGH: u16 = 0x17;
/// Setpoint (first ramp step setpoint).
pub const SETPOINT_1: u16 = 0x1A;
/// Hysteresis of the first step.
pub const HYSTERESIS_1: u16 = 0x1B;
/// Second ramp step setpoint.
pub const SETPOINT_2: u16 = 0x1E;
/// Hysteresis of the second step.
pub const HYSTERESIS_2: u16 = 0x1F;
/// Output mode.
pub const OUTPUT_MODE: u16 = 0x20;
/// Ramp mode.
pub const RAMP_MODE: u16 = 0x2C;
/// Ramp gradient.
pub const RAMP_GRADIENT: u16 = 0x2D;
/// Hold time of the first step.
pub const HOLD_TIME_1: u16 = 0x2E;
/// Hold time of the second step.
pub const HOLD_TIME_2: u16 = 0x2F;

/// Mode register sentinel: off.
pub const MODE_OFF: u16 = 0;
/// Mode register sentinel: heating.
pub const MODE_HEATING: u16 = 2;

/// Raw units per engineering unit.
pub const SCALE: f64 = 10.0;

/// Envelope of the range bounds, °C.
pub const RANGE_ENVELOPE: Envelope = Envelope::new(-199.9, 1800.0);
/// Envelope of the ramp gradient, °C/min. Writes are clamped into it.
pub const GRADIENT_ENVELOPE: Envelope = Envelope::new(1.0, 30.0);
/// Envelope of a ramp hold time, minutes. Writes are clamped into it.
pub const HOLD_TIME_ENVELOPE: Envelope = Envelope::new(0.0, 360.0);
/// Envelope of the hysteresis, °C.
pub const HYSTERESIS_ENVELOPE: Envelope = Envelope::new(0.0, 999.9);

/// Encode a value in tenths as a register word (two's complement).
pub fn encode_tenths(name: &str, value: f64, envelope: Envelope) -> Result<u16> {
    let raw = encode_scaled(name, value, SCALE, envelope)?;
    let word = i16::try_from(raw).map_err(|_| Error::ValueOutOfRange {
        name: name.to_string(),
        value,
        min: i16::MIN as f64 / SCALE,
        max: i16::MAX as f64 / SCALE,
    })?;
    Ok(word as u16)
}

/// Decode a register word holding a signed value in tenths.
pub fn decode_tenths(raw: u16) -> f64 {
    decode_scaled(raw as i16 as i64, SCALE)
}

/// Output and ramp state of the controller.
///
/// The two mode registers are never written independently: this type is the
/// only way to change them, so ramping with the output off cannot be
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    /// Output off, ramp off.
    Off,
    /// Output heating towards the setpoint, ramp off.
    Heating,
    /// Output heating, following the ramp program.
    Ramping,
}

impl ControlMode {
    /// All modes.
    pub const ALL: [ControlMode; 3] = [ControlMode::Off, ControlMode::Heating, ControlMode::Ramping];

    /// Register writes that establish this mode, in order.
    ///
    /// The output is switched on before the ramp is enabled and the ramp is
    /// disabled before the output is switched off.
    pub fn writes(self) -> [(u16, u16); 2] {
        match self {
            ControlMode::Off => [(RAMP_MODE, MODE_OFF), (OUTPUT_MODE, MODE_OFF)],
            ControlMode::Heating => [(OUTPUT_MODE, MODE_HEATING), (RAMP_MODE, MODE_OFF)],
            ControlMode::Ramping => [(OUTPUT_MODE, MODE_HEATING), (RAMP_MODE, MODE_HEATING)],
        }
    }

    /// Interpret the output and ramp mode registers.
    pub fn from_registers(output: u16, ramp: u16) -> Result<Self> {
        match (output, ramp) {
            (MODE_OFF, MODE_OFF) => Ok(ControlMode::Off),
            (MODE_HEATING, MODE_OFF) => Ok(ControlMode::Heating),
            (MODE_HEATING, MODE_HEATING) => Ok(ControlMode::Ramping),
            _ => Err(Error::Protocol(format!(
                "unexpected mode registers: output {output}, ramp {ramp}"
            ))),
        }
    }

    /// Label used by the symbolic parameter interface.
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Off => "Off",
            ControlMode::Heating => "Heating",
            ControlMode::Ramping => "Ramping",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ControlMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ControlMode::ALL
            .into_iter()
            .find(|m| m.label() == s)
            .ok_or_else(|| Error::UnknownEnumValue {
                table: "control mode",
                value: s.to_string(),
            })
    }
}

/// Parameters reachable by symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AparParam {
    /// Measured temperature (read-only).
    Temperature,
    /// Held setpoint.
    Setpoint,
    /// Lower range bound.
    RangeLow,
    /// Upper range bound.
    RangeHigh,
    /// First-step hysteresis.
    Hysteresis,
    /// Ramp gradient.
    RampGradient,
    /// First-step hold time.
    RampHoldTime,
    /// Output/ramp state.
    ControlMode,
}

impl AparParam {
    /// All parameters.
    pub const ALL: [AparParam; 8] = [
        AparParam::Temperature,
        AparParam::Setpoint,
        AparParam::RangeLow,
        AparParam::RangeHigh,
        AparParam::Hysteresis,
        AparParam::RampGradient,
        AparParam::RampHoldTime,
        AparParam::ControlMode,
    ];

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            AparParam::Temperature => "temperature",
            AparParam::Setpoint => "setpoint",
            AparParam::RangeLow => "range_low",
            AparParam::RangeHigh => "range_high",
            AparParam::Hysteresis => "hysteresis",
            AparParam::RampGradient => "ramp_gradient",
            AparParam::RampHoldTime => "ramp_hold_time",
            AparParam::ControlMode => "control_mode",
        }
    }
}

impl FromStr for AparParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AparParam::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}
