//! Decimal scaling between wire integers and engineering units.
//!
//! Instruments transmit numbers as integers with an implied power-of-ten
//! multiplier. Some multipliers are fixed by the device (e.g. x1000 for a gas
//! factor, x10 for a thermocouple reading); others follow a configurable
//! decimal-point setting. The functions here take the multiplier as an
//! explicit argument so every call site shows which scale it encodes with.

use std::fmt;

use crate::error::{Error, Result};

/// Number of fractional digits shown by a device with a configurable
/// decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecimalPoint {
    /// `xxx.` -- no fractional digits.
    #[default]
    Zero,
    /// `xx.x` -- one fractional digit.
    One,
    /// `x.xx` -- two fractional digits.
    Two,
    /// `.xxx` -- three fractional digits.
    Three,
}

impl DecimalPoint {
    /// Build from a fractional digit count (`0..=3`).
    pub fn from_digits(digits: u8) -> Result<Self> {
        match digits {
            0 => Ok(DecimalPoint::Zero),
            1 => Ok(DecimalPoint::One),
            2 => Ok(DecimalPoint::Two),
            3 => Ok(DecimalPoint::Three),
            _ => Err(Error::ValueOutOfRange {
                name: "decimal point".into(),
                value: digits as f64,
                min: 0.0,
                max: 3.0,
            }),
        }
    }

    /// Fractional digit count.
    pub fn digits(self) -> u8 {
        self as u8
    }

    /// Multiplier applied when encoding (`10^digits`).
    pub fn multiplier(self) -> f64 {
        10f64.powi(self.digits() as i32)
    }
}

impl fmt::Display for DecimalPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecimalPoint::Zero => "xxx.",
            DecimalPoint::One => "xx.x",
            DecimalPoint::Two => "x.xx",
            DecimalPoint::Three => ".xxx",
        };
        write!(f, "{s}")
    }
}

/// Inclusive numeric envelope of a parameter, in engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl Envelope {
    /// The `±999.999` envelope most controller datasheets document.
    pub const STANDARD: Envelope = Envelope::new(-999.999, 999.999);

    /// Create an envelope.
    pub const fn new(min: f64, max: f64) -> Self {
        Envelope { min, max }
    }

    /// Whether `value` lies inside the envelope.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Return `value` unchanged, or `ValueOutOfRange` naming `name`.
    ///
    /// NaN is always out of range.
    pub fn check(&self, name: &str, value: f64) -> Result<f64> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(Error::ValueOutOfRange {
                name: name.to_string(),
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Clamp `value` into the envelope.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Encode an engineering value as a wire integer.
///
/// Validates against `envelope`, multiplies by `multiplier`, and rounds to
/// the nearest integer (so `12.345 * 1000` is `12345`, not `12344`).
pub fn encode_scaled(name: &str, value: f64, multiplier: f64, envelope: Envelope) -> Result<i64> {
    let value = envelope.check(name, value)?;
    Ok((value * multiplier).round() as i64)
}

/// Decode a wire integer into an engineering value. Exact inverse of
/// [`encode_scaled`] up to the scale's precision.
pub fn decode_scaled(raw: i64, multiplier: f64) -> f64 {
    raw as f64 / multiplier
}
