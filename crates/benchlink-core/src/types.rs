//! Core types used throughout benchlink.
//!
//! These types provide a protocol-agnostic view over the four instrument
//! protocols (ASCII multidrop, binary checksummed, register, I2C command).

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// A decoded parameter value.
///
/// Facades convert wire representations into one of these variants through
/// the parameter registry of their protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An engineering-unit number (already scaled).
    Number(f64),
    /// A label from a bidirectional enumeration (e.g. `"Open"`).
    Label(String),
    /// A boolean setting.
    Flag(bool),
    /// An uninterpreted ASCII token, passed through as received.
    Token(String),
}

impl Value {
    /// Return the number, if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the label, if this is a [`Value::Label`].
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(s) => Some(s),
            _ => None,
        }
    }

    /// Return the flag, if this is a [`Value::Flag`].
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the number or fail with [`Error::InvalidValue`] naming `name`.
    pub fn expect_number(&self, name: &str) -> Result<f64> {
        self.as_number()
            .ok_or_else(|| Error::InvalidValue(format!("{name} expects a number, got {self:?}")))
    }

    /// Return the label or fail with [`Error::InvalidValue`] naming `name`.
    pub fn expect_label(&self, name: &str) -> Result<&str> {
        self.as_label()
            .ok_or_else(|| Error::InvalidValue(format!("{name} expects a label, got {self:?}")))
    }

    /// Return the flag or fail with [`Error::InvalidValue`] naming `name`.
    pub fn expect_flag(&self, name: &str) -> Result<bool> {
        self.as_flag()
            .ok_or_else(|| Error::InvalidValue(format!("{name} expects a flag, got {self:?}")))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Label(s) | Value::Token(s) => write!(f, "{s}"),
            Value::Flag(b) => write!(f, "{}", if *b { "on" } else { "off" }),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Flag(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Label(s.to_string())
    }
}

/// One timestamped measurement from an instrument.
///
/// For mass-flow controllers `primary` is the current flow; `secondary`
/// carries the totalizer (ASCII family) or the gas temperature (binary
/// family). Sensors put their second physical quantity in `secondary`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Main measured quantity in engineering units.
    pub primary: f64,
    /// Optional companion quantity.
    pub secondary: Option<f64>,
    /// Host time at which the response was decoded.
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Create a measurement stamped with the current host time.
    pub fn now(primary: f64, secondary: Option<f64>) -> Self {
        Measurement {
            primary,
            secondary,
            timestamp: Utc::now(),
        }
    }
}

/// Wire protocol spoken by an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Comma-delimited ASCII commands on a shared bus.
    AsciiMultidrop,
    /// Fixed-length binary frames with a modulo-256 checksum.
    BinaryChecksum,
    /// Numbered 16-bit register access.
    Register,
    /// 16-bit I2C command words through a sensor bridge.
    I2cCommand,
    /// A newline-terminated text query answered by one line.
    TextLine,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::AsciiMultidrop => write!(f, "ASCII multidrop"),
            Protocol::BinaryChecksum => write!(f, "binary checksum"),
            Protocol::Register => write!(f, "register"),
            Protocol::I2cCommand => write!(f, "I2C command"),
            Protocol::TextLine => write!(f, "text line"),
        }
    }
}

/// Static identification of a connected instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    /// Manufacturer name.
    pub manufacturer: &'static str,
    /// Model designation (e.g. `"0254 channel 2"`, `"AR6X2"`).
    pub model: String,
    /// Wire protocol in use.
    pub protocol: Protocol,
}

/// A 1-indexed controller channel on a multi-channel instrument.
///
/// The input (process value) and output (setpoint) ports are always derived
/// from the channel number and can never be set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Highest channel number supported by the multi-channel controllers.
    pub const MAX: u8 = 4;

    /// Create a channel, validating that it lies in `1..=4`.
    pub fn new(number: u8) -> Result<Self> {
        if (1..=Self::MAX).contains(&number) {
            Ok(Channel(number))
        } else {
            Err(Error::ValueOutOfRange {
                name: "channel".into(),
                value: number as f64,
                min: 1.0,
                max: Self::MAX as f64,
            })
        }
    }

    /// Channel number (1-based).
    pub fn number(self) -> u8 {
        self.0
    }

    /// Input (process value) port: `2 * channel - 1`.
    pub fn input_port(self) -> u8 {
        2 * self.0 - 1
    }

    /// Output (setpoint) port: `2 * channel`.
    pub fn output_port(self) -> u8 {
        2 * self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// One fault condition reported by a binary-protocol instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The instrument timed out receiving the request.
    Timeout,
    /// The instrument was busy.
    Busy,
    /// The instrument computed a different request checksum.
    ChecksumError,
    /// UART receive overrun.
    Overrun,
    /// UART framing error.
    Framing,
    /// UART parity error.
    Parity,
    /// Missing or invalid start condition.
    Start,
    /// Request code not recognised.
    InvalidRequest,
    /// Variable id not recognised.
    UnknownVariable,
}

impl Fault {
    /// All faults, in reporting order.
    pub const ALL: [Fault; 9] = [
        Fault::Timeout,
        Fault::Busy,
        Fault::ChecksumError,
        Fault::Overrun,
        Fault::Framing,
        Fault::Parity,
        Fault::Start,
        Fault::InvalidRequest,
        Fault::UnknownVariable,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fault::Timeout => "timeout",
            Fault::Busy => "busy",
            Fault::ChecksumError => "checksum error",
            Fault::Overrun => "overrun",
            Fault::Framing => "framing error",
            Fault::Parity => "parity error",
            Fault::Start => "start error",
            Fault::InvalidRequest => "invalid request",
            Fault::UnknownVariable => "unknown variable",
        };
        write!(f, "{s}")
    }
}

/// Set of simultaneous [`Fault`]s.
///
/// This is a set rather than a single code: collapsing several faults into
/// one would hide information needed for diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceFaults {
    bits: u16,
}

impl DeviceFaults {
    /// The empty set.
    pub fn empty() -> Self {
        DeviceFaults::default()
    }

    /// Add a fault to the set.
    pub fn insert(&mut self, fault: Fault) {
        self.bits |= fault.bit();
    }

    /// Whether the set contains `fault`.
    pub fn contains(&self, fault: Fault) -> bool {
        self.bits & fault.bit() != 0
    }

    /// Whether no fault is present.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of faults in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate over the faults in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = Fault> + '_ {
        Fault::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<Fault> for DeviceFaults {
    fn from_iter<I: IntoIterator<Item = Fault>>(iter: I) -> Self {
        let mut set = DeviceFaults::empty();
        for fault in iter {
            set.insert(fault);
        }
        set
    }
}

impl fmt::Display for DeviceFaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for fault in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{fault}")?;
            first = false;
        }
        Ok(())
    }
}

/// Sensor bridge port a sensor is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgePort {
    /// Bridge port 1.
    One,
    /// Bridge port 2.
    Two,
}

impl fmt::Display for BridgePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgePort::One => write!(f, "Port 1"),
            BridgePort::Two => write!(f, "Port 2"),
        }
    }
}
