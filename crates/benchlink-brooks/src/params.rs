//! Brooks 0254 parameter registry.
//!
//! Every parameter the 0254 exposes is a variant of [`BrooksParam`]. A single
//! static table maps each variant to its wire code, the port domain it lives
//! on, and how its payload is encoded. Codes 0 (signal type) and 9 (full
//! scale) exist on both the input and the output port with different
//! meanings; they are separate variants here so the domain (and therefore
//! the port and the enumeration table) is never ambiguous.
//!
//! All functions are pure. Scaling is passed in explicitly by the caller.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use benchlink_core::enumeration::BiMap;
use benchlink_core::error::{Error, Result};
use benchlink_core::scaling::{DecimalPoint, Envelope, decode_scaled, encode_scaled};
use benchlink_core::types::{Channel, Value};

use crate::protocol::GLOBAL_PORT;

/// Envelope of the gas factor (fixed three decimals, non-negative).
pub const GAS_FACTOR_ENVELOPE: Envelope = Envelope::new(0.0, 999.999);

/// Which port of the unit a parameter lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Input port of the channel (`2n - 1`).
    ProcessValue,
    /// Output port of the channel (`2n`).
    Setpoint,
    /// Unit-wide settings on port 9.
    Global,
}

impl Domain {
    /// Port number for this domain on `channel`.
    pub fn port(self, channel: Channel) -> u8 {
        match self {
            Domain::ProcessValue => channel.input_port(),
            Domain::Setpoint => channel.output_port(),
            Domain::Global => GLOBAL_PORT,
        }
    }
}

/// Closed option sets of the 0254.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumTable {
    /// Valve override (Normal/Closed/Open).
    ValveOverride,
    /// Setpoint source (Keypad/Serial, Serial only).
    SetpointSource,
    /// Setpoint function (Rate/Batch/Blend).
    SetpointFunction,
    /// Input port signal type.
    InputSignal,
    /// Output port signal type.
    OutputSignal,
    /// Decimal point position.
    DecimalPoint,
    /// Engineering measurement unit.
    MeasurementUnit,
    /// Rate time base.
    TimeBase,
}

static VALVE_OVERRIDE: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "valve override",
        &[("Normal", 0), ("Closed", 1), ("Open", 2)],
    )
});

static SETPOINT_SOURCE: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new("setpoint source", &[("Keypad/Serial", 0), ("Serial only", 1)])
});

static SETPOINT_FUNCTION: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "setpoint function",
        &[("Rate", 1), ("Batch", 2), ("Blend", 3)],
    )
});

static INPUT_SIGNAL: LazyLock<BiMap<char>> = LazyLock::new(|| {
    BiMap::new(
        "input signal type",
        &[
            ("Off", '0'),
            ("0-20mA", '7'),
            ("4-20mA", '8'),
            ("0-10V", '9'),
            ("2-10V", ':'),
            ("0-5V", ';'),
            ("1-5V", '<'),
        ],
    )
});

static OUTPUT_SIGNAL: LazyLock<BiMap<char>> = LazyLock::new(|| {
    BiMap::new(
        "output signal type",
        &[
            ("Off", '0'),
            ("0-20mA", '1'),
            ("4-20mA", '2'),
            ("0-10V", '3'),
            ("2-10V", '4'),
            ("0-5V", '5'),
            ("1-5V", '6'),
        ],
    )
});

static DECIMAL_POINT: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "decimal point",
        &[("xxx.", 0), ("xx.x", 1), ("x.xx", 2), (".xxx", 3)],
    )
});

static MEASUREMENT_UNIT: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "measurement unit",
        &[
            ("ml", 0),
            ("mls", 1),
            ("mln", 2),
            ("l", 3),
            ("ls", 4),
            ("ln", 5),
            ("cm^3", 6),
            ("cm^3s", 7),
            ("cm^3n", 8),
            ("m^3", 9),
            ("m^3s", 10),
            ("m^3n", 11),
            ("g", 12),
            ("lb", 13),
            ("kg", 14),
            ("ft^3", 15),
            ("ft^3s", 16),
            ("ft^3n", 17),
            ("scc", 18),
            ("sl", 19),
            ("bar", 20),
            ("mbar", 21),
            ("psi", 22),
            ("kPa", 23),
            ("Torr", 24),
            ("atm", 25),
            ("Volt", 26),
            ("mA", 27),
            ("oC", 28),
            ("oK", 29),
            ("oR", 30),
            ("oF", 31),
            ("g/cc", 32),
            ("sg", 33),
            ("%", 34),
            ("lb/in^3", 35),
            ("lb/ft^3", 36),
            ("lb/gal", 37),
            ("kg/m^3", 38),
            ("g/ml", 39),
            ("kg/l", 40),
            ("g/l", 41),
        ],
    )
});

static TIME_BASE: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "time base",
        &[("sec", 1), ("min", 2), ("hrs", 3), ("day", 4)],
    )
});

enum Table {
    Numeric(&'static BiMap<u8>),
    /// Signal types: single-character codes, reported in the second-to-last
    /// character of the payload.
    Signal(&'static BiMap<char>),
}

impl EnumTable {
    fn table(self) -> Table {
        match self {
            EnumTable::ValveOverride => Table::Numeric(&VALVE_OVERRIDE),
            EnumTable::SetpointSource => Table::Numeric(&SETPOINT_SOURCE),
            EnumTable::SetpointFunction => Table::Numeric(&SETPOINT_FUNCTION),
            EnumTable::InputSignal => Table::Signal(&INPUT_SIGNAL),
            EnumTable::OutputSignal => Table::Signal(&OUTPUT_SIGNAL),
            EnumTable::DecimalPoint => Table::Numeric(&DECIMAL_POINT),
            EnumTable::MeasurementUnit => Table::Numeric(&MEASUREMENT_UNIT),
            EnumTable::TimeBase => Table::Numeric(&TIME_BASE),
        }
    }

    /// Human-readable table name.
    pub fn name(self) -> &'static str {
        match self.table() {
            Table::Numeric(map) => map.name(),
            Table::Signal(map) => map.name(),
        }
    }

    /// Labels in declaration order, e.g. to populate a selector.
    pub fn labels(self) -> Vec<&'static str> {
        match self.table() {
            Table::Numeric(map) => map.labels().collect(),
            Table::Signal(map) => map.labels().collect(),
        }
    }

    /// Encode `label` as the wire value string.
    pub fn encode(self, label: &str) -> Result<String> {
        match self.table() {
            Table::Numeric(map) => Ok(map.code(label)?.to_string()),
            Table::Signal(map) => Ok(map.code(label)?.to_string()),
        }
    }

    /// Decode a response payload into its label.
    pub fn decode(self, payload: &str) -> Result<&'static str> {
        let payload = payload.trim();
        match self.table() {
            Table::Numeric(map) => {
                let code = payload.parse::<u8>().map_err(|_| {
                    Error::Protocol(format!("{} payload {payload:?} is not a code", map.name()))
                })?;
                map.label(code)
            }
            Table::Signal(map) => {
                let code = payload.chars().rev().nth(1).ok_or_else(|| {
                    Error::Protocol(format!("{} payload {payload:?} is too short", map.name()))
                })?;
                map.label(code)
            }
        }
    }
}

/// How a parameter's payload is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Signed integer scaled by the unit's configured decimal point.
    Scaled,
    /// Signed integer with a fixed multiplier, independent of the decimal
    /// point.
    Fixed {
        /// Multiplier applied on encode.
        multiplier: f64,
        /// Accepted engineering-unit range.
        envelope: Envelope,
    },
    /// A code from one of the option tables.
    Enumerated(EnumTable),
    /// `1` / `0`.
    Flag,
    /// Raw ASCII token, passed through uninterpreted.
    Token,
}

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Symbolic name, as accepted by [`BrooksParam::from_str`].
    pub name: &'static str,
    /// Decimal parameter code.
    pub code: u8,
    /// Port domain.
    pub domain: Domain,
    /// Payload representation.
    pub kind: ParamKind,
    /// Whether the parameter accepts writes.
    pub writable: bool,
}

/// Every parameter of the Brooks 0254.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrooksParam {
    /// Engineering unit of the process value.
    MeasurementUnits,
    /// Time base of rate values.
    TimeBase,
    /// Decimal point position; drives scaling of all [`ParamKind::Scaled`]
    /// values.
    DecimalPoint,
    /// Gas correction factor.
    GasFactor,
    /// Input signal type (code 0 on the input port).
    PvSignalType,
    /// Input full scale (code 9 on the input port).
    PvFullScale,
    /// Output signal type (code 0 on the output port).
    SpSignalType,
    /// Output full scale (code 9 on the output port).
    SpFullScale,
    /// Setpoint function (rate, batch, blend).
    SetpointFunction,
    /// Rate setpoint.
    Setpoint,
    /// Valve override.
    ValveOverride,
    /// Batch quantity.
    Batch,
    /// Blend ratio.
    Blend,
    /// Setpoint source.
    SetpointSource,
    /// Zero suppression (global).
    ZeroSuppress,
    /// Clear setpoint on power-up (global).
    PowerSetpointClear,
    /// Keypad beep (global).
    AudioBeep,
    /// Network address of the unit (global, read-only).
    NetworkAddress,
}

const fn spec(
    name: &'static str,
    code: u8,
    domain: Domain,
    kind: ParamKind,
    writable: bool,
) -> ParamSpec {
    ParamSpec {
        name,
        code,
        domain,
        kind,
        writable,
    }
}

use Domain::{Global, ProcessValue, Setpoint};
use ParamKind::{Enumerated, Flag, Scaled, Token};

/// Indexed by `BrooksParam as usize`.
static PARAMS: [ParamSpec; 18] = [
    spec("measurement_units", 4, ProcessValue, Enumerated(EnumTable::MeasurementUnit), true),
    spec("time_base", 10, ProcessValue, Enumerated(EnumTable::TimeBase), true),
    spec("decimal_point", 3, ProcessValue, Enumerated(EnumTable::DecimalPoint), true),
    spec(
        "gas_factor",
        27,
        ProcessValue,
        ParamKind::Fixed {
            multiplier: 1000.0,
            envelope: GAS_FACTOR_ENVELOPE,
        },
        true,
    ),
    spec("pv_signal_type", 0, ProcessValue, Enumerated(EnumTable::InputSignal), true),
    spec("pv_full_scale", 9, ProcessValue, Scaled, true),
    spec("sp_signal_type", 0, Setpoint, Enumerated(EnumTable::OutputSignal), true),
    spec("sp_full_scale", 9, Setpoint, Scaled, true),
    spec("setpoint_function", 2, Setpoint, Enumerated(EnumTable::SetpointFunction), true),
    spec("setpoint", 1, Setpoint, Scaled, true),
    spec("valve_override", 29, Setpoint, Enumerated(EnumTable::ValveOverride), true),
    spec("batch", 44, Setpoint, Scaled, true),
    spec(
        "blend",
        45,
        Setpoint,
        ParamKind::Fixed {
            multiplier: 1000.0,
            envelope: Envelope::STANDARD,
        },
        true,
    ),
    spec("setpoint_source", 46, Setpoint, Enumerated(EnumTable::SetpointSource), true),
    spec("zero_suppress", 32, Global, Flag, true),
    spec("power_sp_clear", 33, Global, Flag, true),
    spec("audio_beep", 39, Global, Flag, true),
    spec("network_address", 17, Global, Token, false),
];

impl BrooksParam {
    /// All parameters, in table order.
    pub const ALL: [BrooksParam; 18] = [
        BrooksParam::MeasurementUnits,
        BrooksParam::TimeBase,
        BrooksParam::DecimalPoint,
        BrooksParam::GasFactor,
        BrooksParam::PvSignalType,
        BrooksParam::PvFullScale,
        BrooksParam::SpSignalType,
        BrooksParam::SpFullScale,
        BrooksParam::SetpointFunction,
        BrooksParam::Setpoint,
        BrooksParam::ValveOverride,
        BrooksParam::Batch,
        BrooksParam::Blend,
        BrooksParam::SetpointSource,
        BrooksParam::ZeroSuppress,
        BrooksParam::PowerSetpointClear,
        BrooksParam::AudioBeep,
        BrooksParam::NetworkAddress,
    ];

    /// Static description of this parameter.
    pub fn spec(self) -> &'static ParamSpec {
        &PARAMS[self as usize]
    }

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Whether this parameter is a unit-wide setting on port 9.
    pub fn is_global(self) -> bool {
        self.spec().domain == Domain::Global
    }
}

impl fmt::Display for BrooksParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrooksParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BrooksParam::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

/// Resolve a symbolic name to its parameter.
pub fn resolve(name: &str) -> Result<BrooksParam> {
    name.parse()
}

/// Parse a numeric payload. A payload with a decimal point is already in
/// engineering units; a bare integer is divided by `multiplier`.
pub fn parse_number(name: &str, payload: &str, multiplier: f64) -> Result<f64> {
    let payload = payload.trim();
    let bad = || Error::Protocol(format!("{name} payload {payload:?} is not a number"));
    if payload.contains('.') {
        payload.parse::<f64>().map_err(|_| bad())
    } else {
        let raw = payload.parse::<i64>().map_err(|_| bad())?;
        Ok(decode_scaled(raw, multiplier))
    }
}

/// Encode `value` for a write of `param`, using `scale` for
/// [`ParamKind::Scaled`] parameters.
///
/// All validation happens here, before anything reaches the wire.
pub fn encode_value(param: BrooksParam, value: &Value, scale: DecimalPoint) -> Result<String> {
    let spec = param.spec();
    if !spec.writable {
        return Err(Error::ReadOnly(spec.name.to_string()));
    }
    match spec.kind {
        ParamKind::Scaled => {
            let v = value.expect_number(spec.name)?;
            Ok(encode_scaled(spec.name, v, scale.multiplier(), Envelope::STANDARD)?.to_string())
        }
        ParamKind::Fixed {
            multiplier,
            envelope,
        } => {
            let v = value.expect_number(spec.name)?;
            Ok(encode_scaled(spec.name, v, multiplier, envelope)?.to_string())
        }
        ParamKind::Enumerated(table) => table.encode(value.expect_label(spec.name)?),
        ParamKind::Flag => {
            let on = value.expect_flag(spec.name)?;
            Ok(String::from(if on { "1" } else { "0" }))
        }
        ParamKind::Token => match value {
            Value::Token(s) | Value::Label(s) => Ok(s.clone()),
            other => Err(Error::InvalidValue(format!(
                "{} expects a token, got {other:?}",
                spec.name
            ))),
        },
    }
}

/// Decode a response payload of `param`, using `scale` for
/// [`ParamKind::Scaled`] parameters.
pub fn decode_value(param: BrooksParam, payload: &str, scale: DecimalPoint) -> Result<Value> {
    let spec = param.spec();
    match spec.kind {
        ParamKind::Scaled => Ok(Value::Number(parse_number(
            spec.name,
            payload,
            scale.multiplier(),
        )?)),
        ParamKind::Fixed { multiplier, .. } => {
            Ok(Value::Number(parse_number(spec.name, payload, multiplier)?))
        }
        ParamKind::Enumerated(table) => Ok(Value::Label(table.decode(payload)?.to_string())),
        ParamKind::Flag => match payload.trim() {
            "1" => Ok(Value::Flag(true)),
            "0" => Ok(Value::Flag(false)),
            other => Err(Error::UnknownEnumValue {
                table: "flag",
                value: other.to_string(),
            }),
        },
        ParamKind::Token => Ok(Value::Token(payload.trim().to_string())),
    }
}

/// Map a decimal-point label to its [`DecimalPoint`].
pub fn decimal_point_from_label(label: &str) -> Result<DecimalPoint> {
    DecimalPoint::from_digits(DECIMAL_POINT.code(label)?)
}
