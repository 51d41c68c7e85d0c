//! Variable table of the binary checksummed mass-flow controllers.
//!
//! Each variable has a one-byte id, a fixed wire width and a conversion
//! between its raw value and engineering units. The table is indexed by
//! [`BinaryVariable`]; the derived readings (flow percentage and gas
//! temperature) use the device-documented formulas verbatim.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use benchlink_core::enumeration::BiMap;
use benchlink_core::error::{Error, Result};
use benchlink_core::scaling::{Envelope, decode_scaled, encode_scaled};
use benchlink_core::types::Value;

use crate::frame::Width;

/// Counts per percent of flow or setpoint.
pub const FLOW_COUNTS: f64 = 10_000.0;

/// Envelope of the setpoint in percent (the full 16-bit raw range).
pub const SETPOINT_ENVELOPE: Envelope = Envelope::new(0.0, 6.5535);

/// Envelope of the device address.
pub const ADDRESS_ENVELOPE: Envelope = Envelope::new(1.0, 247.0);

static VALVE_MODE: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new("valve mode", &[("Normal", 0), ("Closed", 1), ("Open", 2)])
});

static GAS_TYPE: LazyLock<BiMap<u8>> = LazyLock::new(|| {
    BiMap::new(
        "gas type",
        &[
            ("Air", 0),
            ("N2", 1),
            ("O2", 2),
            ("CO2", 3),
            ("Ar", 4),
            ("He", 5),
            ("H2", 6),
            ("CH4", 7),
        ],
    )
});

/// Convert a raw temperature count to degrees Celsius.
///
/// `100 * (raw / 65535 + 1 / 6)`
pub fn temperature_from_raw(raw: u16) -> f64 {
    100.0 * (raw as f64 / 65535.0 + 1.0 / 6.0)
}

/// Convert a raw flow or setpoint count to percent.
pub fn percent_from_raw(raw: u16) -> f64 {
    decode_scaled(raw as i64, FLOW_COUNTS)
}

/// Option tables of the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionTable {
    /// Valve mode (Normal/Closed/Open).
    ValveMode,
    /// Selected gas.
    GasType,
}

impl OptionTable {
    fn map(self) -> &'static BiMap<u8> {
        match self {
            OptionTable::ValveMode => &VALVE_MODE,
            OptionTable::GasType => &GAS_TYPE,
        }
    }

    /// Labels in declaration order.
    pub fn labels(self) -> Vec<&'static str> {
        self.map().labels().collect()
    }
}

/// How a variable's raw value maps to a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    /// Percentage, `raw / 10000`.
    Percent,
    /// Gas temperature via [`temperature_from_raw`].
    Temperature,
    /// Label from an option table.
    Enumerated(OptionTable),
    /// Plain integer within an envelope.
    Integer(Envelope),
    /// Raw status byte, reported as a number.
    Raw,
}

/// Static description of one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarSpec {
    /// Symbolic name.
    pub name: &'static str,
    /// Variable id on the wire.
    pub id: u8,
    /// Wire width.
    pub width: Width,
    /// Raw/engineering conversion.
    pub kind: VarKind,
    /// Whether the variable accepts writes.
    pub writable: bool,
}

/// Every variable of the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryVariable {
    /// Measured flow, percent of full scale (read-only).
    Flow,
    /// Flow setpoint, percent of full scale.
    Setpoint,
    /// Gas temperature, degrees Celsius (read-only).
    Temperature,
    /// Valve mode.
    ValveMode,
    /// Device address on the bus.
    Address,
    /// Selected gas.
    GasType,
    /// Raw status byte (read-only).
    Status,
}

/// Indexed by `BinaryVariable as usize`.
static VARIABLES: [VarSpec; 7] = [
    VarSpec {
        name: "flow",
        id: 0x00,
        width: Width::Word,
        kind: VarKind::Percent,
        writable: false,
    },
    VarSpec {
        name: "setpoint",
        id: 0x01,
        width: Width::Word,
        kind: VarKind::Percent,
        writable: true,
    },
    VarSpec {
        name: "temperature",
        id: 0x02,
        width: Width::Word,
        kind: VarKind::Temperature,
        writable: false,
    },
    VarSpec {
        name: "valve_mode",
        id: 0x04,
        width: Width::Byte,
        kind: VarKind::Enumerated(OptionTable::ValveMode),
        writable: true,
    },
    VarSpec {
        name: "address",
        id: 0x05,
        width: Width::Byte,
        kind: VarKind::Integer(ADDRESS_ENVELOPE),
        writable: true,
    },
    VarSpec {
        name: "gas_type",
        id: 0x06,
        width: Width::Byte,
        kind: VarKind::Enumerated(OptionTable::GasType),
        writable: true,
    },
    VarSpec {
        name: "status",
        id: 0x07,
        width: Width::Byte,
        kind: VarKind::Raw,
        writable: false,
    },
];

impl BinaryVariable {
    /// All variables, in table order.
    pub const ALL: [BinaryVariable; 7] = [
        BinaryVariable::Flow,
        BinaryVariable::Setpoint,
        BinaryVariable::Temperature,
        BinaryVariable::ValveMode,
        BinaryVariable::Address,
        BinaryVariable::GasType,
        BinaryVariable::Status,
    ];

    /// Static description of this variable.
    pub fn spec(self) -> &'static VarSpec {
        &VARIABLES[self as usize]
    }

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Variable id on the wire.
    pub fn id(self) -> u8 {
        self.spec().id
    }

    /// Wire width.
    pub fn width(self) -> Width {
        self.spec().width
    }
}

impl fmt::Display for BinaryVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BinaryVariable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BinaryVariable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

/// Validate and convert `value` to the raw value written for `var`.
pub fn encode_value(var: BinaryVariable, value: &Value) -> Result<u16> {
    let spec = var.spec();
    if !spec.writable {
        return Err(Error::ReadOnly(spec.name.to_string()));
    }
    let raw = match spec.kind {
        VarKind::Percent => encode_scaled(
            spec.name,
            value.expect_number(spec.name)?,
            FLOW_COUNTS,
            SETPOINT_ENVELOPE,
        )?,
        VarKind::Integer(envelope) => {
            encode_scaled(spec.name, value.expect_number(spec.name)?, 1.0, envelope)?
        }
        VarKind::Enumerated(table) => table.map().code(value.expect_label(spec.name)?)? as i64,
        VarKind::Temperature | VarKind::Raw => {
            return Err(Error::ReadOnly(spec.name.to_string()));
        }
    };
    u16::try_from(raw).map_err(|_| {
        Error::InvalidValue(format!("{} raw value {raw} does not fit the frame", spec.name))
    })
}

/// Convert a raw value read from `var` to engineering units.
pub fn decode_value(var: BinaryVariable, raw: u16) -> Result<Value> {
    let spec = var.spec();
    Ok(match spec.kind {
        VarKind::Percent => Value::Number(percent_from_raw(raw)),
        VarKind::Temperature => Value::Number(temperature_from_raw(raw)),
        VarKind::Enumerated(table) => {
            let map = table.map();
            let code = u8::try_from(raw).map_err(|_| Error::UnknownEnumValue {
                table: map.name(),
                value: raw.to_string(),
            })?;
            Value::Label(map.label(code)?.to_string())
        }
        VarKind::Integer(_) | VarKind::Raw => Value::Number(raw as f64),
    })
}
