//! Error types for benchlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Local validation errors, wire-level
//! errors reported by instruments, and transport failures are all captured
//! here.
//!
//! Validation errors ([`Error::UnknownParameter`], [`Error::UnknownEnumValue`],
//! [`Error::ValueOutOfRange`], [`Error::InvalidValue`], [`Error::ReadOnly`])
//! are always raised before any byte is written.

use std::fmt;

use crate::types::DeviceFaults;

/// The error type for all benchlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The symbolic parameter name is not known to this protocol.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A label or code has no entry in the given enumeration table.
    #[error("unknown {table} value: {value}")]
    UnknownEnumValue {
        /// Name of the enumeration table that was searched.
        table: &'static str,
        /// The label or code that was looked up.
        value: String,
    },

    /// A value lies outside the documented envelope of a parameter.
    #[error("{name} = {value} out of range [{min}, {max}]")]
    ValueOutOfRange {
        /// Parameter name.
        name: String,
        /// The rejected value, in engineering units.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// The value has the wrong kind for the parameter (e.g. a label where a
    /// number is expected).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The parameter can be read but not written.
    #[error("parameter is read-only: {0}")]
    ReadOnly(String),

    /// A received frame failed its integrity check. The payload was not
    /// interpreted.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u16,
        /// Checksum carried by the frame.
        actual: u16,
    },

    /// The instrument answered, but refused or failed the request.
    #[error("device rejected request: {0}")]
    DeviceRejected(Rejection),

    /// Timed out waiting for a complete response.
    ///
    /// Any bytes received before the deadline have been discarded.
    #[error("timeout waiting for response")]
    Timeout,

    /// A sensor command was issued before the sensor finished its
    /// initialization sequence.
    #[error("sensor not ready (state: {0})")]
    NotReady(String),

    /// The transport has been closed.
    #[error("transport closed")]
    TransportClosed,

    /// A transport-level error (serial port, SHDLC bridge).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (short frame, malformed token, bad echo).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason an instrument gave for refusing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Non-success status token from the ASCII multidrop protocol.
    Status(String),
    /// Fault flags from the binary checksummed protocol. Several faults may
    /// be reported at once.
    Faults(DeviceFaults),
    /// Modbus exception code from the register protocol.
    Exception(u8),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Status(status) => write!(f, "status {status:?}"),
            Rejection::Faults(faults) => write!(f, "faults [{faults}]"),
            Rejection::Exception(code) => write!(f, "exception 0x{code:02X}"),
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
