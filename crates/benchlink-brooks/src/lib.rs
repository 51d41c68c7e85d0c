//! Brooks 0254 backend for benchlink.
//!
//! The Brooks 0254 is a four-channel secondary electronics unit for
//! mass-flow controllers, driven over an RS-485 multidrop bus with a
//! comma-delimited ASCII protocol. This crate provides:
//!
//! - **Protocol codec** ([`protocol`]) -- encode `AZ` commands and decode the
//!   comma-separated, LF-terminated responses.
//! - **Parameter registry** ([`params`]) -- every parameter with its code,
//!   port domain and payload encoding, plus the option tables.
//! - **Channel facade** ([`channel`]) -- [`BrooksChannel`], one controller
//!   channel with its own decimal-point cache, implementing
//!   [`Instrument`](benchlink_core::Instrument).
//! - **Unit facade** ([`hub`]) -- [`Brooks0254`], which hands out channels on
//!   a shared link and exposes unit-wide settings.
//! - **Builder** ([`builder`]) -- [`BrooksBuilder`] for serial or
//!   caller-provided transports.
//!
//! # Example
//!
//! ```
//! use benchlink_brooks::params::{encode_value, BrooksParam};
//! use benchlink_brooks::protocol::{encode_command, Op};
//! use benchlink_core::{DecimalPoint, Value};
//!
//! // 550.0 with one decimal goes on the wire as 5500, to the output port.
//! let wire = encode_value(BrooksParam::Setpoint, &Value::Number(550.0), DecimalPoint::One).unwrap();
//! assert_eq!(encode_command(None, 2, 1, Op::Write(&wire)), b"AZ.2P1=5500\r");
//! ```

pub mod builder;
pub mod channel;
pub mod hub;
pub mod params;
pub mod protocol;
mod transceive;

pub use builder::BrooksBuilder;
pub use channel::BrooksChannel;
pub use hub::Brooks0254;
pub use params::{BrooksParam, EnumTable};
