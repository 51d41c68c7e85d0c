//! Binary checksummed mass-flow controller backend for benchlink.
//!
//! Family-B controllers speak fixed-length binary frames with a modulo-256
//! checksum. This crate provides:
//!
//! - **Frame codec** ([`frame`]) -- read/write frames, checksum, reply
//!   validation and fault decoding.
//! - **Variable table** ([`variables`]) -- ids, widths and the
//!   device-documented conversions.
//! - **Facade** ([`device`]) -- [`BinaryMfc`], implementing
//!   [`Instrument`](benchlink_core::Instrument).
//! - **Builder** ([`builder`]) -- [`BinaryMfcBuilder`].
//!
//! # Example
//!
//! ```
//! use benchlink_binary::frame::{encode_write8, WRITE_8};
//!
//! // Select CO2 (code 3) in the gas type variable (id 6).
//! let frame = encode_write8(6, 3);
//! assert_eq!(frame, vec![WRITE_8, 6, 3, (0x64 + 6 + 3) as u8]);
//! ```

pub mod builder;
pub mod device;
pub mod frame;
pub mod variables;

pub use builder::BinaryMfcBuilder;
pub use device::BinaryMfc;
pub use variables::{BinaryVariable, OptionTable};
