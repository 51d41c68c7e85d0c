//! benchlink-core: Core traits, types, and error definitions for benchlink.
//!
//! This crate defines the protocol-agnostic abstractions that every
//! instrument backend builds on. Orchestration code depends on these types
//! without pulling in any specific device driver.
//!
//! # Key types
//!
//! - [`Instrument`] -- the uniform trait every device facade implements
//! - [`Transport`] -- byte-level communication channel
//! - [`Link`] -- serialized request/response exchanges on a shared bus
//! - [`RegisterBus`] / [`SensorBridge`] -- register and I2C bridge seams
//! - [`BiMap`] -- bidirectional label/code enumerations
//! - [`Error`] / [`Result`] -- error handling

pub mod bridge;
pub mod enumeration;
pub mod error;
pub mod instrument;
pub mod link;
pub mod register;
pub mod scaling;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use benchlink_core::*`.
pub use bridge::{BridgeHandle, SensorBridge, bridge_handle};
pub use enumeration::BiMap;
pub use error::{Error, Rejection, Result};
pub use instrument::Instrument;
pub use link::{FrameStatus, Link};
pub use register::RegisterBus;
pub use scaling::{DecimalPoint, Envelope, decode_scaled, encode_scaled};
pub use transport::Transport;
pub use types::*;
