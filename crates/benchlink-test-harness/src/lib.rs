//! benchlink-test-harness: Mock transports, register buses and sensor
//! bridges for benchlink.
//!
//! This crate provides deterministic stand-ins for every seam in
//! `benchlink-core`, so protocol engines can be tested without real
//! instruments:
//!
//! - [`MockTransport`] -- ordered request/response expectations
//! - [`ScriptedTransport`] -- closure-driven replies, flags interleaved requests
//! - [`MockRegisterBus`] -- in-memory register map with an access log
//! - [`MockBridge`] -- records sensor bridge calls, replays I2C replies

pub mod mock_bridge;
pub mod mock_register;
pub mod mock_serial;
pub mod scripted;

pub use mock_bridge::{BridgeCall, MockBridge};
pub use mock_register::{MockRegisterBus, RegisterAccess};
pub use mock_serial::{MockTransport, SentLog};
pub use scripted::ScriptedTransport;
