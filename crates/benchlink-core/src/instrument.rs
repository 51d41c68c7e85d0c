//! The `Instrument` trait -- the uniform surface every device facade offers.
//!
//! Orchestration and GUI code program against `dyn Instrument` without
//! knowing which wire protocol a device speaks. Parameters are addressed by
//! symbolic name; each backend resolves the name through its own parameter
//! table and rejects names that belong to a different protocol.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{InstrumentInfo, Measurement, Value};

/// Uniform asynchronous interface for one instrument (or one channel of a
/// multi-channel instrument).
///
/// All methods that talk to the device are `async` and perform at most one
/// request/response exchange per wire access. They take `&mut self` because
/// facades own per-instance scale and address state.
///
/// Failures are always reported: a failed read never yields a default value.
#[async_trait]
pub trait Instrument: Send {
    /// Static identification of the instrument.
    fn info(&self) -> &InstrumentInfo;

    /// Read a parameter by symbolic name.
    ///
    /// Unknown names fail with [`Error::UnknownParameter`](crate::Error::UnknownParameter)
    /// before anything is written.
    async fn read(&mut self, name: &str) -> Result<Value>;

    /// Write a parameter by symbolic name.
    ///
    /// The value is validated (name, enum label, numeric envelope) before
    /// anything is written.
    async fn write(&mut self, name: &str, value: Value) -> Result<()>;

    /// Take one measurement.
    async fn get_measurement(&mut self) -> Result<Measurement>;

    /// Release the instrument's transport or bridge port.
    async fn close(&mut self) -> Result<()>;
}
