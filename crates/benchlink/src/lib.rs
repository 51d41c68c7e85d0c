//! # benchlink -- asynchronous laboratory instrument control
//!
//! `benchlink` drives mass-flow controllers, a temperature controller,
//! Sensirion gas/humidity sensors and line-oriented text sensors over
//! serial lines and I2C sensor bridges. It turns typed operations ("set the setpoint to 12.5", "read the valve
//! override") into the exact bytes each instrument family expects, and
//! validates every reply before a value is returned.
//!
//! ## Quick Start
//!
//! ```no_run
//! use benchlink::Instrument;
//! use benchlink::brooks::BrooksBuilder;
//!
//! #[tokio::main]
//! async fn main() -> benchlink::Result<()> {
//!     let unit = BrooksBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     let mut mfc = unit.channel(1).await?;
//!     mfc.set_setpoint(12.5).await?;
//!     let m = mfc.get_measurement().await?;
//!     println!("flow {} total {:?}", m.primary, m.secondary);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                    | Purpose                                             |
//! |--------------------------|-----------------------------------------------------|
//! | `benchlink-core`         | [`Instrument`], [`Link`], [`Error`], values, scaling |
//! | `benchlink-transport`    | Serial transport, Modbus RTU register bus           |
//! | `benchlink-brooks`       | Brooks 0254 ASCII multidrop units                   |
//! | `benchlink-binary`       | Binary checksummed mass-flow controllers            |
//! | `benchlink-apar`         | APAR AR6X2 temperature controller                   |
//! | `benchlink-sensirion`    | SHT85 and STC31 behind an I2C sensor bridge         |
//! | `benchlink-text`         | Serial sensors answering a text query with a line   |
//! | **`benchlink`**          | This facade crate -- re-exports everything          |
//!
//! Every facade implements [`Instrument`], so orchestration code can hold a
//! `Vec<Box<dyn Instrument>>` and address parameters by name.
//!
//! ## Feature Flags
//!
//! | Feature     | Enables                              | Default |
//! |-------------|--------------------------------------|---------|
//! | `brooks`    | [`brooks`] module                    | yes     |
//! | `binary`    | [`binary`] module                    | yes     |
//! | `apar`      | [`apar`] module                      | yes     |
//! | `sensirion` | [`sensirion`] module                 | yes     |
//! | `text`      | [`text`] module                      | yes     |
//! | `full`      | All instrument backends              | no      |
//!
//! ## Shared buses
//!
//! Several instruments on one RS-485 line share a single [`Link`]. The link
//! allows exactly one request/response exchange at a time, so concurrent
//! tasks never interleave bytes on the wire. Sensors on one sensor bridge
//! share a [`BridgeHandle`] the same way.

pub use benchlink_core::*;

/// Serial and Modbus RTU transports.
pub mod transport {
    pub use benchlink_transport::*;
}

/// Brooks 0254 ASCII multidrop backend.
///
/// Provides [`Brooks0254`](brooks::Brooks0254) for a whole unit and
/// [`BrooksChannel`](brooks::BrooksChannel) for each of its four
/// mass-flow controller channels.
#[cfg(feature = "brooks")]
pub mod brooks {
    pub use benchlink_brooks::*;
}

/// Binary checksummed mass-flow controller backend.
///
/// Provides [`BinaryMfc`](binary::BinaryMfc) and
/// [`BinaryMfcBuilder`](binary::BinaryMfcBuilder).
#[cfg(feature = "binary")]
pub mod binary {
    pub use benchlink_binary::*;
}

/// APAR AR6X2 temperature controller backend.
///
/// Provides [`Ar6x2`](apar::Ar6x2) over any
/// [`RegisterBus`](crate::RegisterBus), normally Modbus RTU.
#[cfg(feature = "apar")]
pub mod apar {
    pub use benchlink_apar::*;
}

/// Sensirion sensor backend.
///
/// Provides [`Sht85`](sensirion::Sht85) and [`Stc31`](sensirion::Stc31)
/// behind a [`SensorBridge`](crate::SensorBridge).
#[cfg(feature = "sensirion")]
pub mod sensirion {
    pub use benchlink_sensirion::*;
}

/// Line-oriented serial text sensor backend.
///
/// Provides [`TextSensor`](text::TextSensor), which polls with a text query
/// and keeps a bounded history of reply lines.
#[cfg(feature = "text")]
pub mod text {
    pub use benchlink_text::*;
}
