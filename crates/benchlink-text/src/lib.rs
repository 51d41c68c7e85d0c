//! Line-oriented serial text sensor backend for benchlink.
//!
//! Many bench instruments (multimeters, pressure gauges, SCPI devices)
//! answer a short text query with one line. This crate provides:
//!
//! - **Sample buffer** ([`buffer`]) -- bounded history that keeps the
//!   newest samples when resized.
//! - **Facade** ([`sensor`]) -- [`TextSensor`], implementing
//!   [`Instrument`](benchlink_core::Instrument).
//! - **Builder** ([`builder`]) -- [`TextSensorBuilder`].

pub mod buffer;
pub mod builder;
pub mod sensor;

pub use buffer::SampleBuffer;
pub use builder::TextSensorBuilder;
pub use sensor::{TextParam, TextSensor};
