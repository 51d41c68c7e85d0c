//! `TextSensor` -- a serial instrument that answers a text query with one
//! line.
//!
//! Each poll writes the query followed by `\n` and reads up to the first
//! `\n`. Non-empty replies are kept in a [`SampleBuffer`]; how the text is
//! interpreted is up to the caller, except for
//! [`get_measurement`](Instrument::get_measurement), which takes the first
//! one or two numeric fields.

use std::str::FromStr;

use async_trait::async_trait;
use tracing::{debug, warn};

use benchlink_core::error::{Error, Result};
use benchlink_core::instrument::Instrument;
use benchlink_core::link::{FrameStatus, Link};
use benchlink_core::types::{InstrumentInfo, Measurement, Protocol, Value};

use crate::buffer::SampleBuffer;

/// Query sent when none is configured.
pub const DEFAULT_QUERY: &str = ":MEAS?";

/// Complete at the first line feed.
pub fn line_framer(buf: &[u8]) -> FrameStatus {
    match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => FrameStatus::Complete(pos + 1),
        None => FrameStatus::Incomplete,
    }
}

/// Parameters reachable through [`Instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextParam {
    /// Poll once and return the reply line (read-only).
    Reading,
    /// The query string.
    Query,
    /// Number of samples kept.
    BufferSize,
}

impl TextParam {
    pub const ALL: [TextParam; 3] = [TextParam::Reading, TextParam::Query, TextParam::BufferSize];

    pub fn name(self) -> &'static str {
        match self {
            TextParam::Reading => "reading",
            TextParam::Query => "query",
            TextParam::BufferSize => "buffer_size",
        }
    }
}

impl FromStr for TextParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TextParam::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

/// A line-oriented serial text sensor.
pub struct TextSensor {
    link: Link,
    query: String,
    buffer: SampleBuffer,
    info: InstrumentInfo,
}

impl TextSensor {
    /// Wrap an open link with the default query and buffer size.
    pub fn new(link: Link, model: &str) -> Self {
        TextSensor {
            link,
            query: DEFAULT_QUERY.to_string(),
            buffer: SampleBuffer::default(),
            info: InstrumentInfo {
                manufacturer: "Generic",
                model: model.to_string(),
                protocol: Protocol::TextLine,
            },
        }
    }

    /// Current query string, without the line feed.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the query. It must be non-empty and a single line.
    pub fn set_query(&mut self, query: &str) -> Result<()> {
        if query.is_empty() || query.contains(['\n', '\r']) {
            return Err(Error::InvalidValue(format!(
                "query must be one non-empty line, got {query:?}"
            )));
        }
        self.query = query.to_string();
        Ok(())
    }

    /// Send the query and read one line.
    ///
    /// The reply is stored without its line ending. An empty line is
    /// returned as `None` and not stored.
    pub async fn poll(&mut self) -> Result<Option<String>> {
        let request = format!("{}\n", self.query);
        let reply = self.link.exchange(request.as_bytes(), line_framer).await?;
        let text = String::from_utf8(reply).map_err(|e| {
            warn!(query = %self.query, error = %e, "sensor reply is not UTF-8");
            Error::Protocol(format!("sensor reply is not UTF-8: {e}"))
        })?;
        let line = text.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            debug!(query = %self.query, "empty reply");
            return Ok(None);
        }
        debug!(query = %self.query, reply = line, "sample");
        self.buffer.push(line.to_string());
        Ok(Some(line.to_string()))
    }

    /// Stored samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.buffer.iter()
    }

    /// Most recent stored sample.
    pub fn latest(&self) -> Option<&str> {
        self.buffer.latest()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.capacity()
    }

    /// Resize the sample buffer, keeping the newest samples.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<()> {
        self.buffer.resize(size)
    }

    pub fn clear_samples(&mut self) {
        self.buffer.clear();
    }

    pub fn link(&self) -> &Link {
        &self.link
    }
}

/// First two numeric fields of a reply line. Fields are separated by
/// commas, semicolons or whitespace.
pub fn numeric_fields(line: &str) -> Vec<f64> {
    line.split([',', ';', ' ', '\t'])
        .filter_map(|field| field.trim().parse::<f64>().ok())
        .take(2)
        .collect()
}

#[async_trait]
impl Instrument for TextSensor {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    async fn read(&mut self, name: &str) -> Result<Value> {
        match name.parse::<TextParam>()? {
            TextParam::Reading => match self.poll().await? {
                Some(line) => Ok(Value::Token(line)),
                None => Err(Error::Protocol("sensor sent an empty line".into())),
            },
            TextParam::Query => Ok(Value::Token(self.query.clone())),
            TextParam::BufferSize => Ok(Value::Number(self.buffer_size() as f64)),
        }
    }

    async fn write(&mut self, name: &str, value: Value) -> Result<()> {
        match name.parse::<TextParam>()? {
            TextParam::Reading => Err(Error::ReadOnly(name.to_string())),
            TextParam::Query => match value {
                Value::Token(query) | Value::Label(query) => self.set_query(&query),
                other => Err(Error::InvalidValue(format!(
                    "{name} expects text, got {other:?}"
                ))),
            },
            TextParam::BufferSize => {
                let size = value.expect_number(name)?;
                if size.fract() != 0.0 || size < 1.0 || size > u32::MAX as f64 {
                    return Err(Error::ValueOutOfRange {
                        name: name.to_string(),
                        value: size,
                        min: 1.0,
                        max: u32::MAX as f64,
                    });
                }
                self.set_buffer_size(size as usize)
            }
        }
    }

    /// First numeric field as `primary`, the second (if any) as
    /// `secondary`.
    async fn get_measurement(&mut self) -> Result<Measurement> {
        let line = self
            .poll()
            .await?
            .ok_or_else(|| Error::Protocol("sensor sent an empty line".into()))?;
        match numeric_fields(&line).as_slice() {
            [primary] => Ok(Measurement::now(*primary, None)),
            [primary, secondary, ..] => Ok(Measurement::now(*primary, Some(*secondary))),
            [] => Err(Error::Protocol(format!("no numeric field in {line:?}"))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.link.close().await
    }
}
