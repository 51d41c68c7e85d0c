//! Brooks 0254 ASCII multidrop encoder/decoder.
//!
//! The 0254 secondary electronics speak a comma-delimited ASCII protocol
//! over a shared RS-485 bus. Every command targets a port of the unit;
//! channel `n` owns input port `2n - 1` (process value) and output port `2n`
//! (setpoint), and port 9 carries unit-wide settings.
//!
//! # Command format
//!
//! ```text
//! AZ[<address>].<port>P<code>?\r          read parameter
//! AZ[<address>].<port>P<code>=<value>\r   write parameter
//! AZ[<address>].<port>K\r                 gather measurement
//! ```
//!
//! - `address`: optional five-digit, zero-padded network address; omitted on
//!   a bus with a single unit, in which case the dot follows `AZ` directly.
//! - `code`: the parameter code in decimal.
//! - `value`: an integer string with no decimal point (scaled or
//!   enumeration-coded by the caller).
//!
//! # Response format
//!
//! Comma-separated tokens terminated by CR LF:
//!
//! ```text
//! AZ,<address>,<status>,<code>,<payload>[,<payload2>]\r\n
//! ```
//!
//! Status `4` is a normal response. Any other status (including `5`, the
//! batch/control status message) is a rejection and the payload is not
//! interpreted.

use bytes::{BufMut, BytesMut};

use benchlink_core::error::{Error, Rejection, Result};
use benchlink_core::link::FrameStatus;

/// Command terminator.
pub const CR: u8 = b'\r';

/// Response terminator.
pub const LF: u8 = b'\n';

/// Status token of a successful response.
pub const STATUS_OK: &str = "4";

/// Status token of a batch/control status message.
pub const STATUS_BATCH_CONTROL: &str = "5";

/// Port carrying unit-wide (global) settings.
pub const GLOBAL_PORT: u8 = 9;

/// Largest network address that fits the five-digit field.
pub const MAX_ADDRESS: u32 = 99_999;

/// Index of the status token in a response.
const STATUS_INDEX: usize = 2;
/// Index of the payload token in a response.
const PAYLOAD_INDEX: usize = 4;
/// Index of the second payload token of a measurement response.
const SECONDARY_INDEX: usize = 5;

/// Operation carried by a parameter command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op<'a> {
    /// Query the current value (`?`).
    Read,
    /// Assign an already encoded value (`=<value>`).
    Write(&'a str),
}

/// Validate a network address for the five-digit field.
pub fn check_address(address: u32) -> Result<u32> {
    if address <= MAX_ADDRESS {
        Ok(address)
    } else {
        Err(Error::ValueOutOfRange {
            name: "network address".into(),
            value: address as f64,
            min: 0.0,
            max: MAX_ADDRESS as f64,
        })
    }
}

fn put_prefix(buf: &mut BytesMut, address: Option<u32>, port: u8) {
    buf.put_slice(b"AZ");
    if let Some(address) = address {
        buf.put_slice(format!("{address:05}").as_bytes());
    }
    buf.put_u8(b'.');
    buf.put_slice(port.to_string().as_bytes());
}

/// Encode a parameter read or write command.
///
/// # Example
///
/// ```
/// use benchlink_brooks::protocol::{encode_command, Op};
///
/// assert_eq!(encode_command(None, 2, 1, Op::Read), b"AZ.2P1?\r");
/// assert_eq!(encode_command(Some(42), 2, 1, Op::Write("5500")), b"AZ00042.2P1=5500\r");
/// ```
pub fn encode_command(address: Option<u32>, port: u8, code: u8, op: Op<'_>) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(24);
    put_prefix(&mut buf, address, port);
    buf.put_u8(b'P');
    buf.put_slice(code.to_string().as_bytes());
    match op {
        Op::Read => buf.put_u8(b'?'),
        Op::Write(value) => {
            buf.put_u8(b'=');
            buf.put_slice(value.as_bytes());
        }
    }
    buf.put_u8(CR);
    buf.to_vec()
}

/// Encode a "gather measurement" command for an input port.
pub fn encode_measure(address: Option<u32>, port: u8) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(16);
    put_prefix(&mut buf, address, port);
    buf.put_u8(b'K');
    buf.put_u8(CR);
    buf.to_vec()
}

/// Framer for [`Link::exchange`](benchlink_core::Link::exchange): a response
/// is complete at the first LF.
pub fn response_framer(buf: &[u8]) -> FrameStatus {
    match buf.iter().position(|&b| b == LF) {
        Some(pos) => FrameStatus::Complete(pos + 1),
        None => FrameStatus::Incomplete,
    }
}

/// A validated response with a success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    tokens: Vec<String>,
}

impl Response {
    /// All tokens, in wire order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The status token (always [`STATUS_OK`] for a decoded response).
    pub fn status(&self) -> &str {
        &self.tokens[STATUS_INDEX]
    }

    /// The payload token at index 4.
    pub fn payload(&self) -> &str {
        &self.tokens[PAYLOAD_INDEX]
    }

    /// The second payload token at index 5, present in measurement
    /// responses.
    pub fn secondary(&self) -> Result<&str> {
        self.tokens
            .get(SECONDARY_INDEX)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "measurement response has {} tokens, expected at least {}",
                    self.tokens.len(),
                    SECONDARY_INDEX + 1
                ))
            })
    }
}

/// Split a raw response line into tokens without checking the status.
pub fn split_tokens(frame: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(frame)
        .map_err(|_| Error::Protocol(format!("non-ASCII response {frame:02X?}")))?;
    let line = text.trim_end_matches(['\r', '\n']);
    Ok(line.split(',').map(|t| t.trim().to_string()).collect())
}

/// Decode one response line.
///
/// Fails with [`Error::Protocol`] when fewer than five tokens are present and
/// with [`Error::DeviceRejected`] when the status token is not `4`. In both
/// cases no payload is exposed.
///
/// # Example
///
/// ```
/// use benchlink_brooks::protocol::decode_response;
///
/// let response = decode_response(b"AZ,1,4,5,12.500\r\n").unwrap();
/// assert_eq!(response.status(), "4");
/// assert_eq!(response.payload(), "12.500");
/// ```
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    let tokens = split_tokens(frame)?;
    if tokens.len() <= PAYLOAD_INDEX {
        return Err(Error::Protocol(format!(
            "response has {} tokens, expected at least {}: {:?}",
            tokens.len(),
            PAYLOAD_INDEX + 1,
            String::from_utf8_lossy(frame)
        )));
    }
    if tokens[STATUS_INDEX] != STATUS_OK {
        return Err(Error::DeviceRejected(Rejection::Status(
            tokens[STATUS_INDEX].clone(),
        )));
    }
    Ok(Response { tokens })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Command encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_read_without_address() {
        assert_eq!(encode_command(None, 1, 3, Op::Read), b"AZ.1P3?\r");
    }

    #[test]
    fn encode_read_with_address_is_zero_padded() {
        assert_eq!(encode_command(Some(7), 4, 29, Op::Read), b"AZ00007.4P29?\r");
    }

    #[test]
    fn encode_write_setpoint() {
        assert_eq!(
            encode_command(None, 2, 1, Op::Write("5500")),
            b"AZ.2P1=5500\r"
        );
    }

    #[test]
    fn encode_write_negative_value() {
        assert_eq!(
            encode_command(None, 2, 44, Op::Write("-125")),
            b"AZ.2P44=-125\r"
        );
    }

    #[test]
    fn encode_global_setting() {
        assert_eq!(
            encode_command(None, GLOBAL_PORT, 39, Op::Write("1")),
            b"AZ.9P39=1\r"
        );
    }

    #[test]
    fn encode_measurement() {
        assert_eq!(encode_measure(None, 3), b"AZ.3K\r");
        assert_eq!(encode_measure(Some(12345), 1), b"AZ12345.1K\r");
    }

    #[test]
    fn address_range() {
        assert!(check_address(99_999).is_ok());
        assert!(check_address(100_000).is_err());
    }

    // ---------------------------------------------------------------
    // Framing
    // ---------------------------------------------------------------

    #[test]
    fn framer_waits_for_line_feed() {
        assert_eq!(response_framer(b"AZ,1,4,5,12.5\r"), FrameStatus::Incomplete);
        assert_eq!(response_framer(b"AZ,1,4,5,12.5\r\n"), FrameStatus::Complete(15));
        assert_eq!(response_framer(b""), FrameStatus::Incomplete);
    }

    // ---------------------------------------------------------------
    // Response decoding
    // ---------------------------------------------------------------

    #[test]
    fn decode_read_response() {
        let r = decode_response(b"AZ,1,4,5,12.500\r\n").unwrap();
        assert_eq!(r.tokens(), &["AZ", "1", "4", "5", "12.500"]);
        assert_eq!(r.status(), STATUS_OK);
        assert_eq!(r.payload(), "12.500");
        assert!(r.secondary().is_err());
    }

    #[test]
    fn decode_measurement_response() {
        let r = decode_response(b"AZ,00042,4,0,1520.25,3.75\r\n").unwrap();
        assert_eq!(r.payload(), "1520.25");
        assert_eq!(r.secondary().unwrap(), "3.75");
    }

    #[test]
    fn decode_trims_whitespace_in_tokens() {
        let r = decode_response(b"AZ,1,4,3, 2 \r\n").unwrap();
        assert_eq!(r.payload(), "2");
    }

    #[test]
    fn decode_batch_status_is_rejection() {
        match decode_response(b"AZ,1,5,44,100.0\r\n") {
            Err(Error::DeviceRejected(Rejection::Status(s))) => assert_eq!(s, "5"),
            other => panic!("expected DeviceRejected, got {other:?}"),
        }
    }

    #[test]
    fn decode_other_status_is_rejection() {
        assert!(matches!(
            decode_response(b"AZ,1,2,1,0\r\n"),
            Err(Error::DeviceRejected(_))
        ));
    }

    #[test]
    fn decode_short_response_is_protocol_error() {
        assert!(matches!(
            decode_response(b"AZ,1,4\r\n"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn decode_non_ascii_is_protocol_error() {
        assert!(matches!(
            decode_response(&[0xFF, 0xFE, b'\n']),
            Err(Error::Protocol(_))
        ));
    }
}
