//! Binary checksummed frame encoder/decoder.
//!
//! Family-B mass-flow controllers answer fixed-length binary frames. Every
//! frame ends in a checksum byte equal to the sum of all preceding bytes
//! modulo 256.
//!
//! # Frame format
//!
//! ```text
//! read          0x60 <var> <ck>
//! write 8-bit   0x64 <var> <value> <ck>
//! write 16-bit  0x66 <var> <hi> <lo> <ck>
//!
//! 8-bit reply   <status> <value> <ck>
//! 16-bit reply  <status> <hi> <lo> <ck>
//! error reply   0xEE <faults> <ck>
//! ```
//!
//! A successful reply echoes the request code in its status byte. An error
//! reply carries a fault byte; its faults are reported as a set and no
//! payload is exposed.

use bytes::{BufMut, BytesMut};

use benchlink_core::error::{Error, Rejection, Result};
use benchlink_core::link::FrameStatus;
use benchlink_core::types::{DeviceFaults, Fault};

/// Request code: read a variable.
pub const READ: u8 = 0x60;

/// Request code: write an 8-bit variable.
pub const WRITE_8: u8 = 0x64;

/// Request code: write a 16-bit variable.
pub const WRITE_16: u8 = 0x66;

/// Status byte of an error reply.
pub const ERROR_CODE: u8 = 0xEE;

/// Length of an error reply.
const ERROR_FRAME_LEN: usize = 3;

/// Width of a variable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// One value byte.
    Byte,
    /// Two value bytes, big-endian.
    Word,
}

impl Width {
    /// Length of a successful reply for a variable of this width.
    pub fn reply_len(self) -> usize {
        match self {
            Width::Byte => 3,
            Width::Word => 4,
        }
    }

    /// Request code used to write a variable of this width.
    pub fn write_code(self) -> u8 {
        match self {
            Width::Byte => WRITE_8,
            Width::Word => WRITE_16,
        }
    }
}

/// Sum of `bytes` modulo 256.
///
/// # Example
///
/// ```
/// use benchlink_binary::frame::checksum;
///
/// assert_eq!(checksum(&[0x64, 0x06, 0x03]), 0x6D);
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

fn seal(mut buf: BytesMut) -> Vec<u8> {
    let ck = checksum(&buf);
    buf.put_u8(ck);
    buf.to_vec()
}

/// Encode a read request for `var`.
pub fn encode_read(var: u8) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(3);
    buf.put_u8(READ);
    buf.put_u8(var);
    seal(buf)
}

/// Encode a write of an 8-bit variable.
pub fn encode_write8(var: u8, value: u8) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u8(WRITE_8);
    buf.put_u8(var);
    buf.put_u8(value);
    seal(buf)
}

/// Encode a write of a 16-bit variable (big-endian value).
pub fn encode_write16(var: u8, value: u16) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(WRITE_16);
    buf.put_u8(var);
    buf.put_u16(value);
    seal(buf)
}

/// Decode the fault byte of an error reply.
///
/// Bits 0-1 form a two-bit communication code (`01` timeout, `10` busy,
/// `11` checksum error). Bits 2-7 are independent flags: overrun, framing,
/// parity, start, invalid request, unknown variable.
pub fn decode_faults(byte: u8) -> DeviceFaults {
    let mut faults = DeviceFaults::empty();
    match byte & 0x03 {
        0x01 => faults.insert(Fault::Timeout),
        0x02 => faults.insert(Fault::Busy),
        0x03 => faults.insert(Fault::ChecksumError),
        _ => {}
    }
    const FLAGS: [(u8, Fault); 6] = [
        (0x04, Fault::Overrun),
        (0x08, Fault::Framing),
        (0x10, Fault::Parity),
        (0x20, Fault::Start),
        (0x40, Fault::InvalidRequest),
        (0x80, Fault::UnknownVariable),
    ];
    for (mask, fault) in FLAGS {
        if byte & mask != 0 {
            faults.insert(fault);
        }
    }
    faults
}

/// Framer for a reply to a request on a variable of `width`.
///
/// An error reply is recognised as soon as its fault byte is in; a trailing
/// checksum byte that arrives later is drained by the link.
pub fn reply_framer(width: Width) -> impl Fn(&[u8]) -> FrameStatus + Send {
    move |buf: &[u8]| match buf.first() {
        None => FrameStatus::Incomplete,
        Some(&ERROR_CODE) if buf.len() >= 2 => {
            FrameStatus::Complete(buf.len().min(ERROR_FRAME_LEN))
        }
        Some(&ERROR_CODE) => FrameStatus::Incomplete,
        Some(_) if buf.len() >= width.reply_len() => FrameStatus::Complete(width.reply_len()),
        Some(_) => FrameStatus::Incomplete,
    }
}

/// Validate a reply and return its value.
///
/// Checks, in order: error reply (faults reported, payload untouched),
/// length, checksum, and the echoed request code. Only then is the value
/// decoded.
pub fn decode_reply(request_code: u8, width: Width, frame: &[u8]) -> Result<u16> {
    if frame.first() == Some(&ERROR_CODE) {
        let flags = frame.get(1).copied().ok_or_else(|| {
            Error::Protocol("error reply without fault byte".into())
        })?;
        return Err(Error::DeviceRejected(Rejection::Faults(decode_faults(flags))));
    }

    let expected_len = width.reply_len();
    if frame.len() != expected_len {
        return Err(Error::Protocol(format!(
            "reply has {} bytes, expected {expected_len}: {frame:02X?}",
            frame.len()
        )));
    }

    let (body, ck) = frame.split_at(expected_len - 1);
    let computed = checksum(body);
    if computed != ck[0] {
        return Err(Error::ChecksumMismatch {
            expected: computed as u16,
            actual: ck[0] as u16,
        });
    }

    if body[0] != request_code {
        return Err(Error::Protocol(format!(
            "reply status 0x{:02X} does not echo request 0x{request_code:02X}",
            body[0]
        )));
    }

    Ok(match width {
        Width::Byte => body[1] as u16,
        Width::Word => u16::from_be_bytes([body[1], body[2]]),
    })
}
