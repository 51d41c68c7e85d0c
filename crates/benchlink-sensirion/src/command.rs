//! I2C command codec for Sensirion sensors.
//!
//! A request is a 16-bit big-endian command code, optionally followed by a
//! 16-bit big-endian argument:
//!
//! ```text
//! <cmd hi> <cmd lo> [<arg hi> <arg lo>]
//! ```
//!
//! Replies are sequences of 16-bit words. With CRC enabled each word is
//! followed by a Sensirion CRC-8 byte (polynomial 0x31, init 0xFF), which is
//! verified before the word is used.

use crc::{CRC_8_NRSC_5, Crc};

use benchlink_core::error::{Error, Result};

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection, no final xor.
const CRC_SENSIRION: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// CRC-8 of one data word as Sensirion sensors compute it.
///
/// # Example
///
/// ```
/// use benchlink_sensirion::command::crc8;
///
/// assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    CRC_SENSIRION.checksum(data)
}

/// Encode a command and its optional argument, without CRC.
pub fn encode_command(command: u16, argument: Option<u16>) -> Vec<u8> {
    let mut tx = Vec::with_capacity(4);
    tx.extend_from_slice(&command.to_be_bytes());
    if let Some(arg) = argument {
        tx.extend_from_slice(&arg.to_be_bytes());
    }
    tx
}

/// Split a CRC-protected reply into verified words.
///
/// The reply must be a whole number of `<hi> <lo> <crc>` triplets.
pub fn verified_words(reply: &[u8]) -> Result<Vec<u16>> {
    if reply.len() % 3 != 0 {
        return Err(Error::Protocol(format!(
            "reply of {} bytes is not a sequence of CRC-protected words",
            reply.len()
        )));
    }
    reply
        .chunks_exact(3)
        .map(|chunk| {
            let expected = crc8(&chunk[..2]);
            if expected != chunk[2] {
                return Err(Error::ChecksumMismatch {
                    expected: expected as u16,
                    actual: chunk[2] as u16,
                });
            }
            Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
        })
        .collect()
}

/// Read the big-endian word at byte offset `at` of a reply without CRC.
pub fn word_at(reply: &[u8], at: usize) -> Result<u16> {
    match reply.get(at..at + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(Error::Protocol(format!(
            "reply of {} bytes has no word at offset {at}",
            reply.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_reference_value() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
        assert_eq!(crc8(&[0x00, 0x00]), 0x81);
    }

    #[test]
    fn command_is_big_endian() {
        assert_eq!(encode_command(0x3768, None), vec![0x37, 0x68]);
        assert_eq!(encode_command(0x3615, Some(0x0001)), vec![0x36, 0x15, 0x00, 0x01]);
        assert_eq!(encode_command(0x0006, None), vec![0x00, 0x06]);
    }

    #[test]
    fn words_are_verified() {
        let reply = [0xBE, 0xEF, 0x92, 0x00, 0x00, 0x81];
        assert_eq!(verified_words(&reply).unwrap(), vec![0xBEEF, 0x0000]);
    }

    #[test]
    fn corrupt_word_is_rejected() {
        let reply = [0xBE, 0xEF, 0x92, 0x00, 0x01, 0x81];
        match verified_words(&reply) {
            Err(Error::ChecksumMismatch { actual, .. }) => assert_eq!(actual, 0x81),
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn ragged_reply_is_protocol_error() {
        assert!(matches!(verified_words(&[0xBE, 0xEF]), Err(Error::Protocol(_))));
    }

    #[test]
    fn plain_words() {
        assert_eq!(word_at(&[0x40, 0x00, 0x12, 0x34], 2).unwrap(), 0x1234);
        assert!(word_at(&[0x40], 0).is_err());
    }
}
