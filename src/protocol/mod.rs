//! Checksum-framed messages over a byte transport
//!
//! A frame is `:` followed by the raw payload, two lowercase hex digits of
//! the checksum (high nibble first) and `\n`. The payload is not escaped.

pub mod message;

pub use message::{Message, State};

pub const HEADER: u8 = b':';
pub const TERMINATOR: u8 = b'\n';

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Header, two checksum digits and terminator
const FRAME_OVERHEAD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Missing header or terminator, too short, or a bad hex digit
    InvalidFrame,
    InvalidChecksum,
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

/// Negated 8-bit sum: adding it to the payload sum gives zero.
pub fn checksum(payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(0u8, |sum, &byte| sum.wrapping_add(byte))
        .wrapping_neg()
}

/// ASCII digit for the low four bits of `nibble`
pub fn hex_digit(nibble: u8) -> u8 {
    HEX_DIGITS[usize::from(nibble & 0x0F)]
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Check one complete frame and return its payload.
pub fn parse_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < FRAME_OVERHEAD
        || frame[0] != HEADER
        || frame[frame.len() - 1] != TERMINATOR
    {
        return Err(ProtocolError::InvalidFrame);
    }

    let digits = &frame[frame.len() - 3..frame.len() - 1];
    let high = hex_value(digits[0]).ok_or(ProtocolError::InvalidFrame)?;
    let low = hex_value(digits[1]).ok_or(ProtocolError::InvalidFrame)?;

    let payload = &frame[1..frame.len() - 3];
    if checksum(payload) != (high << 4) | low {
        return Err(ProtocolError::InvalidChecksum);
    }
    Ok(payload)
}
