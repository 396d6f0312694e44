//! EBML variable-length integers.
//!
//! The number of leading zero bits in the first byte, plus one, gives the
//! encoded width (1-8 bytes). Element IDs keep the width marker bit as part
//! of their value; sizes and other values have it masked off.

use crate::error::{Error, Result};

/// Largest width an element ID may use.
pub const MAX_ID_WIDTH: usize = 4;

/// Largest width of any variable-length integer.
pub const MAX_VINT_WIDTH: usize = 8;

/// Encoded width implied by the first byte, or `None` for a zero byte.
pub fn vint_width(first: u8) -> Option<usize> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as usize + 1)
    }
}

fn read_raw(buf: &[u8], pos: usize, max_width: usize) -> Result<(usize, u64)> {
    let first = *buf.get(pos).ok_or(Error::BufferUnderflow {
        need: pos + 1,
        have: buf.len(),
    })?;
    let width = vint_width(first)
        .filter(|w| *w <= max_width)
        .ok_or(Error::InvalidVint { offset: pos })?;

    let bytes = buf.get(pos..pos + width).ok_or(Error::BufferUnderflow {
        need: pos + width,
        have: buf.len(),
    })?;
    let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Ok((width, value))
}

/// Read an element ID at `pos`, marker bit included.
///
/// Returns the ID and its encoded width.
pub fn read_element_id(buf: &[u8], pos: usize) -> Result<(u32, usize)> {
    let (width, raw) = read_raw(buf, pos, MAX_ID_WIDTH)?;
    Ok((raw as u32, width))
}

/// Read an unsigned variable-length integer at `pos`, marker bit cleared.
///
/// Returns the value and its encoded width.
pub fn read_vint(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let (width, raw) = read_raw(buf, pos, MAX_VINT_WIDTH)?;
    let marker = 1u64 << (7 * width);
    Ok((raw & (marker - 1), width))
}

/// Read a signed displacement at `pos`.
///
/// The unsigned value is biased by the largest value representable at its
/// width, so `0xFF` decodes to `0` and `0x80` to `-127`. Sizes must never be
/// read this way.
pub fn read_signed_vint(buf: &[u8], pos: usize) -> Result<(i64, usize)> {
    let (value, width) = read_vint(buf, pos)?;
    let bias = (1i64 << (7 * width)) - 1;
    Ok((value as i64 - bias, width))
}

/// Whether a decoded size has every value bit set, which marks an element
/// of unknown size.
pub fn is_unknown_size(value: u64, width: usize) -> bool {
    width > 0 && width <= MAX_VINT_WIDTH && value == (1u64 << (7 * width)) - 1
}

/// Decode a big-endian unsigned integer element payload.
pub fn read_uint(payload: &[u8]) -> Result<u64> {
    if payload.len() > 8 {
        return Err(Error::BufferUnderflow {
            need: 8,
            have: payload.len(),
        });
    }
    Ok(payload
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Encode a value as the shortest variable-length integer that does not
/// collide with the unknown-size marker.
pub fn encode_vint(value: u64) -> Vec<u8> {
    let width = (1..=MAX_VINT_WIDTH)
        .find(|w| value < (1u64 << (7 * w)) - 1)
        .unwrap_or(MAX_VINT_WIDTH);
    let marked = value | (1u64 << (7 * width));
    marked.to_be_bytes()[8 - width..].to_vec()
}

/// Encode an element ID (which already carries its marker bit).
pub fn encode_element_id(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(3);
    bytes[skip..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vint_width() {
        assert_eq!(vint_width(0x80), Some(1));
        assert_eq!(vint_width(0x40), Some(2));
        assert_eq!(vint_width(0x1A), Some(4));
        assert_eq!(vint_width(0x01), Some(8));
        assert_eq!(vint_width(0x00), None);
    }

    #[test]
    fn test_read_element_id_keeps_marker() {
        let buf = [0x1A, 0x45, 0xDF, 0xA3];
        assert_eq!(read_element_id(&buf, 0).unwrap(), (0x1A45DFA3, 4));
        assert_eq!(read_element_id(&[0xBB], 0).unwrap(), (0xBB, 1));
        assert_eq!(read_element_id(&[0x2A, 0xD7, 0xB1], 0).unwrap(), (0x2AD7B1, 3));
    }

    #[test]
    fn test_read_element_id_rejects_wide() {
        let buf = [0x08, 0, 0, 0, 0];
        assert_eq!(
            read_element_id(&buf, 0).unwrap_err(),
            Error::InvalidVint { offset: 0 }
        );
    }

    #[test]
    fn test_read_vint_clears_marker() {
        assert_eq!(read_vint(&[0x81], 0).unwrap(), (1, 1));
        assert_eq!(read_vint(&[0x40, 0x02], 0).unwrap(), (2, 2));
        assert_eq!(read_vint(&[0x00, 0x42, 0x86], 1).unwrap(), (0x0286, 2));
        assert_eq!(
            read_vint(&[0x01, 0, 0, 0, 0, 0, 0x01, 0x00], 0).unwrap(),
            (256, 8)
        );
    }

    #[test]
    fn test_read_vint_errors() {
        assert_eq!(
            read_vint(&[0x00], 0).unwrap_err(),
            Error::InvalidVint { offset: 0 }
        );
        assert_eq!(
            read_vint(&[0x40], 0).unwrap_err(),
            Error::BufferUnderflow { need: 2, have: 1 }
        );
        assert_eq!(
            read_vint(&[], 0).unwrap_err(),
            Error::BufferUnderflow { need: 1, have: 0 }
        );
    }

    #[test]
    fn test_signed_vint() {
        assert_eq!(read_signed_vint(&[0xFF], 0).unwrap(), (0, 1));
        assert_eq!(read_signed_vint(&[0x80], 0).unwrap(), (-127, 1));
        assert_eq!(read_signed_vint(&[0xFE], 0).unwrap(), (-1, 1));
        assert_eq!(read_signed_vint(&[0x7F, 0xFF], 0).unwrap(), (0, 2));
        assert_eq!(read_signed_vint(&[0x40, 0x00], 0).unwrap(), (-16383, 2));
        assert_eq!(
            read_signed_vint(&[0x01, 0, 0, 0, 0, 0, 0, 0], 0).unwrap(),
            (-((1i64 << 56) - 1), 8)
        );
    }

    #[test]
    fn test_signed_and_unsigned_differ() {
        let buf = [0x90];
        assert_eq!(read_vint(&buf, 0).unwrap().0, 16);
        assert_eq!(read_signed_vint(&buf, 0).unwrap().0, -111);
    }

    #[test]
    fn test_unknown_size() {
        assert!(is_unknown_size(0x7F, 1));
        assert!(is_unknown_size((1 << 56) - 1, 8));
        assert!(!is_unknown_size(0x7E, 1));
        assert!(!is_unknown_size(0x7F, 2));
    }

    #[test]
    fn test_read_uint() {
        assert_eq!(read_uint(&[]).unwrap(), 0);
        assert_eq!(read_uint(&[0x0F, 0x42, 0x40]).unwrap(), 1_000_000);
        assert!(read_uint(&[0; 9]).is_err());
    }

    #[test]
    fn test_encode_vint() {
        assert_eq!(encode_vint(0), vec![0x80]);
        assert_eq!(encode_vint(126), vec![0xFE]);
        // 127 would read back as unknown size at width 1.
        assert_eq!(encode_vint(127), vec![0x40, 0x7F]);
        let encoded = encode_vint(1_000_000);
        assert_eq!(read_vint(&encoded, 0).unwrap(), (1_000_000, encoded.len()));
    }

    #[test]
    fn test_encode_element_id() {
        assert_eq!(encode_element_id(0x1A45DFA3), vec![0x1A, 0x45, 0xDF, 0xA3]);
        assert_eq!(encode_element_id(0x2AD7B1), vec![0x2A, 0xD7, 0xB1]);
        assert_eq!(encode_element_id(0xBB), vec![0xBB]);
    }
}
