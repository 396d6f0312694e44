//! Minimal EBML encoder for building fixtures.

use super::vint::{encode_element_id, encode_vint};

/// Encode an element with a known payload size.
pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_element_id(id);
    out.extend(encode_vint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

/// Encode an element whose size is marked unknown, as live streams do.
pub fn unknown_size_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_element_id(id);
    out.push(0xFF);
    out.extend_from_slice(payload);
    out
}

/// Encode an unsigned integer element using the fewest payload bytes.
pub fn uint_element(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    element(id, &bytes[skip..])
}
