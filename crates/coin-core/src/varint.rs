//! CryptoNote variable-length integers (7 bits per byte, little-endian groups,
//! high bit set on every byte except the last).

use thiserror::Error;

/// Varint decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarintError {
    /// Input ended before the terminating byte.
    #[error("varint truncated")]
    Truncated,
    /// Value does not fit in 64 bits.
    #[error("varint overflows u64")]
    Overflow,
}

/// Append the varint encoding of `value` to `out`.
pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Decode a varint from the start of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;

    for (i, &byte) in data.iter().enumerate() {
        let shift = 7 * i as u32;
        if shift >= 64 {
            return Err(VarintError::Overflow);
        }

        let bits = (byte & 0x7f) as u64;
        if shift == 63 && bits > 1 {
            return Err(VarintError::Overflow);
        }
        value |= bits << shift;

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(VarintError::Truncated)
}

/// Number of bytes `value` occupies when varint-encoded.
pub fn varint_size(value: u64) -> usize {
    let mut out = Vec::with_capacity(10);
    write_varint(value, &mut out);
    out.len()
}
