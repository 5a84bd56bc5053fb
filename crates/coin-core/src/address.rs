//! CryptoNote address decoding and validation.
//!
//! An address is `varint(prefix) || spend_key || view_key [|| payment_id]`
//! followed by the first four bytes of its Keccak-256, written in CryptoNote's
//! block base58: 8-byte blocks are encoded independently into 11 characters,
//! with a shorter trailing block.

use thiserror::Error;

use crate::coin::CoinParams;
use crate::hash::cn_fast_hash;
use crate::varint::{read_varint, write_varint};

/// Size of a public key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of an integrated address payment id in bytes.
pub const PAYMENT_ID_SIZE: usize = 8;

const CHECKSUM_SIZE: usize = 4;

/// Address decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Character outside the base58 alphabet
    #[error("invalid base58 character: {0}")]
    InvalidBase58Char(char),
    /// Trailing block length that no byte count encodes to
    #[error("invalid base58 block length: {0}")]
    InvalidBlockLength(usize),
    /// Block value too large for its decoded size
    #[error("base58 block overflow")]
    BlockOverflow,
    /// Decoded data too short to hold a prefix and checksum
    #[error("address too short")]
    TooShort,
    /// Invalid prefix varint
    #[error("invalid address prefix")]
    InvalidPrefix,
    /// Checksum mismatch
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Payload is neither a standard nor an integrated address
    #[error("invalid address payload length: {0}")]
    InvalidPayloadLength(usize),
}

/// A decoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    /// Network prefix tag.
    pub prefix: u64,
    /// Public spend key.
    pub spend_key: [u8; KEY_SIZE],
    /// Public view key.
    pub view_key: [u8; KEY_SIZE],
    /// Payment id, present on integrated addresses.
    pub payment_id: Option<[u8; PAYMENT_ID_SIZE]>,
}

/// Decode an address string into its prefix, keys and optional payment id.
pub fn decode_address(address: &str) -> Result<DecodedAddress, AddressError> {
    let data = base58_decode(address.trim())?;
    if data.len() <= CHECKSUM_SIZE {
        return Err(AddressError::TooShort);
    }

    let (body, checksum) = data.split_at(data.len() - CHECKSUM_SIZE);
    if cn_fast_hash(body)[..CHECKSUM_SIZE] != *checksum {
        return Err(AddressError::InvalidChecksum);
    }

    let (prefix, read) = read_varint(body).map_err(|_| AddressError::InvalidPrefix)?;
    let payload = &body[read..];

    let payment_id = match payload.len() {
        len if len == 2 * KEY_SIZE => None,
        len if len == 2 * KEY_SIZE + PAYMENT_ID_SIZE => {
            let mut id = [0u8; PAYMENT_ID_SIZE];
            id.copy_from_slice(&payload[2 * KEY_SIZE..]);
            Some(id)
        }
        len => return Err(AddressError::InvalidPayloadLength(len)),
    };

    let mut spend_key = [0u8; KEY_SIZE];
    let mut view_key = [0u8; KEY_SIZE];
    spend_key.copy_from_slice(&payload[..KEY_SIZE]);
    view_key.copy_from_slice(&payload[KEY_SIZE..2 * KEY_SIZE]);

    Ok(DecodedAddress {
        prefix,
        spend_key,
        view_key,
        payment_id,
    })
}

/// Encode an address from its parts.
pub fn encode_address(
    prefix: u64,
    spend_key: &[u8; KEY_SIZE],
    view_key: &[u8; KEY_SIZE],
    payment_id: Option<&[u8; PAYMENT_ID_SIZE]>,
) -> String {
    let mut data = Vec::with_capacity(10 + 2 * KEY_SIZE + PAYMENT_ID_SIZE + CHECKSUM_SIZE);
    write_varint(prefix, &mut data);
    data.extend_from_slice(spend_key);
    data.extend_from_slice(view_key);
    if let Some(id) = payment_id {
        data.extend_from_slice(id);
    }
    let checksum = cn_fast_hash(&data);
    data.extend_from_slice(&checksum[..CHECKSUM_SIZE]);
    base58_encode(&data)
}

/// Check that `address` decodes and carries this coin's address prefix.
///
/// Malformed input is reported as `false`; it is an expected outcome when
/// miners log in with the wrong coin's address, not an error.
pub fn validate_address(address: &str, params: &CoinParams) -> bool {
    match decode_address(address) {
        Ok(decoded) => decoded.prefix == params.address_prefix && decoded.payment_id.is_none(),
        Err(_) => false,
    }
}

/// Check whether `address` is an integrated address (one embedding a payment id).
///
/// Coins without an integrated address prefix never have integrated addresses.
pub fn is_integrated_address(address: &str, params: &CoinParams) -> bool {
    let Some(integrated_prefix) = params.integrated_address_prefix else {
        return false;
    };

    match decode_address(address) {
        Ok(decoded) => decoded.prefix == integrated_prefix && decoded.payment_id.is_some(),
        Err(_) => false,
    }
}

// ============================================================================
// CryptoNote block base58
// ============================================================================

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const FULL_BLOCK_SIZE: usize = 8;
const FULL_ENCODED_BLOCK_SIZE: usize = 11;

/// Encoded length for each decoded block length 0..=8.
const ENCODED_BLOCK_SIZES: [usize; FULL_BLOCK_SIZE + 1] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

/// Encode bytes with CryptoNote block base58.
pub fn base58_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() / FULL_BLOCK_SIZE * FULL_ENCODED_BLOCK_SIZE + FULL_ENCODED_BLOCK_SIZE);

    for block in data.chunks(FULL_BLOCK_SIZE) {
        let mut value: u64 = 0;
        for &byte in block {
            value = (value << 8) | byte as u64;
        }

        let size = ENCODED_BLOCK_SIZES[block.len()];
        let mut encoded = [BASE58_ALPHABET[0]; FULL_ENCODED_BLOCK_SIZE];
        for slot in encoded[..size].iter_mut().rev() {
            *slot = BASE58_ALPHABET[(value % 58) as usize];
            value /= 58;
        }
        out.extend(encoded[..size].iter().map(|&c| c as char));
    }

    out
}

/// Decode CryptoNote block base58.
pub fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let chars = input.as_bytes();
    let mut out = Vec::with_capacity(chars.len() / FULL_ENCODED_BLOCK_SIZE * FULL_BLOCK_SIZE + FULL_BLOCK_SIZE);

    for block in chars.chunks(FULL_ENCODED_BLOCK_SIZE) {
        let size = ENCODED_BLOCK_SIZES
            .iter()
            .position(|&encoded| encoded == block.len())
            .filter(|&size| size > 0)
            .ok_or(AddressError::InvalidBlockLength(block.len()))?;

        let mut value: u128 = 0;
        for &c in block {
            let digit = BASE58_ALPHABET
                .iter()
                .position(|&x| x == c)
                .ok_or_else(|| AddressError::InvalidBase58Char(invalid_char(input, c)))?;
            value = value * 58 + digit as u128;
        }

        if value >> (8 * size) != 0 {
            return Err(AddressError::BlockOverflow);
        }

        let bytes = value.to_be_bytes();
        out.extend_from_slice(&bytes[16 - size..]);
    }

    Ok(out)
}

/// Recover the offending character for error reporting (input may be non-ASCII).
fn invalid_char(input: &str, byte: u8) -> char {
    if byte.is_ascii() {
        byte as char
    } else {
        input
            .chars()
            .find(|c| !c.is_ascii())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}
