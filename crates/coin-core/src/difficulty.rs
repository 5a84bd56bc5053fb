//! Difficulty and target conversion.
//!
//! CryptoNote hashes are read as 256-bit little-endian numbers. A hash meets
//! difficulty `d` when `hash * d` still fits in 256 bits, i.e. when
//! `hash <= base_diff / d`.

use primitive_types::{U256, U512};

/// The maximum 256-bit value; the numerator of every target conversion.
#[inline]
pub fn base_diff() -> U256 {
    U256::MAX
}

/// Interpret a hash as a little-endian 256-bit number.
#[inline]
pub fn hash_to_u256(hash: &[u8; 32]) -> U256 {
    U256::from_little_endian(hash)
}

/// Check whether a proof-of-work hash meets `difficulty`.
///
/// Difficulty 0 is never met.
pub fn hash_meets_difficulty(hash: &[u8; 32], difficulty: u64) -> bool {
    if difficulty == 0 {
        return false;
    }
    let product = hash_to_u256(hash).full_mul(U256::from(difficulty));
    product <= U512::from(base_diff())
}

/// The difficulty a hash actually achieved (`base_diff / hash`).
pub fn hash_difficulty(hash: &[u8; 32]) -> U256 {
    let value = hash_to_u256(hash);
    if value.is_zero() {
        return base_diff();
    }
    base_diff() / value
}

/// The 256-bit target for a difficulty (`base_diff / difficulty`).
pub fn difficulty_to_target(difficulty: u64) -> U256 {
    base_diff() / U256::from(difficulty.max(1))
}

/// The compact 4-byte target sent to workers in a job, as hex.
///
/// Workers compare the top 32 bits of their hash (little-endian) against it.
pub fn job_target_hex(difficulty: u64) -> String {
    let mut be = [0u8; 32];
    difficulty_to_target(difficulty).to_big_endian(&mut be);
    let mut compact = [0u8; 4];
    compact.copy_from_slice(&be[..4]);
    compact.reverse();
    hex::encode(compact)
}
