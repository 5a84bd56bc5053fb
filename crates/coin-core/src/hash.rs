//! Keccak hashing primitives shared by addresses, transactions and blocks.

use sha3::{Digest, Keccak256};

/// Size of a CryptoNote hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Keccak-1600 rate used by CryptoNote (bytes absorbed per permutation).
const KECCAK_RATE: usize = 136;

/// CryptoNote's fast hash: original (pre-NIST) Keccak-256.
///
/// Used for address checksums, transaction ids, tree hashes and block ids.
#[inline]
pub fn cn_fast_hash(data: &[u8]) -> [u8; 32] {
    let hash = Keccak256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Hash the concatenation of two hashes.
#[inline]
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    cn_fast_hash(&combined)
}

/// Absorb `data` into a fresh Keccak-1600 state and return all 25 lanes.
///
/// This is the full 200-byte state that CryptoNight seeds its scratchpad from,
/// not a truncated digest.
pub fn keccak1600(data: &[u8]) -> [u64; 25] {
    let mut state = [0u64; 25];

    let mut chunks = data.chunks_exact(KECCAK_RATE);
    for block in &mut chunks {
        absorb(&mut state, block);
        keccak::f1600(&mut state);
    }

    let remainder = chunks.remainder();
    let mut last = [0u8; KECCAK_RATE];
    last[..remainder.len()].copy_from_slice(remainder);
    last[remainder.len()] = 0x01;
    last[KECCAK_RATE - 1] |= 0x80;
    absorb(&mut state, &last);
    keccak::f1600(&mut state);

    state
}

fn absorb(state: &mut [u64; 25], block: &[u8]) {
    for (lane, word) in state.iter_mut().zip(block.chunks_exact(8)) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(word);
        *lane ^= u64::from_le_bytes(bytes);
    }
}

/// Serialize Keccak lanes to their little-endian byte form.
pub fn state_to_bytes(state: &[u64; 25]) -> [u8; 200] {
    let mut bytes = [0u8; 200];
    for (chunk, lane) in bytes.chunks_exact_mut(8).zip(state.iter()) {
        chunk.copy_from_slice(&lane.to_le_bytes());
    }
    bytes
}

/// Load Keccak lanes from their little-endian byte form.
pub fn state_from_bytes(bytes: &[u8; 200]) -> [u64; 25] {
    let mut state = [0u64; 25];
    for (lane, chunk) in state.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *lane = u64::from_le_bytes(word);
    }
    state
}

/// Hex encoding of a hash in the byte order the daemon prints it.
///
/// Unlike Bitcoin, CryptoNote hashes are displayed without reversal.
pub fn hash_to_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}
