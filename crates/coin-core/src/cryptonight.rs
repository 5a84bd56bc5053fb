//! CryptoNight (original variant) proof-of-work hash.
//!
//! The algorithm:
//! 1. Absorb the input into a 200-byte Keccak-1600 state.
//! 2. Expand bytes 64..192 of the state into a 2 MiB scratchpad with ten-round
//!    AES keyed from bytes 0..32.
//! 3. Walk the scratchpad for 524 288 rounds alternating an AES round and a
//!    64x64 multiply, each step addressed by the previous result.
//! 4. Fold the scratchpad back into the state with AES keyed from bytes
//!    32..64, permute it once more and pick one of four final hashes by the
//!    low two bits of the first state byte.

use aes::hazmat::cipher_round;
use aes::Block;
use digest::consts::U32;
use digest::Digest;

use crate::hash::{keccak1600, state_from_bytes, state_to_bytes};

/// Scratchpad size in bytes.
const MEMORY: usize = 1 << 21;

/// Number of scratchpad walk iterations (each performs two steps).
const ITERATIONS: usize = 1 << 19;

const AES_BLOCK_SIZE: usize = 16;

/// Bytes processed per AES expansion pass (eight blocks).
const INIT_SIZE: usize = 128;

/// Scratchpad address mask: 16-byte aligned offsets inside `MEMORY`.
const ADDRESS_MASK: u64 = (MEMORY as u64 - 1) & !(AES_BLOCK_SIZE as u64 - 1);

/// A proof-of-work function evaluated over a hashing blob.
///
/// Implementations must agree bit for bit with the network's consensus hash,
/// since the daemon judges submitted blocks with its own copy.
pub trait HashEngine: Send + Sync {
    /// Digest a hashing blob.
    fn evaluate(&self, blob: &[u8]) -> [u8; 32];
}

/// The CryptoNight engine used by Intense Coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoNight;

impl HashEngine for CryptoNight {
    fn evaluate(&self, blob: &[u8]) -> [u8; 32] {
        cryptonight(blob)
    }
}

/// Compute the CryptoNight hash of `data`.
pub fn cryptonight(data: &[u8]) -> [u8; 32] {
    let mut state = state_to_bytes(&keccak1600(data));
    let mut scratchpad = vec![0u8; MEMORY];

    // Scratchpad expansion
    let round_keys = expand_key(&state[..32]);
    let mut text = [0u8; INIT_SIZE];
    text.copy_from_slice(&state[64..64 + INIT_SIZE]);
    for chunk in scratchpad.chunks_exact_mut(INIT_SIZE) {
        for block in text.chunks_exact_mut(AES_BLOCK_SIZE) {
            pseudo_encrypt(block, &round_keys);
        }
        chunk.copy_from_slice(&text);
    }

    // Memory-hard walk
    let mut a = [0u8; AES_BLOCK_SIZE];
    let mut b = [0u8; AES_BLOCK_SIZE];
    for i in 0..AES_BLOCK_SIZE {
        a[i] = state[i] ^ state[32 + i];
        b[i] = state[16 + i] ^ state[48 + i];
    }

    for _ in 0..ITERATIONS {
        // AES step
        let j = address(&a);
        let mut c = [0u8; AES_BLOCK_SIZE];
        c.copy_from_slice(&scratchpad[j..j + AES_BLOCK_SIZE]);
        cipher_round(Block::from_mut_slice(&mut c), Block::from_slice(&a));
        xor_into(&mut b, &c);
        scratchpad[j..j + AES_BLOCK_SIZE].copy_from_slice(&b);

        // Multiply step
        let j = address(&c);
        let mut d = [0u8; AES_BLOCK_SIZE];
        d.copy_from_slice(&scratchpad[j..j + AES_BLOCK_SIZE]);
        let product = (lo_u64(&c) as u128) * (lo_u64(&d) as u128);
        let hi = ((product >> 64) as u64).wrapping_add(lo_u64(&a));
        let lo = (product as u64).wrapping_add(hi_u64(&a));
        a[..8].copy_from_slice(&hi.to_le_bytes());
        a[8..].copy_from_slice(&lo.to_le_bytes());
        scratchpad[j..j + AES_BLOCK_SIZE].copy_from_slice(&a);
        xor_into(&mut a, &d);

        b = c;
    }

    // Fold the scratchpad back into the state
    let round_keys = expand_key(&state[32..64]);
    text.copy_from_slice(&state[64..64 + INIT_SIZE]);
    for chunk in scratchpad.chunks_exact(INIT_SIZE) {
        for (block, pad) in text
            .chunks_exact_mut(AES_BLOCK_SIZE)
            .zip(chunk.chunks_exact(AES_BLOCK_SIZE))
        {
            xor_into(block, pad);
            pseudo_encrypt(block, &round_keys);
        }
    }
    state[64..64 + INIT_SIZE].copy_from_slice(&text);

    let mut lanes = state_from_bytes(&state);
    keccak::f1600(&mut lanes);
    let state = state_to_bytes(&lanes);

    final_hash(&state)
}

/// Select and apply one of the four finalizers.
fn final_hash(state: &[u8; 200]) -> [u8; 32] {
    let mut out = [0u8; 32];
    match state[0] & 3 {
        0 => out.copy_from_slice(&<blake_hash::Blake256 as digest09::Digest>::digest(state)),
        1 => out.copy_from_slice(&groestl::Groestl256::digest(state)),
        2 => out.copy_from_slice(&<jh_x86_64::Jh256 as digest09::Digest>::digest(state)),
        _ => out.copy_from_slice(&skein::Skein512::<U32>::digest(state)),
    }
    out
}

/// Scratchpad byte offset selected by the low 64 bits of a block.
#[inline]
fn address(block: &[u8; AES_BLOCK_SIZE]) -> usize {
    (lo_u64(block) & ADDRESS_MASK) as usize
}

#[inline]
fn lo_u64(block: &[u8; AES_BLOCK_SIZE]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&block[..8]);
    u64::from_le_bytes(word)
}

#[inline]
fn hi_u64(block: &[u8; AES_BLOCK_SIZE]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&block[8..]);
    u64::from_le_bytes(word)
}

#[inline]
fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Ten plain AES rounds; no initial key whitening and no short final round.
fn pseudo_encrypt(block: &mut [u8], round_keys: &[[u8; 16]; 10]) {
    let block = Block::from_mut_slice(block);
    for key in round_keys {
        cipher_round(block, Block::from_slice(key));
    }
}

/// First ten round keys of the AES-256 key schedule for a 32-byte key.
fn expand_key(key: &[u8]) -> [[u8; 16]; 10] {
    let mut words = [[0u8; 4]; 40];
    for (word, chunk) in words.iter_mut().zip(key.chunks_exact(4)) {
        word.copy_from_slice(chunk);
    }

    let mut rcon: u8 = 0x01;
    for i in 8..40 {
        let mut temp = words[i - 1];
        if i % 8 == 0 {
            temp.rotate_left(1);
            temp = temp.map(sbox);
            temp[0] ^= rcon;
            rcon = gf_mul(rcon, 0x02);
        } else if i % 8 == 4 {
            temp = temp.map(sbox);
        }
        for k in 0..4 {
            words[i][k] = words[i - 8][k] ^ temp[k];
        }
    }

    let mut round_keys = [[0u8; 16]; 10];
    for (r, round_key) in round_keys.iter_mut().enumerate() {
        for w in 0..4 {
            round_key[4 * w..4 * w + 4].copy_from_slice(&words[4 * r + w]);
        }
    }
    round_keys
}

/// Multiplication in GF(2^8) modulo the AES polynomial.
fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

/// AES S-box: multiplicative inverse followed by the affine transform.
fn sbox(x: u8) -> u8 {
    // x^254 is the inverse in GF(2^8), with 0 mapping to 0
    let mut inverse = 1u8;
    let mut base = x;
    let mut exp = 254u32;
    while exp != 0 {
        if exp & 1 != 0 {
            inverse = gf_mul(inverse, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    if x == 0 {
        inverse = 0;
    }

    inverse
        ^ inverse.rotate_left(1)
        ^ inverse.rotate_left(2)
        ^ inverse.rotate_left(3)
        ^ inverse.rotate_left(4)
        ^ 0x63
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sbox_known_values() {
        assert_eq!(sbox(0x00), 0x63);
        assert_eq!(sbox(0x01), 0x7c);
        assert_eq!(sbox(0x53), 0xed);
        assert_eq!(sbox(0xff), 0x16);
    }

    #[test]
    fn test_key_expansion_fips197() {
        // FIPS-197 appendix A.3 AES-256 key schedule
        let key = hex::decode(
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
        )
        .unwrap();
        let round_keys = expand_key(&key);

        assert_eq!(hex::encode(round_keys[0]), "603deb1015ca71be2b73aef0857d7781");
        assert_eq!(hex::encode(round_keys[2]), "9ba354118e6925afa51a8b5f2067fcde");
        assert_eq!(hex::encode(round_keys[3]), "a8b09c1a93d194cdbe49846eb75d5b9a");
    }

    #[test]
    fn test_address_is_aligned_and_bounded() {
        let block = [0xffu8; 16];
        let offset = address(&block);
        assert_eq!(offset % AES_BLOCK_SIZE, 0);
        assert!(offset + AES_BLOCK_SIZE <= MEMORY);
    }

    #[test]
    fn test_reference_vector_this_is_a_test() {
        let hash = cryptonight(b"This is a test");
        assert_eq!(
            hex::encode(hash),
            "a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605"
        );
    }

    #[test]
    fn test_reference_vector_de_omnibus_dubitandum() {
        let hash = CryptoNight.evaluate(b"de omnibus dubitandum");
        assert_eq!(
            hex::encode(hash),
            "2f8e3df40bd11f9ac90c743ca8e32bb391da4fb98612aa3b6cdc639ee00b31f5"
        );
    }
}
