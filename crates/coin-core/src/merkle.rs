//! CryptoNote tree hash over a block's transaction hashes.

use crate::hash::hash_pair;

/// Compute the tree hash (merkle root) of a list of transaction hashes.
///
/// The first hash is the miner transaction. Unlike Bitcoin's merkle tree, an
/// odd leaf count is not handled by duplication: the tree is squeezed to the
/// largest power of two below the count by pairing only the trailing leaves.
pub fn tree_hash(hashes: &[[u8; 32]]) -> [u8; 32] {
    match hashes.len() {
        0 => [0u8; 32],
        1 => hashes[0],
        2 => hash_pair(&hashes[0], &hashes[1]),
        count => {
            let mut cnt = tree_hash_cnt(count);
            let mut level: Vec<[u8; 32]> = Vec::with_capacity(cnt);

            // Leaves that survive the first squeeze untouched
            let untouched = 2 * cnt - count;
            level.extend_from_slice(&hashes[..untouched]);
            for pair in hashes[untouched..].chunks_exact(2) {
                level.push(hash_pair(&pair[0], &pair[1]));
            }

            while cnt > 2 {
                cnt >>= 1;
                for j in 0..cnt {
                    level[j] = hash_pair(&level[2 * j], &level[2 * j + 1]);
                }
            }

            hash_pair(&level[0], &level[1])
        }
    }
}

/// Largest power of two strictly below `count` (for `count >= 3`).
fn tree_hash_cnt(count: usize) -> usize {
    let mut pow = 2;
    while pow < count {
        pow <<= 1;
    }
    pow >> 1
}
