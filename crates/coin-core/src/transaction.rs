//! Miner (coinbase) transaction parsing and hashing.
//!
//! The pool never builds the miner transaction itself; the daemon does, and
//! the pool only needs its hash to recompute the tree root after touching the
//! reserved bytes in `extra`.

use crate::block::{BlobReader, BlockError};
use crate::hash::{cn_fast_hash, HASH_SIZE};

/// Input tag of a generation (coinbase) input.
const TXIN_GEN: u8 = 0xff;

/// Output target tags.
const TXOUT_TO_KEY: u8 = 0x02;
const TXOUT_TO_TAGGED_KEY: u8 = 0x03;

/// RingCT type carried by version 2 miner transactions.
const RCT_TYPE_NULL: u8 = 0;

/// A miner transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Output amount in atomic units.
    pub amount: u64,
    /// One-time output public key.
    pub key: [u8; 32],
    /// View tag, present on tagged-key outputs.
    pub view_tag: Option<u8>,
}

/// A parsed miner transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerTransaction {
    /// Transaction format version (1 or 2).
    pub version: u64,
    /// Height before which outputs are locked.
    pub unlock_time: u64,
    /// Block height from the generation input.
    pub height: u64,
    /// Outputs paying the block reward.
    pub outputs: Vec<TxOutput>,
    /// Raw extra field (tx public key, nonce field, ...).
    pub extra: Vec<u8>,
    /// Transaction hash.
    pub hash: [u8; HASH_SIZE],
}

impl MinerTransaction {
    /// Total reward paid by the outputs.
    pub fn reward(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }
}

/// Parse the miner transaction at the reader's position.
pub(crate) fn parse_miner_transaction(
    reader: &mut BlobReader<'_>,
) -> Result<MinerTransaction, BlockError> {
    let start = reader.position();

    let version = reader.varint()?;
    let unlock_time = reader.varint()?;

    let input_count = reader.varint()?;
    if input_count == 0 {
        return Err(BlockError::NoInputs);
    }
    let mut height = 0;
    for _ in 0..input_count {
        match reader.byte()? {
            TXIN_GEN => height = reader.varint()?,
            tag => return Err(BlockError::UnsupportedInput(tag)),
        }
    }

    let output_count = reader.varint()?;
    let mut outputs = Vec::new();
    for _ in 0..output_count {
        let amount = reader.varint()?;
        let output = match reader.byte()? {
            TXOUT_TO_KEY => TxOutput {
                amount,
                key: reader.array::<32>()?,
                view_tag: None,
            },
            TXOUT_TO_TAGGED_KEY => TxOutput {
                amount,
                key: reader.array::<32>()?,
                view_tag: Some(reader.byte()?),
            },
            tag => return Err(BlockError::UnsupportedOutput(tag)),
        };
        outputs.push(output);
    }

    let extra_len = reader.varint()?;
    let extra = reader.bytes(extra_len.min(usize::MAX as u64) as usize)?.to_vec();
    let prefix = reader.span(start, reader.position());

    let hash = if version >= 2 {
        let rct_start = reader.position();
        let rct_type = reader.byte()?;
        if rct_type != RCT_TYPE_NULL {
            return Err(BlockError::UnexpectedRingCt(rct_type));
        }
        let rct_base = reader.span(rct_start, reader.position());

        // hash(prefix_hash || rct_base_hash || prunable_hash); a null RingCT
        // section has nothing prunable, so its hash is all zeros
        let mut hashes = [0u8; 3 * HASH_SIZE];
        hashes[..HASH_SIZE].copy_from_slice(&cn_fast_hash(prefix));
        hashes[HASH_SIZE..2 * HASH_SIZE].copy_from_slice(&cn_fast_hash(rct_base));
        cn_fast_hash(&hashes)
    } else {
        cn_fast_hash(prefix)
    };

    Ok(MinerTransaction {
        version,
        unlock_time,
        height,
        outputs,
        extra,
        hash,
    })
}
