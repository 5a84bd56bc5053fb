//! CryptoNote block blob parsing and the transforms the pool applies to it.
//!
//! A block blob is `header || miner_tx || varint(n) || n * tx_hash`. Workers
//! hash a different arrangement of the same block, the hashing blob:
//! `header || tree_hash(miner_tx_hash, tx_hashes...) || varint(n + 1)`.

use thiserror::Error;

use crate::hash::{cn_fast_hash, HASH_SIZE};
use crate::merkle::tree_hash;
use crate::transaction::{parse_miner_transaction, MinerTransaction};
use crate::varint::{read_varint, write_varint, VarintError};

/// Size of the header nonce in bytes.
pub const NONCE_SIZE: usize = 4;

/// Block blob errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Blob ended early
    #[error("blob truncated at byte {at}: needed {needed} more bytes")]
    Truncated { at: usize, needed: usize },
    /// Malformed varint
    #[error("invalid varint at byte {at}: {source}")]
    Varint {
        at: usize,
        #[source]
        source: VarintError,
    },
    /// Miner transaction input other than a generation input
    #[error("unsupported miner transaction input tag {0:#04x}")]
    UnsupportedInput(u8),
    /// Output target type the parser does not know
    #[error("unsupported output target tag {0:#04x}")]
    UnsupportedOutput(u8),
    /// Miner transaction with no inputs
    #[error("miner transaction has no inputs")]
    NoInputs,
    /// Version 2 miner transaction with RingCT signatures
    #[error("miner transaction RingCT type must be null, got {0}")]
    UnexpectedRingCt(u8),
    /// Transaction count does not fit in memory
    #[error("transaction count {0} is implausible")]
    TransactionCount(u64),
    /// Bytes left over after the last transaction hash
    #[error("{0} trailing bytes after block")]
    TrailingBytes(usize),
}

/// Cursor over a blob that reports errors with byte positions.
pub(crate) struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        BlobReader { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Bytes between two earlier positions.
    pub(crate) fn span(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    pub(crate) fn varint(&mut self) -> Result<u64, BlockError> {
        let (value, read) = read_varint(&self.data[self.pos..]).map_err(|source| BlockError::Varint {
            at: self.pos,
            source,
        })?;
        self.pos += read;
        Ok(value)
    }

    pub(crate) fn byte(&mut self) -> Result<u8, BlockError> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], BlockError> {
        if self.remaining() < len {
            return Err(BlockError::Truncated {
                at: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], BlockError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }
}

/// A parsed block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Major (hard fork) version.
    pub major_version: u64,
    /// Minor version / vote.
    pub minor_version: u64,
    /// Block timestamp (Unix time).
    pub timestamp: u64,
    /// Id of the previous block.
    pub prev_id: [u8; HASH_SIZE],
    /// Proof-of-work nonce.
    pub nonce: u32,
    /// Byte offset of the nonce within the blob.
    pub nonce_offset: usize,
    /// Serialized header length.
    pub size: usize,
}

impl BlockHeader {
    fn read(reader: &mut BlobReader<'_>) -> Result<Self, BlockError> {
        let major_version = reader.varint()?;
        let minor_version = reader.varint()?;
        let timestamp = reader.varint()?;
        let prev_id = reader.array::<HASH_SIZE>()?;
        let nonce_offset = reader.position();
        let nonce = u32::from_le_bytes(reader.array::<NONCE_SIZE>()?);

        Ok(BlockHeader {
            major_version,
            minor_version,
            timestamp,
            prev_id,
            nonce,
            nonce_offset,
            size: reader.position(),
        })
    }

    /// Parse just the header at the start of a block blob.
    pub fn parse(blob: &[u8]) -> Result<Self, BlockError> {
        BlockHeader::read(&mut BlobReader::new(blob))
    }
}

/// A fully parsed block blob.
#[derive(Debug, Clone)]
pub struct Block {
    /// The header.
    pub header: BlockHeader,
    /// The miner (coinbase) transaction.
    pub miner_tx: MinerTransaction,
    /// Hashes of the non-miner transactions.
    pub tx_hashes: Vec<[u8; HASH_SIZE]>,
}

impl Block {
    /// Parse a complete block blob.
    pub fn parse(blob: &[u8]) -> Result<Self, BlockError> {
        let mut reader = BlobReader::new(blob);
        let header = BlockHeader::read(&mut reader)?;
        let miner_tx = parse_miner_transaction(&mut reader)?;

        let count = reader.varint()?;
        if count > (reader.remaining() / HASH_SIZE) as u64 {
            return Err(BlockError::TransactionCount(count));
        }
        let mut tx_hashes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            tx_hashes.push(reader.array::<HASH_SIZE>()?);
        }

        if reader.remaining() > 0 {
            return Err(BlockError::TrailingBytes(reader.remaining()));
        }

        Ok(Block {
            header,
            miner_tx,
            tx_hashes,
        })
    }

    /// Tree hash over the miner transaction and every other transaction.
    pub fn transactions_root(&self) -> [u8; HASH_SIZE] {
        let mut hashes = Vec::with_capacity(self.tx_hashes.len() + 1);
        hashes.push(self.miner_tx.hash);
        hashes.extend_from_slice(&self.tx_hashes);
        tree_hash(&hashes)
    }

    /// Build the hashing blob, given the blob this block was parsed from.
    fn hashing_blob(&self, blob: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.size + HASH_SIZE + 10);
        out.extend_from_slice(&blob[..self.header.size]);
        out.extend_from_slice(&self.transactions_root());
        write_varint(self.tx_hashes.len() as u64 + 1, &mut out);
        out
    }
}

/// Convert a block blob into the blob proof-of-work is computed over.
pub fn convert_blob(blob: &[u8]) -> Result<Vec<u8>, BlockError> {
    let block = Block::parse(blob)?;
    Ok(block.hashing_blob(blob))
}

/// Copy a block blob with its header nonce replaced.
///
/// This turns a template plus a worker's winning nonce into a submittable block.
pub fn construct_block_blob(blob: &[u8], nonce: &[u8; NONCE_SIZE]) -> Result<Vec<u8>, BlockError> {
    let block = Block::parse(blob)?;
    let offset = block.header.nonce_offset;

    let mut out = blob.to_vec();
    out[offset..offset + NONCE_SIZE].copy_from_slice(nonce);
    Ok(out)
}

/// Block id: the fast hash of the length-prefixed hashing blob.
pub fn get_block_id(blob: &[u8]) -> Result<[u8; HASH_SIZE], BlockError> {
    let hashing_blob = convert_blob(blob)?;
    let mut data = Vec::with_capacity(hashing_blob.len() + 10);
    write_varint(hashing_blob.len() as u64, &mut data);
    data.extend_from_slice(&hashing_blob);
    Ok(cn_fast_hash(&data))
}
