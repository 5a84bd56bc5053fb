//! Block templates shared by many independent nonce searchers.
//!
//! The daemon leaves a reserved region in the miner transaction's extra field.
//! The pool splits its first 16 bytes into four big-endian 32-bit fields:
//!
//! ```text
//! reserved_offset
//! |  +0..+4       |  +4..+8     |  +8..+12            |  +12..+16       |
//! |  extra nonce  |  instance   |  client pool nonce  |  client nonce   |
//! ```
//!
//! The extra nonce is bumped by this template for every blob it hands out,
//! the instance id is unique per pool process, and the last two fields belong
//! to downstream pool tiers and their clients. A single template can thus be
//! searched by 2^32 pool instances, each with 2^32 sub-pools of 2^32 clients.

use core::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::block::{convert_blob, BlockError};
use crate::hash::HASH_SIZE;

/// Offset of the previous block id within a template blob.
pub const PREV_HASH_OFFSET: usize = 7;

/// Size of the pool-owned part of the reserved region.
pub const RESERVED_SIZE: usize = 16;

const EXTRA_NONCE_OFFSET: usize = 0;
const INSTANCE_ID_OFFSET: usize = 4;
const CLIENT_POOL_OFFSET: usize = 8;
const CLIENT_NONCE_OFFSET: usize = 12;

/// Bytes a template must hold after the reserved region starts.
const MIN_TAIL: usize = RESERVED_SIZE + HASH_SIZE;

/// A 4-byte tag that keeps one pool process's nonces apart from another's.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId([u8; 4]);

impl InstanceId {
    /// Wrap raw bytes. Callers generate these from a secure random source.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        InstanceId(bytes)
    }

    /// The raw tag.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", hex::encode(self.0))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Template construction and blob errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The blob is not valid hex
    #[error("template blob is not valid hex: {0}")]
    InvalidHex(String),
    /// The blob cannot hold the reserved region and what must follow it
    #[error("template blob is {len} bytes, need at least {required} for reserved offset {reserved_offset}")]
    TooShort {
        len: usize,
        required: usize,
        reserved_offset: usize,
    },
    /// The reserved region would overwrite the block header
    #[error("reserved offset {0} overlaps the block header")]
    ReservedOverlapsHeader(usize),
    /// The getblocktemplate result is missing fields
    #[error("malformed getblocktemplate result: {0}")]
    Malformed(String),
    /// Every extra nonce value of this template has been handed out
    #[error("extra nonce exhausted; fetch a new template")]
    ExtraNonceExhausted,
    /// The blob could not be converted for hashing
    #[error(transparent)]
    Block(#[from] BlockError),
}

/// The fields of a daemon `getblocktemplate` result the pool relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBlockTemplate {
    /// Hex-encoded block blob.
    pub blocktemplate_blob: String,
    /// Network difficulty for this block.
    pub difficulty: u64,
    /// Height of the block being mined.
    pub height: u64,
    /// Offset of the reserved region inside the blob.
    pub reserved_offset: usize,
}

/// One daemon-issued mining job and the nonce state layered on top of it.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    raw_blob: String,
    buffer: Vec<u8>,
    difficulty: u64,
    height: u64,
    reserve_offset: usize,
    previous_hash: [u8; HASH_SIZE],
    extra_nonce: u32,
}

impl BlockTemplate {
    /// Take ownership of a daemon template and stamp this process's instance id.
    pub fn new(raw: RawBlockTemplate, instance_id: InstanceId) -> Result<Self, TemplateError> {
        let mut buffer = hex::decode(&raw.blocktemplate_blob)
            .map_err(|e| TemplateError::InvalidHex(e.to_string()))?;

        let reserve_offset = raw.reserved_offset;
        if reserve_offset < PREV_HASH_OFFSET + HASH_SIZE {
            return Err(TemplateError::ReservedOverlapsHeader(reserve_offset));
        }

        let required = reserve_offset.saturating_add(MIN_TAIL);
        if buffer.len() < required {
            return Err(TemplateError::TooShort {
                len: buffer.len(),
                required,
                reserved_offset: reserve_offset,
            });
        }

        let mut previous_hash = [0u8; HASH_SIZE];
        previous_hash.copy_from_slice(&buffer[PREV_HASH_OFFSET..PREV_HASH_OFFSET + HASH_SIZE]);

        let at = reserve_offset + INSTANCE_ID_OFFSET;
        buffer[at..at + 4].copy_from_slice(instance_id.as_bytes());

        debug!(
            height = raw.height,
            difficulty = raw.difficulty,
            reserve_offset,
            %instance_id,
            "new block template"
        );

        Ok(BlockTemplate {
            raw_blob: raw.blocktemplate_blob,
            buffer,
            difficulty: raw.difficulty,
            height: raw.height,
            reserve_offset,
            previous_hash,
            extra_nonce: 0,
        })
    }

    /// Build a template from the `result` object of a `getblocktemplate` call.
    pub fn from_rpc_result(result: &Value, instance_id: InstanceId) -> Result<Self, TemplateError> {
        let raw = RawBlockTemplate::deserialize(result)
            .map_err(|e| TemplateError::Malformed(e.to_string()))?;
        BlockTemplate::new(raw, instance_id)
    }

    /// Stamp the next extra nonce and return the hashing blob as hex.
    ///
    /// Each call hands out a new nonce; callers that need a blob again must
    /// keep the returned string. A blob that fails to convert leaves the
    /// template as it was.
    pub fn next_blob(&mut self) -> Result<String, TemplateError> {
        let at = self.reserve_offset + EXTRA_NONCE_OFFSET;
        let (previous, previous_bytes) = (self.extra_nonce, self.buffer[at..at + 4].to_vec());

        self.bump_extra_nonce()?;
        match convert_blob(&self.buffer) {
            Ok(hashing_blob) => Ok(hex::encode(hashing_blob)),
            Err(e) => {
                self.extra_nonce = previous;
                self.buffer[at..at + 4].copy_from_slice(&previous_bytes);
                Err(e.into())
            }
        }
    }

    /// Stamp the next extra nonce and return the full block blob as hex.
    ///
    /// Used by downstream pool tiers, which fill in their own nonce fields
    /// and submit the raw block.
    pub fn next_blob_with_child_nonce(&mut self) -> Result<String, TemplateError> {
        self.bump_extra_nonce()?;
        Ok(hex::encode(&self.buffer))
    }

    fn bump_extra_nonce(&mut self) -> Result<(), TemplateError> {
        let next = self
            .extra_nonce
            .checked_add(1)
            .ok_or(TemplateError::ExtraNonceExhausted)?;
        self.extra_nonce = next;

        let at = self.reserve_offset + EXTRA_NONCE_OFFSET;
        self.buffer[at..at + 4].copy_from_slice(&next.to_be_bytes());
        Ok(())
    }

    /// The blob exactly as the daemon sent it.
    pub fn raw_blob(&self) -> &str {
        &self.raw_blob
    }

    /// Current template bytes, including the latest extra nonce.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Network difficulty from the daemon.
    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// Height of the block being mined.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Start of the reserved region.
    pub fn reserve_offset(&self) -> usize {
        self.reserve_offset
    }

    /// Previous block id, used to tell templates apart.
    pub fn previous_hash(&self) -> &[u8; HASH_SIZE] {
        &self.previous_hash
    }

    /// The last extra nonce written (0 before the first blob).
    pub fn extra_nonce(&self) -> u32 {
        self.extra_nonce
    }

    /// Absolute offset of the field a multi-server pool tier fills in.
    pub fn client_pool_location(&self) -> usize {
        self.reserve_offset + CLIENT_POOL_OFFSET
    }

    /// Absolute offset of the field a worker dispatcher fills per client.
    pub fn client_nonce_location(&self) -> usize {
        self.reserve_offset + CLIENT_NONCE_OFFSET
    }

    /// Instance id bytes as stamped in the buffer.
    pub fn instance_id(&self) -> InstanceId {
        let at = self.reserve_offset + INSTANCE_ID_OFFSET;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buffer[at..at + 4]);
        InstanceId(bytes)
    }

    #[cfg(test)]
    fn set_extra_nonce(&mut self, value: u32) {
        self.extra_nonce = value;
    }
}
