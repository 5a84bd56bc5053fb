//! Core Intense Coin mining logic for the pool adapter.
//!
//! This crate provides pure Rust implementations of:
//! - CryptoNote address decoding and prefix validation
//! - Block blob parsing, hashing-blob conversion and nonce stamping
//! - Block templates with a partitioned reserved nonce region
//! - CryptoNight proof-of-work hashing
//! - Difficulty target conversion and comparison

pub mod address;
pub mod block;
pub mod coin;
pub mod cryptonight;
pub mod difficulty;
pub mod hash;
pub mod merkle;
pub mod template;
pub mod transaction;
pub mod varint;

pub use address::{decode_address, is_integrated_address, validate_address, AddressError, DecodedAddress};
pub use block::{construct_block_blob, convert_blob, get_block_id, Block, BlockError, BlockHeader};
pub use coin::CoinParams;
pub use cryptonight::{cryptonight, CryptoNight, HashEngine};
pub use difficulty::{base_diff, hash_meets_difficulty};
pub use hash::cn_fast_hash;
pub use template::{BlockTemplate, InstanceId, RawBlockTemplate, TemplateError};
