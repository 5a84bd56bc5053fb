//! Pool-facing adapter for the Intense Coin daemon and wallet.
//!
//! This crate provides:
//! - Async RPC contracts for the daemon and wallet, with normalized results
//! - Block template acquisition stamped with a per-process instance id
//! - Address checks and coin constants for the pool server
//! - Proof-of-work hashing on tokio's blocking pool

pub mod adapter;
pub mod config;
pub mod rpc;
pub mod state;

pub use adapter::{AdapterError, CoinAdapter};
pub use config::{AdapterConfig, ConfigError, PayoutConfig};
pub use rpc::{Endpoint, RpcClient, RpcError, TransportError};
pub use state::{Balance, BlockHeaderInfo};

/// Get the library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
