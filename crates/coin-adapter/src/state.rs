//! Normalized shapes of daemon and wallet RPC results.

use serde::{Deserialize, Serialize};

/// A block header as reported by the daemon.
///
/// `height`, `hash` and `reward` are required; the rest default, so headers
/// from daemons that omit them still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderInfo {
    /// Block major version.
    #[serde(default)]
    pub major_version: u64,
    /// Block minor version.
    #[serde(default)]
    pub minor_version: u64,
    /// Block timestamp (seconds since epoch).
    #[serde(default)]
    pub timestamp: u64,
    /// Previous block id (hex).
    #[serde(default)]
    pub prev_hash: String,
    /// Header nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Whether the block is on a side chain.
    #[serde(default)]
    pub orphan_status: bool,
    /// Block height.
    pub height: u64,
    /// Blocks mined on top of this one.
    #[serde(default)]
    pub depth: u64,
    /// Block id (hex).
    pub hash: String,
    /// Network difficulty at this block.
    #[serde(default)]
    pub difficulty: u64,
    /// Block reward in atomic units.
    pub reward: u64,
}

/// Pool wallet balance in the shape the payment processor expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Total balance.
    pub balance: u64,
    /// Spendable part of the balance.
    pub unlocked_balance: u64,
}

/// `getBalance` result as the wallet sends it.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WalletBalance {
    #[serde(rename = "lockedAmount")]
    pub locked_amount: u64,
    #[serde(rename = "availableBalance")]
    pub available_balance: u64,
}

impl From<WalletBalance> for Balance {
    fn from(wallet: WalletBalance) -> Self {
        Balance {
            balance: wallet.locked_amount,
            unlocked_balance: wallet.available_balance,
        }
    }
}

/// `getStatus` result as the wallet sends it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WalletStatus {
    /// Height of the wallet's view of the chain.
    #[serde(rename = "blockCount")]
    pub block_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_balance_from_wallet_fields() {
        let wallet: WalletBalance =
            serde_json::from_value(json!({"lockedAmount": 5, "availableBalance": 3})).unwrap();
        let balance = Balance::from(wallet);

        assert_eq!(balance.balance, 5);
        assert_eq!(balance.unlocked_balance, 3);
        assert_eq!(
            serde_json::to_value(balance).unwrap(),
            json!({"balance": 5, "unlocked_balance": 3})
        );
    }

    #[test]
    fn test_header_tolerates_missing_optional_fields() {
        let header: BlockHeaderInfo = serde_json::from_value(
            json!({"height": 12, "hash": "ab", "reward": 900, "extra_field": true}),
        )
        .unwrap();
        assert_eq!(header.height, 12);
        assert_eq!(header.hash, "ab");
        assert_eq!(header.reward, 900);
        assert_eq!(header.depth, 0);
        assert!(!header.orphan_status);
    }

    #[test]
    fn test_header_requires_identity_fields() {
        assert!(serde_json::from_value::<BlockHeaderInfo>(json!({})).is_err());
        assert!(serde_json::from_value::<BlockHeaderInfo>(json!({"height": 1, "hash": "ab"})).is_err());
    }

    #[test]
    fn test_balance_requires_both_amounts() {
        assert!(serde_json::from_value::<WalletBalance>(json!({"status": "busy"})).is_err());
        assert!(serde_json::from_value::<WalletBalance>(json!({"lockedAmount": 5})).is_err());
    }

    #[test]
    fn test_status_requires_block_count() {
        assert!(serde_json::from_value::<WalletStatus>(json!({})).is_err());
        let status: WalletStatus = serde_json::from_value(json!({"blockCount": 77})).unwrap();
        assert_eq!(status.block_count, 77);
    }
}
