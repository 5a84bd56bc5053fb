//! Intense Coin parameters and constants.

use serde::{Deserialize, Serialize};

/// Per-coin parameters consulted by address checks and the pool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinParams {
    /// Ticker symbol.
    pub symbol: String,
    /// Varint tag that every standard wallet address carries.
    pub address_prefix: u64,
    /// Tag of integrated addresses, if the coin supports them.
    pub integrated_address_prefix: Option<u64>,
    /// Coin developer donation address.
    pub coin_dev_address: String,
    /// Pool developer donation address.
    pub pool_dev_address: String,
    /// Exchange wallets; logins with these must carry a payment id.
    pub exchange_addresses: Vec<String>,
    /// Whether payouts can be routed through an exchange automatically.
    pub supports_auto_exchange: bool,
    /// Starting difficulty for NiceHash connections.
    pub nice_hash_diff: u64,
}

impl CoinParams {
    /// Parameters for Intense Coin mainnet.
    pub fn intense_coin() -> Self {
        CoinParams {
            symbol: "ITNS".into(),
            address_prefix: ITNS_ADDRESS_PREFIX,
            integrated_address_prefix: None,
            coin_dev_address: "iz5w5LGYQY2SseEd9BTaF8SRqFmZLTEVDBEGidvzYnZBcc9RMEHXs2rXBZfAvXQPPc85NR2JeZcQUj7jjBcgw26b1Rk6m4H2z".into(),
            pool_dev_address: "iz5imhe9C7vWnjZtZBFtT8MwNxVuJuryUUHXSAtnWUo93CJzNdZBizHQExPRCHUBi36tk2BcigPAFRDA4cnddGXF1R6j69n3w".into(),
            exchange_addresses: vec![
                // stocks.exchange
                "iz4pcDLxmo7KqbFmYjE5aGDv68U9Sgm1ePFjWUY24vzyPeGMcoG894MAFjrtHbaMv1TygTcvJWzGN3zNR6PeEYuc1w8V2tiMW".into(),
            ],
            supports_auto_exchange: false,
            nice_hash_diff: 400_000,
        }
    }

    /// Addresses miners may not log in with.
    pub fn blocked_addresses(&self) -> [&str; 2] {
        [self.coin_dev_address.as_str(), self.pool_dev_address.as_str()]
    }

    /// Whether `address` is on the blocked list.
    pub fn is_blocked_address(&self, address: &str) -> bool {
        self.blocked_addresses().contains(&address.trim())
    }

    /// Whether logins with `address` must supply a payment id.
    pub fn requires_payment_id(&self, address: &str) -> bool {
        let address = address.trim();
        self.exchange_addresses.iter().any(|a| a == address)
    }
}

impl Default for CoinParams {
    fn default() -> Self {
        CoinParams::intense_coin()
    }
}

/// Intense Coin standard address prefix ("iz...").
pub const ITNS_ADDRESS_PREFIX: u64 = 251;

/// Bytes requested from the daemon for the pool's reserved region.
pub const RESERVE_SIZE: usize = 17;
