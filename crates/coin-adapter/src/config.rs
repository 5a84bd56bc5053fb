//! Adapter configuration.
//!
//! Loaded from the pool's JSON config; every key is optional.
//!
//! ```json
//! {
//!   "reserve_size": 17,
//!   "payout": { "best_exchange": "xmrto" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use coin_core::coin::RESERVE_SIZE;
use coin_core::template::RESERVED_SIZE;
use coin_core::CoinParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exchange used for payouts when none is configured.
pub const DEFAULT_BEST_EXCHANGE: &str = "xmrto";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reserve_size {0} is smaller than the 16 bytes the pool partitions")]
    ReserveTooSmall(usize),
}

/// Payout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Exchange payouts are routed through.
    pub best_exchange: String,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        PayoutConfig {
            best_exchange: DEFAULT_BEST_EXCHANGE.into(),
        }
    }
}

/// Settings for a [`CoinAdapter`](crate::CoinAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Coin parameters; Intense Coin mainnet unless overridden.
    pub coin: CoinParams,
    /// Bytes requested from the daemon for the reserved region.
    pub reserve_size: usize,
    /// Payout settings.
    pub payout: PayoutConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            coin: CoinParams::intense_coin(),
            reserve_size: RESERVE_SIZE,
            payout: PayoutConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AdapterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that the settings can actually be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reserve_size < RESERVED_SIZE {
            return Err(ConfigError::ReserveTooSmall(self.reserve_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::from_json_str("{}").unwrap();
        assert_eq!(config.reserve_size, 17);
        assert_eq!(config.payout.best_exchange, "xmrto");
        assert_eq!(config.coin.symbol, "ITNS");
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config =
            AdapterConfig::from_json_str(r#"{"reserve_size": 24, "payout": {"best_exchange": "changelly"}}"#)
                .unwrap();
        assert_eq!(config.reserve_size, 24);
        assert_eq!(config.payout.best_exchange, "changelly");
    }

    #[test]
    fn test_reserve_too_small() {
        let err = AdapterConfig::from_json_str(r#"{"reserve_size": 15}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ReserveTooSmall(15)));
        assert!(AdapterConfig::from_json_str(r#"{"reserve_size": 16}"#).is_ok());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            AdapterConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AdapterConfig::from_file("/nonexistent/pool-config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("coin-adapter-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"payout": {"best_exchange": "shapeshift"}}"#).unwrap();
        let config = AdapterConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.payout.best_exchange, "shapeshift");
    }
}
