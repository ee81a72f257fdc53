//! Ledger configuration.

use crate::mempool::DEFAULT_MAX_PENDING;
use sealchain_consensus::MAX_DIFFICULTY;
use sealchain_core::Amount;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("difficulty {0} exceeds the maximum of 64")]
    DifficultyTooHigh(u32),

    #[error("max_pending must be at least 1")]
    ZeroCapacity,

    #[error("mining reward {0} is negative")]
    NegativeReward(Amount),
}

/// Per-ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Required leading zero hex digits in every block hash.
    pub difficulty: u32,
    /// Reward paid to the miner named in a rewarding seal.
    pub mining_reward: Option<Amount>,
    /// Maximum number of pending transactions.
    pub max_pending: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            mining_reward: None,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl LedgerConfig {
    /// Default configuration at the given difficulty.
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh(self.difficulty));
        }
        if self.max_pending == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if let Some(reward) = self.mining_reward.filter(|reward| reward.is_negative()) {
            return Err(ConfigError::NegativeReward(reward));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.mining_reward, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(r#"{ "difficulty": 3, "mining_reward": "12.5" }"#);
        let config = LedgerConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.difficulty, 3);
        assert_eq!(config.mining_reward, Some(Amount::parse("12.5").unwrap()));
        assert_eq!(config.max_pending, DEFAULT_MAX_PENDING);
    }

    #[test]
    fn test_reject_excessive_difficulty() {
        let file = write_config(r#"{ "difficulty": 65 }"#);
        assert!(matches!(
            LedgerConfig::from_json_file(file.path()),
            Err(ConfigError::DifficultyTooHigh(65))
        ));
    }

    #[test]
    fn test_reject_zero_capacity() {
        let config = LedgerConfig {
            max_pending: 0,
            ..LedgerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn test_reject_negative_reward() {
        let file = write_config(r#"{ "mining_reward": "-5" }"#);
        let err = LedgerConfig::from_json_file(file.path()).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::NegativeReward(reward) if reward == Amount::parse("-5").unwrap()
        ));
        assert_eq!(err.to_string(), "mining reward -5 is negative");
    }

    #[test]
    fn test_zero_reward_is_allowed() {
        let config = LedgerConfig {
            mining_reward: Some(Amount::parse("0").unwrap()),
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("difficulty = 3");
        assert!(matches!(
            LedgerConfig::from_json_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            LedgerConfig::from_json_file("/nonexistent/sealchain.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
