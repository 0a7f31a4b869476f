//! Transaction fee calculation
//!
//! Fees scale with the serialized size of a transaction and a priority
//! multiplier, with a floor so that tiny transactions still pay something:
//!
//! `fee = max(min_fee, size_bytes / 1024 × multiplier × base_fee_rate)`
//!
//! The fee is fixed when a transaction is built, because it is part of the
//! content hash the sender signs.

use crate::core::monetary::{BASE_FEE_RATE, DEFAULT_FEE_ASSET, MIN_TRANSACTION_FEE};
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

const FEE_SIZE_UNIT: u64 = 1024;

/// Priority levels for transaction fees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    #[default]
    Normal,
    High,
    Critical,
}

impl FeePriority {
    pub fn multiplier(&self) -> u64 {
        match self {
            FeePriority::Normal => 1,
            FeePriority::High => 2,
            FeePriority::Critical => 5,
        }
    }
}

impl std::fmt::Display for FeePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeePriority::Normal => write!(f, "normal"),
            FeePriority::High => write!(f, "high"),
            FeePriority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for FeePriority {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(FeePriority::Normal),
            "high" => Ok(FeePriority::High),
            "critical" => Ok(FeePriority::Critical),
            _ => Err(BlockchainError::Config(format!(
                "Invalid priority: {s}. Valid options: normal, high, critical"
            ))),
        }
    }
}

/// Fee parameters of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Floor applied to every computed fee
    pub min_fee: u64,
    /// Fee per 1024 bytes at normal priority
    pub base_fee_rate: u64,
    /// Asset fees are paid in when the sender does not choose one
    pub default_fee_asset: String,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            min_fee: MIN_TRANSACTION_FEE,
            base_fee_rate: BASE_FEE_RATE,
            default_fee_asset: DEFAULT_FEE_ASSET.to_string(),
        }
    }
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<()> {
        if self.default_fee_asset.is_empty() {
            return Err(BlockchainError::Config(
                "Default fee asset cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn calculate_fee(&self, transaction_size: usize, priority: FeePriority) -> u64 {
        let scaled = (transaction_size as u64)
            .saturating_mul(priority.multiplier())
            .saturating_mul(self.base_fee_rate)
            / FEE_SIZE_UNIT;
        scaled.max(self.min_fee)
    }

    /// Whether `fee` covers what a transaction of this size owes at normal priority
    pub fn is_sufficient(&self, fee: u64, transaction_size: usize) -> bool {
        fee >= self.calculate_fee(transaction_size, FeePriority::Normal)
    }

    /// Sum of fees paid in `fee_asset` by the non-reward transactions
    pub fn calculate_total_fees<'a, I>(transactions: I, fee_asset: &str) -> u64
    where
        I: Iterator<Item = &'a Transaction>,
    {
        transactions
            .filter(|tx| !tx.is_reward() && tx.get_fee_asset() == fee_asset)
            .map(|tx| tx.get_fee())
            .fold(0u64, |total, fee| total.saturating_add(fee))
    }
}
