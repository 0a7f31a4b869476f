use crate::core::monetary::{
    BASE_MINING_REWARD, DEFAULT_DIFFICULTY, MAX_DIFFICULTY, REWARD_ASSET,
};
use crate::core::{CommitmentPolicy, FeeSchedule};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

const DIFFICULTY_KEY: &str = "AGT_DIFFICULTY";
const BASE_REWARD_KEY: &str = "AGT_BASE_REWARD";
const REWARD_ASSET_KEY: &str = "AGT_REWARD_ASSET";
const COMMITMENT_THRESHOLD_KEY: &str = "AGT_COMMITMENT_THRESHOLD";

/// `[chain]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// Leading zero hex digits required without a commitment
    pub difficulty: u32,
    pub base_reward: u64,
    pub reward_asset: String,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            base_reward: BASE_MINING_REWARD,
            reward_asset: REWARD_ASSET.to_string(),
        }
    }
}

/// Ledger settings, read from TOML with every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chain: ChainSettings,
    pub commitment: CommitmentPolicy,
    pub fees: FeeSchedule,
}

impl Settings {
    /// Read and validate a settings file. Environment overrides are not applied.
    pub fn load(path: &Path) -> Result<Settings> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml(&contents)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `AGT_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(DIFFICULTY_KEY) {
            self.chain.difficulty = parse_override(DIFFICULTY_KEY, &value)?;
        }
        if let Some(value) = lookup(BASE_REWARD_KEY) {
            self.chain.base_reward = parse_override(BASE_REWARD_KEY, &value)?;
        }
        if let Some(value) = lookup(REWARD_ASSET_KEY) {
            self.chain.reward_asset = value;
        }
        if let Some(value) = lookup(COMMITMENT_THRESHOLD_KEY) {
            self.commitment.threshold = parse_override(COMMITMENT_THRESHOLD_KEY, &value)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain.difficulty == 0 || self.chain.difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "Difficulty must be between 1 and {MAX_DIFFICULTY}, got {}",
                self.chain.difficulty
            )));
        }
        if self.chain.base_reward == 0 {
            return Err(BlockchainError::Config(
                "Base reward must be greater than zero".to_string(),
            ));
        }
        if self.chain.reward_asset.is_empty() {
            return Err(BlockchainError::Config(
                "Reward asset cannot be empty".to_string(),
            ));
        }
        self.commitment.validate()?;
        self.fees.validate()
    }
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BlockchainError::Config(format!("{key} has an invalid value: {value}")))
}
