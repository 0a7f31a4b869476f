use crate::core::monetary::{
    COMMITMENT_REFERENCE_UNIT, COMMITMENT_REFERENCE_YEARS, COMMITMENT_THRESHOLD,
};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Rules turning a miner's commitment into mining power and a reward bonus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitmentPolicy {
    /// Smallest accepted commitment; also the amount worth a power of 1
    pub threshold: u64,
    /// Years-equivalent per unit of power
    pub reference_unit: f64,
    /// Years-equivalent at which the reward bonus reaches 100%
    pub reference_years: f64,
}

impl Default for CommitmentPolicy {
    fn default() -> Self {
        Self {
            threshold: COMMITMENT_THRESHOLD,
            reference_unit: COMMITMENT_REFERENCE_UNIT,
            reference_years: COMMITMENT_REFERENCE_YEARS,
        }
    }
}

/// Commitment record sealed into a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Commitment {
    amount: u64,
    power: f64,
    years: f64,
}

impl Commitment {
    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_power(&self) -> f64 {
        self.power
    }

    pub fn get_years(&self) -> f64 {
        self.years
    }
}

impl CommitmentPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(BlockchainError::Config(
                "Commitment threshold cannot be zero".to_string(),
            ));
        }
        if !(self.reference_unit.is_finite() && self.reference_unit > 0.0) {
            return Err(BlockchainError::Config(format!(
                "Commitment reference unit must be positive, got {}",
                self.reference_unit
            )));
        }
        if !(self.reference_years.is_finite() && self.reference_years > 0.0) {
            return Err(BlockchainError::Config(format!(
                "Commitment reference years must be positive, got {}",
                self.reference_years
            )));
        }
        Ok(())
    }

    /// `Ok(None)` for no commitment, the derived record when the amount meets the
    /// threshold, `InsufficientCommitment` otherwise.
    pub fn evaluate(&self, amount: u64) -> Result<Option<Commitment>> {
        if amount == 0 {
            return Ok(None);
        }
        if amount < self.threshold {
            return Err(BlockchainError::InsufficientCommitment {
                provided: amount,
                minimum: self.threshold,
            });
        }

        let power = amount as f64 / self.threshold as f64;
        Ok(Some(Commitment {
            amount,
            power,
            years: power * self.reference_unit,
        }))
    }

    /// `max(1, floor(base / power))`; never above `base`
    pub fn effective_difficulty(base_difficulty: u32, commitment: Option<&Commitment>) -> u32 {
        let power = commitment.map_or(1.0, |c| c.power.max(1.0));
        let scaled = (base_difficulty as f64 / power).floor() as u32;
        scaled.clamp(1, base_difficulty.max(1))
    }

    /// `floor(base × (1 + log10(years + 1) / log10(reference_years + 1)))`
    pub fn reward(&self, base_reward: u64, commitment: Option<&Commitment>) -> u64 {
        match commitment {
            None => base_reward,
            Some(c) => {
                let bonus = (c.years + 1.0).log10() / (self.reference_years + 1.0).log10();
                (base_reward as f64 * (1.0 + bonus)).floor() as u64
            }
        }
    }
}
