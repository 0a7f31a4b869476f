//! Block production
//!
//! The engine turns a snapshot of pending transactions into a sealed block:
//! it re-checks every transaction, resolves the miner's commitment into an
//! effective difficulty and a reward, appends the reward transaction and runs
//! the nonce search. It never touches chain state; appending is the caller's job.

use crate::core::{
    Block, CancellationToken, Commitment, CommitmentPolicy, FeeSchedule, Transaction,
};
use crate::error::{BlockchainError, Result};
use crate::utils::Clock;
use crate::wallet::short_address;
use log::{info, warn};
use std::sync::Arc;

/// What a successful mining call produced
#[derive(Debug, Clone)]
pub struct MiningReport {
    pub block: Block,
    pub effective_difficulty: u32,
    pub reward: u64,
    /// Set when a positive commitment was below the threshold and mining went ahead without it
    pub commitment_error: Option<BlockchainError>,
    /// Content hashes of snapshot transactions that failed re-validation and were left out
    pub skipped: Vec<String>,
}

impl MiningReport {
    pub fn get_commitment(&self) -> Option<&Commitment> {
        self.block.get_commitment()
    }
}

#[derive(Debug, Clone)]
pub enum MiningOutcome {
    Sealed(MiningReport),
    Cancelled,
}

impl MiningOutcome {
    pub fn is_sealed(&self) -> bool {
        matches!(self, MiningOutcome::Sealed(_))
    }

    pub fn into_report(self) -> Option<MiningReport> {
        match self {
            MiningOutcome::Sealed(report) => Some(report),
            MiningOutcome::Cancelled => None,
        }
    }
}

pub struct MiningEngine {
    base_difficulty: u32,
    base_reward: u64,
    reward_asset: String,
    policy: CommitmentPolicy,
    fee_asset: String,
    clock: Arc<dyn Clock>,
}

impl MiningEngine {
    pub fn new(
        base_difficulty: u32,
        base_reward: u64,
        reward_asset: &str,
        policy: CommitmentPolicy,
        fees: &FeeSchedule,
        clock: Arc<dyn Clock>,
    ) -> MiningEngine {
        MiningEngine {
            base_difficulty,
            base_reward,
            reward_asset: reward_asset.to_string(),
            policy,
            fee_asset: fees.default_fee_asset.clone(),
            clock,
        }
    }

    /// Resolve a raw commitment. Below-threshold values fall back to no commitment,
    /// and the error is handed back alongside.
    pub fn resolve_commitment(&self, amount: u64) -> (Option<Commitment>, Option<BlockchainError>) {
        match self.policy.evaluate(amount) {
            Ok(commitment) => (commitment, None),
            Err(e) => {
                warn!("{e}; mining without a commitment");
                (None, Some(e))
            }
        }
    }

    pub fn effective_difficulty(&self, commitment: Option<&Commitment>) -> u32 {
        CommitmentPolicy::effective_difficulty(self.base_difficulty, commitment)
    }

    pub fn reward(&self, commitment: Option<&Commitment>) -> u64 {
        self.policy.reward(self.base_reward, commitment)
    }

    /// Seal `transactions` on top of `previous_hash`, paying the reward to `miner_address`.
    pub fn mine(
        &self,
        previous_hash: &str,
        transactions: Vec<Transaction>,
        miner_address: &str,
        commitment: u64,
        cancel: &CancellationToken,
    ) -> Result<MiningOutcome> {
        let (commitment, commitment_error) = self.resolve_commitment(commitment);
        let effective_difficulty = self.effective_difficulty(commitment.as_ref());
        let reward = self.reward(commitment.as_ref());

        let mut skipped = Vec::new();
        let mut included = Vec::with_capacity(transactions.len() + 1);
        for tx in transactions {
            if tx.is_reward() || !tx.verify_hash() || !tx.is_valid() {
                warn!("Leaving out transaction {} that failed re-validation", tx.get_hash());
                skipped.push(tx.get_hash().to_string());
                continue;
            }
            included.push(tx);
        }

        let fees = FeeSchedule::calculate_total_fees(included.iter(), &self.fee_asset);
        info!(
            "Mining {} transactions for {} (difficulty {effective_difficulty}, reward {reward} {}, fees {fees} {})",
            included.len(),
            short_address(miner_address),
            self.reward_asset,
            self.fee_asset
        );

        let timestamp = self.clock.now_millis()?;
        included.push(Transaction::new_reward(
            miner_address,
            reward,
            &self.reward_asset,
            timestamp,
            commitment.as_ref().map(Commitment::get_amount),
        )?);

        let draft = Block::new_draft(
            previous_hash.to_string(),
            timestamp,
            included,
            commitment,
            effective_difficulty,
            reward,
        )?;

        match draft.mine(cancel)? {
            Some(block) => Ok(MiningOutcome::Sealed(MiningReport {
                block,
                effective_difficulty,
                reward,
                commitment_error,
                skipped,
            })),
            None => {
                info!("Mining cancelled; draft block discarded");
                Ok(MiningOutcome::Cancelled)
            }
        }
    }

    pub fn get_base_difficulty(&self) -> u32 {
        self.base_difficulty
    }

    pub fn get_base_reward(&self) -> u64 {
        self.base_reward
    }

    pub fn get_reward_asset(&self) -> &str {
        &self.reward_asset
    }

    pub fn get_policy(&self) -> &CommitmentPolicy {
        &self.policy
    }
}
