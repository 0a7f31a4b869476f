//! Core ledger functionality
//!
//! Transactions, blocks, the commitment-weighted proof-of-work, the mining
//! engine and the chain that ties them together.

pub mod block;
pub mod blockchain;
pub mod commitment;
pub mod fees;
pub mod miner;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::Blockchain;
pub use commitment::{Commitment, CommitmentPolicy};
pub use fees::{FeePriority, FeeSchedule};
pub use miner::{MiningEngine, MiningOutcome, MiningReport};
pub use monetary::{BASE_MINING_REWARD, DEFAULT_DIFFICULTY, REWARD_ASSET};
pub use proof_of_work::{CancellationToken, ProofOfWork};
pub use transaction::{Transaction, TransferRequest};
