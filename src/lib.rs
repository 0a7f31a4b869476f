//! # AGT Chain
//!
//! A single-process ledger: an append-only chain of blocks holding signed,
//! multi-asset transfers, sealed by a proof-of-work puzzle whose difficulty and
//! reward depend on a commitment the miner puts up.
//!
//! ## Layout
//! - `core/`: transactions, blocks, commitment rules, proof-of-work, the mining engine and the chain
//! - `tokens/`: asset registry and fungible-token contracts
//! - `wallet/`: the key-provider seam and the ECDSA P-256 wallet
//! - `storage/`: the pending pool
//! - `config/`: TOML settings with environment overrides
//! - `utils/`: hashing, signatures, encodings and clocks
//! - `cli/`: command-line definitions for the demo binary
//!
//! ## Flow
//! Build a [`Transaction`] (usually through [`Blockchain::create_transaction`]),
//! sign it with a [`Wallet`], hand it to [`Blockchain::submit_transaction`], then
//! call [`Blockchain::mine_block`]. Balances and validity are replayed from the
//! blocks on every query.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod tokens;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{ChainSettings, Settings};
pub use core::{
    Block, Blockchain, CancellationToken, Commitment, CommitmentPolicy, FeePriority, FeeSchedule,
    MiningEngine, MiningOutcome, MiningReport, ProofOfWork, Transaction, TransferRequest,
};
pub use error::{BlockchainError, Result};
pub use storage::MemoryPool;
pub use tokens::{Asset, InMemoryTokenRegistry, TokenContracts, TokenRegistry};
pub use utils::{
    base58_decode, base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, ripemd160_digest, sha256_digest, Clock,
    ManualClock, SystemClock,
};
pub use wallet::{
    address_from_public_key, fingerprint, validate_address, KeyProvider, Wallet,
    ADDRESS_CHECK_SUM_LEN,
};
