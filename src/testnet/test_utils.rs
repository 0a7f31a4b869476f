//! Test utilities for ledger testing

use crate::config::Settings;
use crate::core::{Blockchain, CancellationToken, MiningReport, Transaction, TransferRequest};
use crate::error::{BlockchainError, Result};
use crate::tokens::InMemoryTokenRegistry;
use crate::utils::ManualClock;
use crate::wallet::Wallet;
use std::sync::Arc;

/// Start of the deterministic test clock
pub const TEST_CLOCK_START: i64 = 1_704_067_200_000;

/// Default settings with difficulty 1 so mining takes a handful of hashes
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.chain.difficulty = 1;
    settings
}

/// Genesis-only chain on a manual clock that ticks once per read
pub fn create_test_blockchain() -> Result<Blockchain> {
    create_test_blockchain_with_clock(test_settings(), ManualClock::new(TEST_CLOCK_START))
}

pub fn create_test_blockchain_with_clock(
    settings: Settings,
    clock: ManualClock,
) -> Result<Blockchain> {
    Blockchain::new(
        settings,
        Arc::new(InMemoryTokenRegistry::with_genesis_assets()),
        Arc::new(clock),
    )
}

/// Transfer from `from`, priced by the chain and signed
pub fn signed_transfer(
    chain: &Blockchain,
    from: &Wallet,
    to: &str,
    amount: u64,
    asset: &str,
) -> Result<Transaction> {
    let address = from.get_address();
    let mut tx = chain.create_transaction(TransferRequest::new(&address, to, amount, asset))?;
    tx.sign(from)?;
    Ok(tx)
}

/// Mine the pending pool without a commitment
pub fn mine(chain: &Blockchain, miner_address: &str) -> Result<MiningReport> {
    chain
        .mine_block(miner_address, 0, &CancellationToken::new())?
        .into_report()
        .ok_or_else(|| BlockchainError::Config("test mining was cancelled".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_blockchain() {
        let chain = create_test_blockchain().unwrap();
        assert_eq!(chain.get_height(), 0);
        assert_eq!(chain.get_difficulty(), 1);
    }

    #[test]
    fn test_signed_transfer_is_accepted() {
        let chain = create_test_blockchain().unwrap();
        let wallet = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &wallet, "bob", 3, "AGOLD").unwrap();

        assert!(tx.is_valid());
        assert_eq!(tx.get_timestamp(), TEST_CLOCK_START);
        chain.submit_transaction(tx).unwrap();

        let report = mine(&chain, "miner").unwrap();
        assert_eq!(report.block.get_transactions().len(), 2);
    }
}
