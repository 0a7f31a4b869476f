// The chain is an in-memory, append-only list of blocks plus the pool of
// transactions waiting for the next one. Nothing is cached: balances and
// validity are always re-derived from the blocks themselves.
//
// Locking: blocks sit behind one RwLock so readers see a block either fully
// appended or not at all. Mining calls are serialized by their own mutex and
// the nonce search runs with no lock held, so submissions keep flowing while
// a block is being sealed and simply wait for the next one. A submission holds
// the block read lock from its "already mined" check until the pool insert, so
// an append cannot land in between.

use crate::config::Settings;
use crate::core::{
    Block, CancellationToken, FeePriority, FeeSchedule, MiningEngine, MiningOutcome, ProofOfWork,
    Transaction, TransferRequest,
};
use crate::error::{BlockchainError, Result};
use crate::storage::MemoryPool;
use crate::tokens::{InMemoryTokenRegistry, TokenRegistry};
use crate::utils::{Clock, SystemClock};
use log::{error, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

pub struct Blockchain {
    settings: Settings,
    registry: Arc<dyn TokenRegistry>,
    clock: Arc<dyn Clock>,
    blocks: RwLock<Vec<Block>>,
    pending: MemoryPool,
    engine: MiningEngine,
    mining: Mutex<()>, // one mining call at a time
}

impl Blockchain {
    /// New chain holding only the genesis block
    pub fn new(
        settings: Settings,
        registry: Arc<dyn TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Blockchain> {
        settings.validate()?;
        if !registry.exists(&settings.chain.reward_asset) {
            return Err(BlockchainError::UnknownAsset(
                settings.chain.reward_asset.clone(),
            ));
        }

        let engine = MiningEngine::new(
            settings.chain.difficulty,
            settings.chain.base_reward,
            &settings.chain.reward_asset,
            settings.commitment.clone(),
            &settings.fees,
            clock.clone(),
        );
        let genesis = Block::genesis()?;
        info!("Created chain with genesis block {}", genesis.get_hash());

        Ok(Blockchain {
            settings,
            registry,
            clock,
            blocks: RwLock::new(vec![genesis]),
            pending: MemoryPool::new(),
            engine,
            mining: Mutex::new(()),
        })
    }

    /// Default settings, the genesis assets and the system clock
    pub fn with_defaults() -> Result<Blockchain> {
        Self::new(
            Settings::default(),
            Arc::new(InMemoryTokenRegistry::with_genesis_assets()),
            Arc::new(SystemClock::new()),
        )
    }

    fn read_blocks(&self) -> RwLockReadGuard<'_, Vec<Block>> {
        self.blocks.read().unwrap_or_else(|poisoned| {
            error!("Block list lock was poisoned; continuing with the last appended state");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Build an unsigned transfer priced with this chain's fee schedule
    pub fn create_transaction(&self, request: TransferRequest<'_>) -> Result<Transaction> {
        Transaction::create(
            request,
            self.registry.as_ref(),
            &self.settings.fees,
            self.clock.as_ref(),
        )
    }

    fn check_submission(&self, tx: &Transaction) -> std::result::Result<(), String> {
        let sender = match tx.get_sender() {
            Some(sender) if !sender.is_empty() => sender,
            Some(_) => return Err("sender is empty".to_string()),
            None => return Err("reward transactions are minted by miners only".to_string()),
        };
        if tx.get_recipient().is_empty() {
            return Err("recipient is empty".to_string());
        }
        if tx.get_amount() == 0 {
            return Err(BlockchainError::InvalidAmount(0).to_string());
        }
        if !self.registry.exists(tx.get_asset()) {
            return Err(BlockchainError::UnknownAsset(tx.get_asset().to_string()).to_string());
        }
        if !self.registry.exists(tx.get_fee_asset()) {
            return Err(
                BlockchainError::UnknownAsset(tx.get_fee_asset().to_string()).to_string(),
            );
        }
        if !tx.verify_hash() {
            return Err("content hash does not match transaction fields".to_string());
        }
        tx.check_validity().map_err(|e| e.to_string())?;

        let size = tx.fee_basis_size().map_err(|e| e.to_string())?;
        if !self.settings.fees.is_sufficient(tx.get_fee(), size) {
            return Err(format!(
                "fee {} {} is below the required {}",
                tx.get_fee(),
                tx.get_fee_asset(),
                self.settings.fees.calculate_fee(size, FeePriority::Normal)
            ));
        }

        log::debug!("Checked transaction {} from {sender}", tx.get_hash());
        Ok(())
    }

    /// Validate and enqueue a transaction for the next block.
    ///
    /// Any failure is reported as `InvalidTransaction` with the reason and
    /// leaves the pool unchanged.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        if let Err(reason) = self.check_submission(&tx) {
            warn!("Rejected transaction {}: {reason}", tx.get_hash());
            return Err(BlockchainError::InvalidTransaction(reason));
        }
        let hash = tx.get_hash().to_string();

        let blocks = self.read_blocks();
        if find_in_blocks(&blocks, &hash).is_some() {
            warn!("Rejected transaction {hash}: already mined");
            return Err(BlockchainError::InvalidTransaction(format!(
                "transaction {hash} is already mined"
            )));
        }
        if !self.pending.add(tx) {
            warn!("Rejected transaction {hash}: already pending");
            return Err(BlockchainError::InvalidTransaction(format!(
                "transaction {hash} is already pending"
            )));
        }
        drop(blocks);

        info!("Transaction {hash} added to the pending pool");
        Ok(())
    }

    /// Seal the pending pool into a new block paying `miner_address`.
    ///
    /// The pool is snapshotted when mining starts. Transactions submitted while
    /// the nonce search runs stay pending for the next block. A cancelled search
    /// leaves both the chain and the pool as they were.
    pub fn mine_block(
        &self,
        miner_address: &str,
        commitment: u64,
        cancel: &CancellationToken,
    ) -> Result<MiningOutcome> {
        let _mining = self.mining.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.pending.snapshot();
        let snapshot_hashes: Vec<String> =
            snapshot.iter().map(|tx| tx.get_hash().to_string()).collect();

        // appends only happen under the mining lock, so this view stays current
        let (previous_hash, fresh, replayed) = {
            let blocks = self.read_blocks();
            let previous_hash = blocks
                .last()
                .map(|block| block.get_hash().to_string())
                .unwrap_or_default();
            let (replayed, fresh): (Vec<Transaction>, Vec<Transaction>) = snapshot
                .into_iter()
                .partition(|tx| find_in_blocks(&blocks, tx.get_hash()).is_some());
            (previous_hash, fresh, replayed)
        };
        for tx in &replayed {
            warn!("Leaving out transaction {} that is already on the chain", tx.get_hash());
        }

        let mut outcome = self
            .engine
            .mine(&previous_hash, fresh, miner_address, commitment, cancel)?;

        if let MiningOutcome::Sealed(report) = &mut outcome {
            report
                .skipped
                .extend(replayed.iter().map(|tx| tx.get_hash().to_string()));
            let height = {
                let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
                blocks.push(report.block.clone());
                blocks.len() - 1
            };
            let removed = self.pending.remove_mined(&snapshot_hashes);
            info!(
                "Added block {} at height {height} ({removed} transactions left the pool)",
                report.block.get_hash()
            );
        }
        Ok(outcome)
    }

    /// Check every invariant of the current chain, reporting the first violation
    pub fn validate(&self) -> Result<()> {
        let blocks = self.read_blocks();
        self.validate_blocks(&blocks)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check an arbitrary block sequence against this chain's rules
    pub fn validate_blocks(&self, blocks: &[Block]) -> Result<()> {
        let genesis = match blocks.first() {
            Some(genesis) => genesis,
            None => return Err(corrupt(0, "chain has no genesis block".to_string())),
        };
        if *genesis != Block::genesis()? {
            return Err(corrupt(0, "genesis block does not match".to_string()));
        }

        let mut seen = HashSet::new();
        for (height, pair) in blocks.windows(2).enumerate() {
            self.check_block(&pair[1], &pair[0], &mut seen)
                .map_err(|reason| corrupt(height + 1, reason))?;
        }
        Ok(())
    }

    fn check_block(
        &self,
        block: &Block,
        previous: &Block,
        seen: &mut HashSet<String>,
    ) -> std::result::Result<(), String> {
        if block.get_previous_hash() != previous.get_hash() {
            return Err(format!(
                "previous hash {} does not link to {}",
                block.get_previous_hash(),
                previous.get_hash()
            ));
        }

        let recomputed = block.calculate_hash().map_err(|e| e.to_string())?;
        if recomputed != block.get_hash() {
            return Err(format!(
                "stored hash {} differs from recomputed {recomputed}",
                block.get_hash()
            ));
        }

        let commitment = block.get_commitment();
        if let Some(record) = commitment {
            match self.engine.get_policy().evaluate(record.get_amount()) {
                Ok(Some(expected)) if expected == *record => {}
                _ => return Err("commitment record is inconsistent".to_string()),
            }
        }

        let expected_difficulty = self.engine.effective_difficulty(commitment);
        if block.get_difficulty() != expected_difficulty {
            return Err(format!(
                "difficulty {} should be {expected_difficulty}",
                block.get_difficulty()
            ));
        }
        if !ProofOfWork::meets_difficulty(block.get_hash(), expected_difficulty) {
            return Err(format!(
                "hash does not meet difficulty {expected_difficulty}"
            ));
        }

        for tx in block.get_transactions() {
            if !tx.verify_hash() {
                return Err(format!("transaction {} was modified", tx.get_hash()));
            }
            tx.check_validity()
                .map_err(|e| format!("transaction {}: {e}", tx.get_hash()))?;
            if !tx.is_reward() && !seen.insert(tx.get_hash().to_string()) {
                return Err(format!("transaction {} is included twice", tx.get_hash()));
            }
        }

        let rewards = block.get_transactions().iter().filter(|tx| tx.is_reward()).count();
        let reward_tx = match block.get_reward_transaction() {
            Some(tx) if rewards == 1 => tx,
            _ => return Err(format!("expected one trailing reward, found {rewards}")),
        };
        let expected_reward = self.engine.reward(commitment);
        if reward_tx.get_amount() != expected_reward || block.get_reward() != expected_reward {
            return Err(format!(
                "reward {} should be {expected_reward}",
                reward_tx.get_amount()
            ));
        }
        if reward_tx.get_asset() != self.engine.get_reward_asset() {
            return Err(format!("reward paid in {}", reward_tx.get_asset()));
        }
        Ok(())
    }

    /// Net amount of `asset` received by `address` over the whole chain.
    ///
    /// Negative when the address sent more than it received; there is no
    /// sufficiency check at submission. Fees are not debited.
    pub fn balance_of(&self, address: &str, asset: &str) -> i128 {
        let blocks = self.read_blocks();
        let mut balance: i128 = 0;
        for tx in blocks.iter().flat_map(|block| block.get_transactions()) {
            if tx.get_asset() != asset {
                continue;
            }
            if tx.get_sender() == Some(address) {
                balance -= tx.get_amount() as i128;
            }
            if tx.get_recipient() == address {
                balance += tx.get_amount() as i128;
            }
        }
        balance
    }

    /// Balance of every registered asset, plus any other asset the address touched
    pub fn balances_of(&self, address: &str) -> BTreeMap<String, i128> {
        let mut balances: BTreeMap<String, i128> = self
            .registry
            .assets()
            .into_iter()
            .map(|asset| (asset.get_symbol().to_string(), 0))
            .collect();

        let blocks = self.read_blocks();
        for tx in blocks.iter().flat_map(|block| block.get_transactions()) {
            let delta = tx.get_amount() as i128;
            if tx.get_sender() == Some(address) {
                *balances.entry(tx.get_asset().to_string()).or_insert(0) -= delta;
            }
            if tx.get_recipient() == address {
                *balances.entry(tx.get_asset().to_string()).or_insert(0) += delta;
            }
        }
        balances
    }

    /// Total fees paid in `fee_asset` by mined transactions
    pub fn collected_fees(&self, fee_asset: &str) -> u64 {
        let blocks = self.read_blocks();
        FeeSchedule::calculate_total_fees(
            blocks.iter().flat_map(|block| block.get_transactions()),
            fee_asset,
        )
    }

    pub fn contains_transaction(&self, hash: &str) -> bool {
        self.find_transaction(hash).is_some()
    }

    /// Mined transaction by content hash, with the height of its block
    pub fn find_transaction(&self, hash: &str) -> Option<(usize, Transaction)> {
        let blocks = self.read_blocks();
        find_in_blocks(&blocks, hash).map(|(height, tx)| (height, tx.clone()))
    }

    /// Fee a transfer of `size` bytes owes at `priority`
    pub fn estimate_fee(&self, size: usize, priority: FeePriority) -> u64 {
        self.settings.fees.calculate_fee(size, priority)
    }

    /// Copy of the chain as it is now
    pub fn blocks(&self) -> Vec<Block> {
        self.read_blocks().clone()
    }

    pub fn get_block(&self, height: usize) -> Option<Block> {
        self.read_blocks().get(height).cloned()
    }

    pub fn get_tip_hash(&self) -> String {
        self.read_blocks()
            .last()
            .map(|block| block.get_hash().to_string())
            .unwrap_or_default()
    }

    /// Height of the tip; genesis is 0
    pub fn get_height(&self) -> usize {
        self.read_blocks().len().saturating_sub(1)
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending.snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get_difficulty(&self) -> u32 {
        self.engine.get_base_difficulty()
    }

    pub fn get_registry(&self) -> &dyn TokenRegistry {
        self.registry.as_ref()
    }

    pub fn get_engine(&self) -> &MiningEngine {
        &self.engine
    }

    #[cfg(test)]
    pub(crate) fn with_blocks_mut<F: FnOnce(&mut Vec<Block>)>(&self, f: F) {
        let mut blocks = self.blocks.write().unwrap();
        f(&mut blocks);
    }
}

fn find_in_blocks<'a>(blocks: &'a [Block], hash: &str) -> Option<(usize, &'a Transaction)> {
    blocks.iter().enumerate().find_map(|(height, block)| {
        block
            .get_transactions()
            .iter()
            .find(|tx| tx.get_hash() == hash)
            .map(|tx| (height, tx))
    })
}

fn corrupt(height: usize, reason: String) -> BlockchainError {
    error!("Chain corrupt at height {height}: {reason}");
    BlockchainError::ChainCorrupt { height, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{
        create_test_blockchain, create_test_blockchain_with_clock, mine, signed_transfer,
        test_settings, TEST_CLOCK_START,
    };
    use crate::utils::ManualClock;
    use crate::wallet::{KeyProvider, Wallet};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::thread;

    #[test]
    fn test_blockchain_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Blockchain>();
    }

    #[test]
    fn test_genesis_only_chain() {
        let chain = create_test_blockchain().unwrap();
        assert!(chain.is_valid());
        assert_eq!(chain.get_height(), 0);
        assert_eq!(chain.balance_of("anyone", "AGT"), 0);
        assert_eq!(chain.get_tip_hash(), Block::genesis().unwrap().get_hash());
    }

    #[test]
    fn test_new_rejects_unknown_reward_asset() {
        let mut settings = test_settings();
        settings.chain.reward_asset = "NOPE".to_string();
        let result = Blockchain::new(
            settings,
            Arc::new(InMemoryTokenRegistry::with_genesis_assets()),
            Arc::new(ManualClock::new(0)),
        );
        assert!(matches!(result, Err(BlockchainError::UnknownAsset(_))));
    }

    #[test]
    fn test_transfer_and_balances() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let bob = Wallet::new().unwrap();

        let tx = signed_transfer(&chain, &alice, &bob.get_address(), 100, "AGT").unwrap();
        chain.submit_transaction(tx).unwrap();
        let report = mine(&chain, &alice.get_address()).unwrap();

        assert!(report.block.get_hash().starts_with('0'));
        assert_eq!(chain.get_height(), 1);
        assert_eq!(chain.pending_count(), 0);
        assert_eq!(chain.balance_of(&bob.get_address(), "AGT"), 100);
        assert_eq!(chain.balance_of(&alice.get_address(), "AGT"), -100 + 100);
        assert_eq!(chain.balance_of(&bob.get_address(), "BTC"), 0);
        assert!(chain.is_valid());

        let balances = chain.balances_of(&bob.get_address());
        assert_eq!(balances.get("AGT"), Some(&100));
        assert_eq!(balances.get("GTPS"), Some(&0));
    }

    #[test]
    fn test_balance_is_linear_in_blocks() {
        let chain = create_test_blockchain().unwrap();
        let x = Wallet::new().unwrap();
        let y = Wallet::new().unwrap();

        for _ in 0..3 {
            let tx = signed_transfer(&chain, &x, &y.get_address(), 25, "BTC").unwrap();
            chain.submit_transaction(tx).unwrap();
            mine(&chain, "miner").unwrap();
        }
        assert_eq!(chain.balance_of(&y.get_address(), "BTC"), 75);
        assert_eq!(chain.balance_of(&x.get_address(), "BTC"), -75);
        assert_eq!(chain.balance_of("miner", "AGT"), 300);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let mallory = Wallet::new().unwrap();

        let tx = chain
            .create_transaction(TransferRequest::new(&alice.get_address(), "bob", 5, "AGT"))
            .unwrap();
        let mut forged = tx.clone();
        assert!(forged.sign(&mallory).is_err());
        forged.set_signature_unchecked(Some(vec![1; 64]));

        let err = chain.submit_transaction(forged).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidTransaction(_)));
        assert_eq!(chain.pending_count(), 0);

        let err = chain.submit_transaction(tx).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidTransaction(ref r) if r.contains("No signature")));
    }

    #[test]
    fn test_submission_preconditions() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();

        let reward = Transaction::new_reward(&alice.get_address(), 1, "AGT", 0, None).unwrap();
        assert!(chain.submit_transaction(reward).is_err());

        let mut unknown =
            Transaction::with_fee(&alice.get_address(), "bob", 1, "DOGE", 10, "BTCYT", 0).unwrap();
        unknown.sign(&alice).unwrap();
        assert!(chain.submit_transaction(unknown).is_err());

        let mut no_recipient =
            Transaction::with_fee(&alice.get_address(), "", 1, "AGT", 10, "BTCYT", 0).unwrap();
        no_recipient.sign(&alice).unwrap();
        assert!(chain.submit_transaction(no_recipient).is_err());

        let mut cheap =
            Transaction::with_fee(&alice.get_address(), "bob", 1, "AGT", 0, "BTCYT", 0).unwrap();
        cheap.sign(&alice).unwrap();
        let err = chain.submit_transaction(cheap).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidTransaction(ref r) if r.contains("fee")));

        assert_eq!(chain.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_submission_is_rejected() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();

        chain.submit_transaction(tx.clone()).unwrap();
        assert!(chain.submit_transaction(tx.clone()).is_err());

        mine(&chain, "miner").unwrap();
        assert!(chain.submit_transaction(tx.clone()).is_err());
        assert_eq!(chain.find_transaction(tx.get_hash()).map(|(h, _)| h), Some(1));
    }

    fn occurrences(chain: &Blockchain, hash: &str) -> usize {
        chain
            .blocks()
            .iter()
            .flat_map(|block| block.get_transactions())
            .filter(|tx| tx.get_hash() == hash)
            .count()
    }

    #[test]
    fn test_mining_leaves_out_transactions_already_on_chain() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();
        chain.submit_transaction(tx.clone()).unwrap();
        mine(&chain, "miner").unwrap();

        // straight into the pool, past the submission checks
        assert!(chain.pending.add(tx.clone()));
        let report = mine(&chain, "miner").unwrap();

        assert_eq!(report.skipped, vec![tx.get_hash().to_string()]);
        assert_eq!(report.block.get_transactions().len(), 1);
        assert_eq!(chain.pending_count(), 0);
        assert_eq!(occurrences(&chain, tx.get_hash()), 1);
        assert_eq!(chain.balance_of("bob", "AGT"), 5);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_transaction_in_two_blocks_is_detected() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();
        chain.submit_transaction(tx.clone()).unwrap();
        mine(&chain, "miner").unwrap();

        let seal = |transactions: Vec<Transaction>| {
            let timestamp = TEST_CLOCK_START + 1_000;
            let mut transactions = transactions;
            transactions.push(Transaction::new_reward("miner", 100, "AGT", timestamp, None).unwrap());
            Block::new_draft(chain.get_tip_hash(), timestamp, transactions, None, 1, 100)
                .unwrap()
                .mine(&CancellationToken::new())
                .unwrap()
                .unwrap()
        };

        let mut honest = chain.blocks();
        honest.push(seal(Vec::new()));
        assert!(chain.validate_blocks(&honest).is_ok());

        let mut replayed = chain.blocks();
        replayed.push(seal(vec![tx.clone()]));
        assert!(matches!(
            chain.validate_blocks(&replayed),
            Err(BlockchainError::ChainCorrupt { height: 2, .. })
        ));
    }

    #[test]
    fn test_resubmission_racing_the_append_is_never_mined_twice() {
        let chain = Arc::new(create_test_blockchain().unwrap());
        let alice = Wallet::new().unwrap();

        for amount in 1..=10 {
            let tx = signed_transfer(&chain, &alice, "bob", amount, "AGT").unwrap();
            chain.submit_transaction(tx.clone()).unwrap();

            let resubmitter = {
                let chain = chain.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut accepted = 0;
                    while !chain.contains_transaction(tx.get_hash()) {
                        if chain.submit_transaction(tx.clone()).is_ok() {
                            accepted += 1;
                        }
                    }
                    for _ in 0..50 {
                        if chain.submit_transaction(tx.clone()).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            };
            mine(&chain, "miner").unwrap();
            assert_eq!(resubmitter.join().unwrap(), 0);

            mine(&chain, "miner").unwrap();
            assert_eq!(occurrences(&chain, tx.get_hash()), 1);
        }
        assert_eq!(chain.balance_of("bob", "AGT"), 55);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_upper_case_sender_alias_is_rejected() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let alias = alice.get_address().to_uppercase();

        struct AliasKey<'a>(&'a Wallet, String);
        impl KeyProvider for AliasKey<'_> {
            fn public_key(&self) -> &[u8] {
                self.0.get_public_key()
            }
            fn address(&self) -> String {
                self.1.clone()
            }
            fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
                KeyProvider::sign(self.0, digest)
            }
        }

        let mut tx = chain
            .create_transaction(TransferRequest::new(&alias, "bob", 500, "AGT"))
            .unwrap();
        tx.sign(&AliasKey(&alice, alias.clone())).unwrap();

        assert!(!tx.is_valid());
        assert!(matches!(
            chain.submit_transaction(tx),
            Err(BlockchainError::InvalidTransaction(_))
        ));
        assert_eq!(chain.pending_count(), 0);
    }

    #[test]
    fn test_tampered_nonce_is_detected() {
        let chain = create_test_blockchain().unwrap();
        mine(&chain, "miner").unwrap();
        mine(&chain, "miner").unwrap();
        assert!(chain.is_valid());

        chain.with_blocks_mut(|blocks| {
            let nonce = blocks[1].get_nonce();
            blocks[1].set_nonce_unchecked(nonce + 1);
        });
        assert!(matches!(
            chain.validate(),
            Err(BlockchainError::ChainCorrupt { height: 1, .. })
        ));
        assert!(!chain.is_valid());
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();
        chain.submit_transaction(tx).unwrap();
        mine(&chain, "miner").unwrap();

        chain.with_blocks_mut(|blocks| {
            blocks[1].transactions_mut_unchecked()[0].set_amount_unchecked(5_000);
        });
        assert!(!chain.is_valid());

        // re-sealing the hash does not help: the signature no longer verifies
        chain.with_blocks_mut(|blocks| {
            let hash = blocks[1].calculate_hash().unwrap();
            blocks[1].set_hash_unchecked(&hash);
        });
        assert!(!chain.is_valid());
    }

    #[test]
    fn test_broken_link_is_detected() {
        let chain = create_test_blockchain().unwrap();
        mine(&chain, "miner").unwrap();
        mine(&chain, "miner").unwrap();

        chain.with_blocks_mut(|blocks| blocks.swap(1, 2));
        assert!(!chain.is_valid());

        assert!(matches!(
            chain.validate_blocks(&[]),
            Err(BlockchainError::ChainCorrupt { height: 0, .. })
        ));
    }

    #[test]
    fn test_commitment_mining() {
        let mut settings = test_settings();
        settings.chain.difficulty = 2;
        let chain = create_test_blockchain_with_clock(settings, ManualClock::with_step(0, 1)).unwrap();

        let outcome = chain
            .mine_block("miner", 16_000, &CancellationToken::new())
            .unwrap();
        let report = outcome.into_report().unwrap();
        assert_eq!(report.effective_difficulty, 1);
        assert!(report.reward > 100);
        assert_eq!(chain.balance_of("miner", "AGT"), report.reward as i128);
        assert!(chain.is_valid());

        let report = chain
            .mine_block("miner", 100, &CancellationToken::new())
            .unwrap()
            .into_report()
            .unwrap();
        assert_eq!(report.reward, 100);
        assert_eq!(report.effective_difficulty, 2);
        assert!(report.commitment_error.is_some());
        assert!(chain.is_valid());
    }

    #[test]
    fn test_cancelled_mining_leaves_state_untouched() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let tx = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();
        chain.submit_transaction(tx).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let outcome = chain.mine_block("miner", 0, &token).unwrap();

        assert!(!outcome.is_sealed());
        assert_eq!(chain.get_height(), 0);
        assert_eq!(chain.pending_count(), 1);
    }

    #[test]
    fn test_collected_fees() {
        let chain = create_test_blockchain().unwrap();
        let alice = Wallet::new().unwrap();
        let first = signed_transfer(&chain, &alice, "bob", 5, "AGT").unwrap();
        let second = signed_transfer(&chain, &alice, "carol", 6, "AGT").unwrap();
        let expected = first.get_fee() + second.get_fee();

        chain.submit_transaction(first).unwrap();
        chain.submit_transaction(second).unwrap();
        mine(&chain, "miner").unwrap();

        assert_eq!(chain.collected_fees("BTCYT"), expected);
        assert_eq!(chain.collected_fees("AGT"), 0);
    }

    // Blocks the first `now_millis` call after `arm` until the test releases it,
    // which happens inside mine_block right after the pool snapshot.
    struct GateClock {
        inner: ManualClock,
        gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    }

    impl GateClock {
        fn arm(&self) -> (Receiver<()>, Sender<()>) {
            let (reached_tx, reached_rx) = channel();
            let (resume_tx, resume_rx) = channel();
            *self.gate.lock().unwrap() = Some((reached_tx, resume_rx));
            (reached_rx, resume_tx)
        }
    }

    impl Clock for GateClock {
        fn now_millis(&self) -> Result<i64> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((reached, resume)) = gate {
                reached.send(()).unwrap();
                resume.recv().unwrap();
            }
            self.inner.now_millis()
        }
    }

    #[test]
    fn test_submission_during_mining_waits_for_next_block() {
        let clock = Arc::new(GateClock {
            inner: ManualClock::with_step(0, 1),
            gate: Mutex::new(None),
        });
        let chain = Arc::new(
            Blockchain::new(
                test_settings(),
                Arc::new(InMemoryTokenRegistry::with_genesis_assets()),
                clock.clone(),
            )
            .unwrap(),
        );
        let alice = Wallet::new().unwrap();
        let early = signed_transfer(&chain, &alice, "bob", 1, "AGT").unwrap();
        let late = signed_transfer(&chain, &alice, "bob", 2, "AGT").unwrap();
        chain.submit_transaction(early.clone()).unwrap();

        let (reached, resume) = clock.arm();
        let miner = {
            let chain = chain.clone();
            thread::spawn(move || chain.mine_block("miner", 0, &CancellationToken::new()))
        };

        reached.recv().unwrap();
        chain.submit_transaction(late.clone()).unwrap();
        resume.send(()).unwrap();

        let report = miner.join().unwrap().unwrap().into_report().unwrap();
        let mined: Vec<&str> = report
            .block
            .get_transactions()
            .iter()
            .map(|tx| tx.get_hash())
            .collect();
        assert!(mined.contains(&early.get_hash()));
        assert!(!mined.contains(&late.get_hash()));
        assert_eq!(chain.pending_transactions(), vec![late.clone()]);

        let next = mine(&chain, "miner").unwrap();
        assert_eq!(next.block.get_transactions()[0], late);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_concurrent_submitters_lose_nothing() {
        let chain = Arc::new(create_test_blockchain().unwrap());
        let wallets: Vec<Wallet> = (0..4).map(|_| Wallet::new().unwrap()).collect();

        let handles: Vec<_> = wallets
            .into_iter()
            .map(|wallet| {
                let chain = chain.clone();
                thread::spawn(move || {
                    let mut hashes = Vec::new();
                    for amount in 1..=5 {
                        let tx = signed_transfer(&chain, &wallet, "sink", amount, "AGT").unwrap();
                        hashes.push(tx.get_hash().to_string());
                        chain.submit_transaction(tx).unwrap();
                    }
                    hashes
                })
            })
            .collect();

        for _ in 0..3 {
            mine(&chain, "miner").unwrap();
        }
        let hashes: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        mine(&chain, "miner").unwrap();

        assert_eq!(chain.pending_count(), 0);
        for hash in &hashes {
            assert!(chain.contains_transaction(hash));
        }
        assert_eq!(chain.balance_of("sink", "AGT"), 4 * 15);
        assert!(chain.is_valid());
    }
}
