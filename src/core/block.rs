use crate::core::monetary::{GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
use crate::core::{CancellationToken, Commitment, ProofOfWork, Transaction};
use crate::error::Result;
use crate::utils::{deserialize, serialize};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    timestamp: i64,
    previous_hash: String,
    hash: String,
    transactions: Vec<Transaction>,
    nonce: u64,
    commitment: Option<Commitment>,
    difficulty: u32, // effective difficulty the block was sealed at
    reward: u64,
}

impl Block {
    /// Unsealed block at nonce 0. `difficulty` and `reward` are recorded, not hashed.
    pub fn new_draft(
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
        commitment: Option<Commitment>,
        difficulty: u32,
        reward: u64,
    ) -> Result<Block> {
        let mut block = Block {
            timestamp,
            previous_hash,
            hash: String::new(),
            transactions,
            nonce: 0,
            commitment,
            difficulty,
            reward,
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    /// The fixed first block: no transactions, sentinel previous hash, never mined.
    pub fn genesis() -> Result<Block> {
        Block::new_draft(
            GENESIS_PREVIOUS_HASH.to_string(),
            GENESIS_TIMESTAMP,
            vec![],
            None,
            0,
            0,
        )
    }

    /// Run the nonce search. `None` means the token fired and the draft is discarded.
    pub fn mine(mut self, cancel: &CancellationToken) -> Result<Option<Block>> {
        info!(
            "Starting proof-of-work on top of {} with difficulty {}",
            self.previous_hash, self.difficulty
        );
        let pow = ProofOfWork::new_proof_of_work(&self)?;
        match pow.run(cancel)? {
            Some((nonce, hash)) => {
                self.nonce = nonce;
                self.hash = hash;
                info!(
                    "Proof-of-work completed for block: {} (nonce: {nonce})",
                    self.hash
                );
                Ok(Some(self))
            }
            None => Ok(None),
        }
    }

    /// Hash input split around the nonce: previous hash, timestamp and transactions
    /// before it, the commitment record after it.
    pub(crate) fn hash_input_parts(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let head = serialize(&(&self.previous_hash, self.timestamp, &self.transactions))?;
        let tail = serialize(&self.commitment)?;
        Ok((head, tail))
    }

    /// Hash recomputed from the current fields
    pub fn calculate_hash(&self) -> Result<String> {
        ProofOfWork::new_proof_of_work(self)?.hash_at(self.nonce)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    /// The trailing reward transaction, if the block has one
    pub fn get_reward_transaction(&self) -> Option<&Transaction> {
        self.transactions.last().filter(|tx| tx.is_reward())
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_commitment(&self) -> Option<&Commitment> {
        self.commitment.as_ref()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_reward(&self) -> u64 {
        self.reward
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    #[cfg(test)]
    pub(crate) fn set_nonce_unchecked(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut_unchecked(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_hash_unchecked(&mut self, hash: &str) {
        self.hash = hash.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommitmentPolicy;

    fn reward(timestamp: i64) -> Transaction {
        Transaction::new_reward("miner", 100, "AGT", timestamp, None).unwrap()
    }

    #[test]
    fn test_genesis_is_fixed() {
        let a = Block::genesis().unwrap();
        let b = Block::genesis().unwrap();

        assert_eq!(a.get_hash(), b.get_hash());
        assert_eq!(a.get_previous_hash(), "0");
        assert!(a.get_transactions().is_empty());
        assert_eq!(a.get_timestamp(), GENESIS_TIMESTAMP);
        assert!(a.is_genesis());
        assert_eq!(a.calculate_hash().unwrap(), a.get_hash());
    }

    #[test]
    fn test_mined_block_meets_difficulty() {
        let genesis = Block::genesis().unwrap();
        let draft = Block::new_draft(
            genesis.get_hash().to_string(),
            1_000,
            vec![reward(1_000)],
            None,
            1,
            100,
        )
        .unwrap();
        let block = draft.mine(&CancellationToken::new()).unwrap().unwrap();

        assert!(block.get_hash().starts_with('0'));
        assert_eq!(block.calculate_hash().unwrap(), block.get_hash());
        assert!(ProofOfWork::validate(&block));
        assert_eq!(block.get_reward_transaction(), Some(&block.get_transactions()[0]));
    }

    #[test]
    fn test_hash_covers_order_and_commitment() {
        let a = reward(1);
        let b = reward(2);
        let forward = Block::new_draft("p".into(), 0, vec![a.clone(), b.clone()], None, 1, 0).unwrap();
        let backward = Block::new_draft("p".into(), 0, vec![b, a.clone()], None, 1, 0).unwrap();
        assert_ne!(forward.get_hash(), backward.get_hash());

        let commitment = CommitmentPolicy::default().evaluate(8_000).unwrap();
        let committed = Block::new_draft("p".into(), 0, vec![a.clone()], commitment, 1, 0).unwrap();
        let plain = Block::new_draft("p".into(), 0, vec![a], None, 1, 0).unwrap();
        assert_ne!(committed.get_hash(), plain.get_hash());
    }

    #[test]
    fn test_difficulty_and_reward_are_not_hashed() {
        let plain = Block::new_draft("p".into(), 0, vec![reward(0)], None, 1, 100).unwrap();
        let other = Block::new_draft("p".into(), 0, vec![reward(0)], None, 3, 250).unwrap();
        assert_eq!(plain.get_hash(), other.get_hash());
    }

    #[test]
    fn test_cancelled_mining_discards_draft() {
        let draft = Block::new_draft("p".into(), 0, vec![reward(0)], None, 64, 100).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(draft.mine(&token).unwrap().is_none());
    }

    #[test]
    fn test_serialize_round_trip() {
        let commitment = CommitmentPolicy::default().evaluate(12_000).unwrap();
        let block = Block::new_draft("p".into(), 7, vec![reward(7)], commitment, 2, 150).unwrap();
        let restored = Block::deserialize(&block.serialize().unwrap()).unwrap();
        assert_eq!(restored, block);
    }
}
