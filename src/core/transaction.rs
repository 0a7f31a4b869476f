// A transaction moves `amount` of one asset from a sender to a recipient.
// The sender's address is its public key, so anyone can check the signature
// without a key lookup. Reward transactions have no sender and no signature.

use crate::core::{FeePriority, FeeSchedule};
use crate::error::{BlockchainError, Result};
use crate::tokens::TokenRegistry;
use crate::utils::{ecdsa_p256_sha256_sign_verify, serialize, sha256_digest, Clock};
use crate::wallet::{public_key_from_address, KeyProvider};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// Everything a sender decides about a transfer; the ledger fills in the rest.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub sender: &'a str,
    pub recipient: &'a str,
    pub amount: u64,
    pub asset: &'a str,
    /// Falls back to the fee schedule's default asset
    pub fee_asset: Option<&'a str>,
    pub priority: FeePriority,
}

impl<'a> TransferRequest<'a> {
    pub fn new(sender: &'a str, recipient: &'a str, amount: u64, asset: &'a str) -> Self {
        TransferRequest {
            sender,
            recipient,
            amount,
            asset,
            fee_asset: None,
            priority: FeePriority::Normal,
        }
    }

    pub fn fee_asset(mut self, fee_asset: &'a str) -> Self {
        self.fee_asset = Some(fee_asset);
        self
    }

    pub fn priority(mut self, priority: FeePriority) -> Self {
        self.priority = priority;
        self
    }
}

// Field order here is the hash layout. Do not reorder.
#[derive(bincode::Encode)]
struct ContentFields<'a> {
    sender: Option<&'a str>,
    recipient: &'a str,
    amount: u64,
    asset: &'a str,
    fee: u64,
    fee_asset: &'a str,
    timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    sender: Option<String>, // None for mining rewards
    recipient: String,
    amount: u64,
    asset: String,
    fee: u64,
    fee_asset: String,
    timestamp: i64,
    hash: String,               // hex content hash
    signature: Option<Vec<u8>>, // ECDSA P-256 over the content digest
    commitment: Option<u64>,    // informational, set by the miner on rewards
}

impl Transaction {
    /// Build an unsigned transfer, pricing its fee from `fees` at the requested priority.
    pub fn create(
        request: TransferRequest<'_>,
        registry: &dyn TokenRegistry,
        fees: &FeeSchedule,
        clock: &dyn Clock,
    ) -> Result<Transaction> {
        if request.amount == 0 {
            return Err(BlockchainError::InvalidAmount(request.amount));
        }
        if !registry.exists(request.asset) {
            return Err(BlockchainError::UnknownAsset(request.asset.to_string()));
        }
        let fee_asset = request
            .fee_asset
            .unwrap_or(fees.default_fee_asset.as_str());
        if !registry.exists(fee_asset) {
            return Err(BlockchainError::UnknownAsset(fee_asset.to_string()));
        }

        let mut tx = Transaction {
            sender: Some(request.sender.to_string()),
            recipient: request.recipient.to_string(),
            amount: request.amount,
            asset: request.asset.to_string(),
            fee: 0,
            fee_asset: fee_asset.to_string(),
            timestamp: clock.now_millis()?,
            hash: String::new(),
            signature: None,
            commitment: None,
        };
        tx.fee = fees.calculate_fee(tx.fee_basis_size()?, request.priority);
        tx.hash = tx.calculate_hash()?;
        Ok(tx)
    }

    /// Build an unsigned transfer with an explicit fee and timestamp.
    pub fn with_fee(
        sender: &str,
        recipient: &str,
        amount: u64,
        asset: &str,
        fee: u64,
        fee_asset: &str,
        timestamp: i64,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidAmount(amount));
        }
        let mut tx = Transaction {
            sender: Some(sender.to_string()),
            recipient: recipient.to_string(),
            amount,
            asset: asset.to_string(),
            fee,
            fee_asset: fee_asset.to_string(),
            timestamp,
            hash: String::new(),
            signature: None,
            commitment: None,
        };
        tx.hash = tx.calculate_hash()?;
        Ok(tx)
    }

    /// System-minted reward paid to a miner
    pub fn new_reward(
        recipient: &str,
        amount: u64,
        asset: &str,
        timestamp: i64,
        commitment: Option<u64>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidAmount(amount));
        }
        let mut tx = Transaction {
            sender: None,
            recipient: recipient.to_string(),
            amount,
            asset: asset.to_string(),
            fee: 0,
            fee_asset: asset.to_string(),
            timestamp,
            hash: String::new(),
            signature: None,
            commitment,
        };
        tx.hash = tx.calculate_hash()?;
        Ok(tx)
    }

    fn content_fields(&self) -> ContentFields<'_> {
        ContentFields {
            sender: self.sender.as_deref(),
            recipient: &self.recipient,
            amount: self.amount,
            asset: &self.asset,
            fee: self.fee,
            fee_asset: &self.fee_asset,
            timestamp: self.timestamp,
        }
    }

    /// Digest over the content fields as they are now
    pub fn content_digest(&self) -> Result<Vec<u8>> {
        let bytes = serialize(&self.content_fields())?;
        Ok(sha256_digest(&bytes))
    }

    pub fn calculate_hash(&self) -> Result<String> {
        Ok(HEXLOWER.encode(&self.content_digest()?))
    }

    /// Serialized size the fee is priced on. Independent of the fee and the signature.
    pub fn fee_basis_size(&self) -> Result<usize> {
        let fields = ContentFields {
            fee: 0,
            ..self.content_fields()
        };
        Ok(serialize(&fields)?.len())
    }

    pub fn sign(&mut self, key: &dyn KeyProvider) -> Result<()> {
        let signer = key.address();
        match self.sender.as_deref() {
            Some(sender) if sender == signer => {}
            other => {
                return Err(BlockchainError::KeyMismatch {
                    expected: other.unwrap_or("<reward>").to_string(),
                    actual: signer,
                })
            }
        }

        let digest = self.content_digest()?;
        self.hash = HEXLOWER.encode(&digest);
        self.signature = Some(key.sign(&digest)?);
        Ok(())
    }

    /// Signature check with the reason for failure.
    ///
    /// Rewards pass unconditionally. Everything else needs a non-empty signature
    /// that verifies against the sender address over the recomputed content digest.
    pub fn check_validity(&self) -> Result<()> {
        let sender = match self.sender.as_deref() {
            None => return Ok(()),
            Some(sender) => sender,
        };

        let signature = match self.signature.as_deref() {
            Some(signature) if !signature.is_empty() => signature,
            _ => return Err(BlockchainError::MissingSignature),
        };

        let public_key =
            public_key_from_address(sender).map_err(|_| BlockchainError::BadSignature)?;
        let digest = self.content_digest()?;
        if !ecdsa_p256_sha256_sign_verify(&public_key, signature, &digest) {
            return Err(BlockchainError::BadSignature);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.check_validity().is_ok()
    }

    /// Whether the stored hash still matches the content fields
    pub fn verify_hash(&self) -> bool {
        matches!(self.calculate_hash(), Ok(hash) if hash == self.hash)
    }

    pub fn is_reward(&self) -> bool {
        self.sender.is_none()
    }

    pub fn get_sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn get_recipient(&self) -> &str {
        &self.recipient
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_asset(&self) -> &str {
        &self.asset
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_fee_asset(&self) -> &str {
        &self.fee_asset
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_hash(&self) -> &str {
        &self.hash
    }

    pub fn get_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn get_commitment(&self) -> Option<u64> {
        self.commitment
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        crate::utils::deserialize(bytes)
    }

    #[cfg(test)]
    pub(crate) fn set_amount_unchecked(&mut self, amount: u64) {
        self.amount = amount;
    }

    #[cfg(test)]
    pub(crate) fn set_signature_unchecked(&mut self, signature: Option<Vec<u8>>) {
        self.signature = signature;
    }
}
