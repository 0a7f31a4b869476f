//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`]. Validation errors are
//! raised before any state is touched, so a caller receiving one of them can fix the
//! input and retry against an unchanged chain.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Transfer amount was zero
    InvalidAmount(u64),
    /// Asset symbol is not known to the token registry
    UnknownAsset(String),
    /// A non-reward transaction carries no signature
    MissingSignature,
    /// Signature does not verify against the sender over the content hash
    BadSignature,
    /// Signing key does not belong to the declared sender
    KeyMismatch { expected: String, actual: String },
    /// Transaction was refused by the pending pool
    InvalidTransaction(String),
    /// Commitment is positive but below the policy threshold
    InsufficientCommitment { provided: u64, minimum: u64 },
    /// Chain validation found a broken invariant at the given height
    ChainCorrupt { height: usize, reason: String },
    /// Token contract balance too low for a transfer
    InsufficientFunds { required: u64, available: u64 },
    /// Invalid address format
    InvalidAddress(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidAmount(amount) => {
                write!(f, "Invalid amount: {amount} (must be greater than zero)")
            }
            BlockchainError::UnknownAsset(symbol) => write!(f, "Unknown asset: {symbol}"),
            BlockchainError::MissingSignature => write!(f, "No signature in this transaction"),
            BlockchainError::BadSignature => write!(f, "Transaction signature does not verify"),
            BlockchainError::KeyMismatch { expected, actual } => write!(
                f,
                "Cannot sign transactions for other wallets: sender {expected}, key {actual}"
            ),
            BlockchainError::InvalidTransaction(reason) => {
                write!(f, "Invalid transaction: {reason}")
            }
            BlockchainError::InsufficientCommitment { provided, minimum } => write!(
                f,
                "Insufficient commitment: provided {provided}, minimum {minimum}"
            ),
            BlockchainError::ChainCorrupt { height, reason } => {
                write!(f, "Chain corrupt at height {height}: {reason}")
            }
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BlockchainError {
    fn from(err: toml::ser::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
