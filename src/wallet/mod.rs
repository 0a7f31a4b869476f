//! Key management for transaction signing
//!
//! Holds the key-provider seam the ledger signs through, the in-memory
//! ECDSA P-256 wallet, and the address/fingerprint helpers.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{
    address_from_public_key, fingerprint, hash_pub_key, public_key_from_address, short_address,
    validate_address, validate_fingerprint, KeyProvider, Wallet, ADDRESS_CHECK_SUM_LEN,
    ADDRESS_LEN, PUBLIC_KEY_LEN,
};
