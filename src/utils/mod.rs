//! Utility functions and helpers
//!
//! Hashing, signatures, encodings, timestamps and the canonical serialization
//! used as hash input everywhere in the ledger.

pub mod clock;
pub mod crypto;
pub mod serialization;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{
    base58_decode, base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, public_key_from_pkcs8, ripemd160_digest,
    sha256_digest, sha256_hex, DIGEST_LEN,
};

pub use serialization::{deserialize, serialize};
