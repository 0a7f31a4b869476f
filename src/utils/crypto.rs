use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

/// Width in bytes of every digest produced by [`sha256_digest`]
pub const DIGEST_LEN: usize = 32;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    if duration > i64::MAX as u128 {
        return Err(BlockchainError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 of `data` as lowercase hex, the form stored in transaction and block hashes
pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(data).as_slice())
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BlockchainError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(pkcs8)
}

/// Uncompressed SEC1 public key (65 bytes) of a PKCS#8 encoded key pair
pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    Ok(key_pair.public_key().as_ref().to_vec())
}

pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = ring::rand::SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

/// Returns false for any malformed key or signature bytes; never panics.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    if public_key.is_empty() || signature.is_empty() {
        return false;
    }
    let peer_public_key =
        ring::signature::UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, public_key);
    peer_public_key.verify(message, signature).is_ok()
}
