use crate::error::{BlockchainError, Result};
use zeroize::ZeroizeOnDrop;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
/// Length in bytes of an uncompressed P-256 public key
pub const PUBLIC_KEY_LEN: usize = 65;
/// Length in characters of an address (hex-encoded public key)
pub const ADDRESS_LEN: usize = PUBLIC_KEY_LEN * 2;

/// Anything that can sign on behalf of an address.
///
/// The ledger never generates or stores private keys; it only asks a provider for
/// its public key, its address and a signature over a digest.
pub trait KeyProvider {
    fn public_key(&self) -> &[u8];

    fn address(&self) -> String {
        address_from_public_key(self.public_key())
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>>;
}

/// ECDSA P-256 key pair held as PKCS#8 bytes, wiped from memory on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        Self::from_pkcs8(pkcs8)
    }

    /// Load a wallet from an existing PKCS#8 document
    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<Wallet> {
        let public_key = crate::utils::public_key_from_pkcs8(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        address_from_public_key(&self.public_key)
    }

    /// Short base58 form of the address for display
    pub fn get_fingerprint(&self) -> String {
        fingerprint(&self.public_key)
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

impl KeyProvider for Wallet {
    fn public_key(&self) -> &[u8] {
        self.get_public_key()
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        crate::utils::ecdsa_p256_sha256_sign_digest(&self.pkcs8, digest)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("fingerprint", &self.get_fingerprint())
            .finish()
    }
}

/// An address is the lowercase hex of the uncompressed public key, so that any
/// holder of the address can verify signatures made by its owner.
pub fn address_from_public_key(pub_key: &[u8]) -> String {
    hex::encode(pub_key)
}

pub fn public_key_from_address(address: &str) -> Result<Vec<u8>> {
    if address.len() != ADDRESS_LEN {
        return Err(BlockchainError::InvalidAddress(format!(
            "expected {ADDRESS_LEN} hex characters, got {}",
            address.len()
        )));
    }
    let pub_key = hex::decode(address)
        .map_err(|e| BlockchainError::InvalidAddress(format!("{address}: {e}")))?;
    // one spelling per key, otherwise balances split across aliases
    if address_from_public_key(&pub_key) != address {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: not lowercase hex"
        )));
    }
    Ok(pub_key)
}

pub fn validate_address(address: &str) -> bool {
    public_key_from_address(address).is_ok()
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = crate::utils::sha256_digest(pub_key);
    crate::utils::ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = crate::utils::sha256_digest(payload);
    let second_sha = crate::utils::sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

/// version + ripemd160(sha256(pub_key)) + checksum, base58 encoded
pub fn fingerprint(pub_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(hash_pub_key(pub_key));
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    crate::utils::base58_encode(payload.as_slice())
}

/// Display helper: fingerprint for well-formed addresses, the raw text otherwise
pub fn short_address(address: &str) -> String {
    match public_key_from_address(address) {
        Ok(pub_key) => fingerprint(&pub_key),
        Err(_) => address.to_string(),
    }
}

pub fn validate_fingerprint(value: &str) -> bool {
    let payload = match crate::utils::base58_decode(value) {
        Ok(payload) => payload,
        Err(_) => return false,
    };

    if payload.len() < ADDRESS_CHECK_SUM_LEN + 1 {
        return false;
    }

    let (body, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    checksum(body).as_slice() == actual_checksum
}
