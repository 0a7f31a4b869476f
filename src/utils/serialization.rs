// Canonical encoding used as the exact byte input of every content hash.
// bincode's standard configuration is fixed here and nowhere else.
use crate::error::{BlockchainError, Result};
use serde::Deserialize;

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}
