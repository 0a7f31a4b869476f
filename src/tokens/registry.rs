use crate::error::{BlockchainError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Supply every genesis asset was issued with
pub const GENESIS_SUPPLY: u64 = 37_867_890_284;
pub const DEFAULT_DECIMALS: u8 = 18;
const MAX_DECIMALS: u8 = 18;
const MAX_SYMBOL_LEN: usize = 16;

/// The six assets every registry starts with
pub static GENESIS_ASSETS: Lazy<Vec<Asset>> = Lazy::new(|| {
    [
        ("AGT", "Advanced Genetic Synthesis Technology"),
        ("AGOLD", "AGT Gold"),
        ("BTCYT", "Bitcoinayt"),
        ("S96t'", "Sealofapprovalis7628396t' S96t'"),
        ("BTC", "Bitcoin"),
        ("GTPS", "Global Transaction Payment Solution"),
    ]
    .into_iter()
    .map(|(symbol, name)| Asset {
        symbol: symbol.to_string(),
        name: name.to_string(),
        decimals: DEFAULT_DECIMALS,
        total_supply: GENESIS_SUPPLY,
    })
    .collect()
});

/// Token metadata. Constructed through [`Asset::new`], which is the only place it is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    symbol: String,
    name: String,
    decimals: u8,
    total_supply: u64,
}

impl Asset {
    pub fn new(symbol: &str, name: &str, decimals: u8, total_supply: u64) -> Result<Asset> {
        if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
            return Err(BlockchainError::Config(format!(
                "Asset symbol must be 1-{MAX_SYMBOL_LEN} characters: {symbol:?}"
            )));
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(BlockchainError::Config(format!(
                "Asset symbol cannot contain whitespace: {symbol:?}"
            )));
        }
        if decimals > MAX_DECIMALS {
            return Err(BlockchainError::Config(format!(
                "Asset decimals {decimals} exceed maximum {MAX_DECIMALS}"
            )));
        }
        if total_supply == 0 {
            return Err(BlockchainError::Config(format!(
                "Asset {symbol} must have a non-zero supply"
            )));
        }

        Ok(Asset {
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            total_supply,
        })
    }

    pub fn get_symbol(&self) -> &str {
        &self.symbol
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_total_supply(&self) -> u64 {
        self.total_supply
    }
}

/// What the ledger needs to know about assets: whether a symbol exists and its precision
pub trait TokenRegistry: Send + Sync {
    fn exists(&self, symbol: &str) -> bool;

    fn decimals(&self, symbol: &str) -> Option<u8>;

    fn asset(&self, symbol: &str) -> Option<Asset>;

    /// All registered assets, ordered by symbol
    fn assets(&self) -> Vec<Asset>;
}

#[derive(Debug)]
pub struct InMemoryTokenRegistry {
    inner: RwLock<BTreeMap<String, Asset>>,
}

impl Default for InMemoryTokenRegistry {
    fn default() -> Self {
        Self::with_genesis_assets()
    }
}

impl InMemoryTokenRegistry {
    pub fn empty() -> InMemoryTokenRegistry {
        InMemoryTokenRegistry {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_genesis_assets() -> InMemoryTokenRegistry {
        let registry = Self::empty();
        if let Ok(mut inner) = registry.inner.write() {
            for asset in GENESIS_ASSETS.iter() {
                inner.insert(asset.symbol.clone(), asset.clone());
            }
        }
        registry
    }

    pub fn register(&self, asset: Asset) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| BlockchainError::Config("Token registry lock poisoned".to_string()))?;
        if inner.contains_key(&asset.symbol) {
            return Err(BlockchainError::Config(format!(
                "Token {} already exists",
                asset.symbol
            )));
        }
        log::info!("Registered token {} ({})", asset.symbol, asset.name);
        inner.insert(asset.symbol.clone(), asset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on token registry");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenRegistry for InMemoryTokenRegistry {
    fn exists(&self, symbol: &str) -> bool {
        match self.inner.read() {
            Ok(inner) => inner.contains_key(symbol),
            Err(_) => {
                log::error!("Failed to acquire read lock on token registry");
                false
            }
        }
    }

    fn decimals(&self, symbol: &str) -> Option<u8> {
        self.asset(symbol).map(|asset| asset.decimals)
    }

    fn asset(&self, symbol: &str) -> Option<Asset> {
        match self.inner.read() {
            Ok(inner) => inner.get(symbol).cloned(),
            Err(_) => {
                log::error!("Failed to acquire read lock on token registry");
                None
            }
        }
    }

    fn assets(&self) -> Vec<Asset> {
        match self.inner.read() {
            Ok(inner) => inner.values().cloned().collect(),
            Err(_) => {
                log::error!("Failed to acquire read lock on token registry");
                Vec::new()
            }
        }
    }
}
