// Fungible-token contracts: each deployed token keeps its own holder balances,
// independent of the chain's transaction history. Deploying also registers the
// asset, so a deployed symbol becomes transferable on the chain.

use crate::error::{BlockchainError, Result};
use crate::tokens::{Asset, InMemoryTokenRegistry, TokenRegistry, DEFAULT_DECIMALS};
use crate::utils::{sha256_hex, Clock};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct TokenContract {
    asset: Asset,
    contract_address: String,
    creator: String,
    deployed_at: i64,
    holders: HashMap<String, u64>,
}

impl TokenContract {
    pub fn get_asset(&self) -> &Asset {
        &self.asset
    }

    pub fn get_contract_address(&self) -> &str {
        &self.contract_address
    }

    pub fn get_creator(&self) -> &str {
        &self.creator
    }

    pub fn get_deployed_at(&self) -> i64 {
        self.deployed_at
    }

    pub fn balance_of(&self, owner: &str) -> u64 {
        self.holders.get(owner).copied().unwrap_or(0)
    }
}

/// Receipt returned by a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub symbol: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
}

pub struct TokenContracts {
    registry: InMemoryTokenRegistry,
    contracts: RwLock<HashMap<String, TokenContract>>,
    clock: Arc<dyn Clock>,
}

impl TokenContracts {
    pub fn new(registry: InMemoryTokenRegistry, clock: Arc<dyn Clock>) -> TokenContracts {
        TokenContracts {
            registry,
            contracts: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Deploy a token and credit its whole supply to `creator`
    pub fn deploy(&self, name: &str, symbol: &str, supply: u64, creator: &str) -> Result<String> {
        if creator.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Token creator cannot be empty".to_string(),
            ));
        }
        let asset = Asset::new(symbol, name, DEFAULT_DECIMALS, supply)?;
        let deployed_at = self.clock.now_millis()?;
        let contract_address = format!(
            "CONTRACT_{symbol}_{}",
            &sha256_hex(format!("{symbol}{creator}{deployed_at}").as_bytes())[..16]
        );

        let mut contracts = self.write_contracts()?;
        self.registry.register(asset.clone())?;

        let mut holders = HashMap::new();
        holders.insert(creator.to_string(), supply);
        contracts.insert(
            symbol.to_string(),
            TokenContract {
                asset,
                contract_address: contract_address.clone(),
                creator: creator.to_string(),
                deployed_at,
                holders,
            },
        );
        info!("Deployed token contract {contract_address} with supply {supply}");
        Ok(contract_address)
    }

    pub fn transfer(&self, symbol: &str, from: &str, to: &str, amount: u64) -> Result<TransferReceipt> {
        if amount == 0 {
            return Err(BlockchainError::InvalidAmount(amount));
        }
        let mut contracts = self.write_contracts()?;
        let contract = contracts
            .get_mut(symbol)
            .ok_or_else(|| BlockchainError::UnknownAsset(symbol.to_string()))?;

        let available = contract.balance_of(from);
        if available < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        contract.holders.insert(from.to_string(), available - amount);
        *contract.holders.entry(to.to_string()).or_insert(0) += amount;

        Ok(TransferReceipt {
            symbol: symbol.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
        })
    }

    pub fn balance_of(&self, symbol: &str, owner: &str) -> Result<u64> {
        self.with_contract(symbol, |contract| contract.balance_of(owner))
    }

    pub fn total_supply(&self, symbol: &str) -> Result<u64> {
        self.with_contract(symbol, |contract| contract.asset.get_total_supply())
    }

    pub fn get_contract(&self, symbol: &str) -> Option<TokenContract> {
        self.contracts
            .read()
            .ok()
            .and_then(|contracts| contracts.get(symbol).cloned())
    }

    fn with_contract<T>(&self, symbol: &str, f: impl FnOnce(&TokenContract) -> T) -> Result<T> {
        let contracts = self
            .contracts
            .read()
            .map_err(|_| BlockchainError::Config("Token contracts lock poisoned".to_string()))?;
        contracts
            .get(symbol)
            .map(f)
            .ok_or_else(|| BlockchainError::UnknownAsset(symbol.to_string()))
    }

    fn write_contracts(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, TokenContract>>> {
        self.contracts
            .write()
            .map_err(|_| BlockchainError::Config("Token contracts lock poisoned".to_string()))
    }
}

impl TokenRegistry for TokenContracts {
    fn exists(&self, symbol: &str) -> bool {
        self.registry.exists(symbol)
    }

    fn decimals(&self, symbol: &str) -> Option<u8> {
        self.registry.decimals(symbol)
    }

    fn asset(&self, symbol: &str) -> Option<Asset> {
        self.registry.asset(symbol)
    }

    fn assets(&self) -> Vec<Asset> {
        self.registry.assets()
    }
}
