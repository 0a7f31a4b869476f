//! Token registry and token contracts
//!
//! The ledger only asks whether an asset exists and how many decimals it has.
//! Everything else about tokens lives here, outside the chain core.

pub mod contract;
pub mod registry;

pub use contract::{TokenContract, TokenContracts, TransferReceipt};
pub use registry::{
    Asset, InMemoryTokenRegistry, TokenRegistry, DEFAULT_DECIMALS, GENESIS_ASSETS, GENESIS_SUPPLY,
};
