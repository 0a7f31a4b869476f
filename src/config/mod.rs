//! Configuration management
//!
//! Ledger parameters (base difficulty, rewards, commitment policy, fees) loaded
//! from a TOML file with `AGT_*` environment overrides on top.

pub mod settings;

pub use settings::{ChainSettings, Settings};
