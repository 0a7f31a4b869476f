//! In-process storage
//!
//! The ledger keeps no persistent state. This module holds the pending pool
//! transactions wait in between submission and mining.

pub mod memory_pool;

pub use memory_pool::MemoryPool;
