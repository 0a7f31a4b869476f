use crate::core::Transaction;
use std::collections::HashSet;
use std::sync::RwLock;

/// Pending transactions in arrival order
pub struct MemoryPool {
    inner: RwLock<Vec<Transaction>>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            inner: RwLock::new(Vec::new()),
        }
    }

    pub fn get(&self, hash: &str) -> Option<Transaction> {
        match self.inner.read() {
            Ok(pool) => pool.iter().find(|tx| tx.get_hash() == hash).cloned(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                None
            }
        }
    }

    /// Append a transaction. Returns false if one with the same content hash is already pending.
    pub fn add(&self, tx: Transaction) -> bool {
        match self.inner.write() {
            Ok(mut pool) => {
                if pool.iter().any(|pending| pending.get_hash() == tx.get_hash()) {
                    return false;
                }
                pool.push(tx);
                true
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on memory pool");
                false
            }
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.iter().any(|tx| tx.get_hash() == hash),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                false
            }
        }
    }

    /// Copy of the pool at this instant, in arrival order
    pub fn snapshot(&self) -> Vec<Transaction> {
        match self.inner.read() {
            Ok(pool) => pool.clone(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                Vec::new()
            }
        }
    }

    /// Drop the transactions a sealed block was built from. Anything that arrived
    /// after the snapshot stays, in order.
    pub fn remove_mined(&self, hashes: &[String]) -> usize {
        let mined: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        match self.inner.write() {
            Ok(mut pool) => {
                let before = pool.len();
                pool.retain(|tx| !mined.contains(tx.get_hash()));
                before - pool.len()
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on memory pool");
                0
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(pool) => pool.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                0
            }
        }
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut pool) => {
                pool.clear();
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on memory pool");
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.is_empty(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                true
            }
        }
    }
}
