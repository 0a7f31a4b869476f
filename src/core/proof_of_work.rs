use crate::core::Block;
use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::{debug, warn};
use num_bigint::{BigInt, Sign};
use std::borrow::Borrow;
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Bits per hex digit of difficulty
const BITS_PER_DIGIT: u32 = 4;

// How often the search reports progress at debug level
const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Stops an in-flight nonce search. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Token that also reports cancelled once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> CancellationToken {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}

pub struct ProofOfWork {
    // Hash input before and after the nonce; only the nonce changes per attempt
    head: Vec<u8>,
    tail: Vec<u8>,
    target: BigInt,
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new_proof_of_work(block: &Block) -> Result<ProofOfWork> {
        let difficulty = block.get_difficulty();
        let (head, tail) = block.hash_input_parts()?;
        Ok(ProofOfWork {
            head,
            tail,
            target: Self::target(difficulty),
            difficulty,
        })
    }

    /// `2^(256 - 4·difficulty)`: a hash is below it iff its first `difficulty` hex digits are zero
    pub fn target(difficulty: u32) -> BigInt {
        let difficulty = difficulty.min(crate::core::monetary::MAX_DIFFICULTY);
        let mut target = BigInt::from(1);
        target.shl_assign(256 - BITS_PER_DIGIT * difficulty);
        target
    }

    /// Whether a hex digest satisfies `difficulty`
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let bytes = match HEXLOWER.decode(hash.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let hash_int = BigInt::from_bytes_be(Sign::Plus, bytes.as_slice());
        hash_int < Self::target(difficulty)
    }

    /// Validate proof-of-work for a block at the difficulty it declares
    pub fn validate(block: &Block) -> bool {
        match block.calculate_hash() {
            Ok(hash) => hash == block.get_hash() && Self::meets_difficulty(&hash, block.get_difficulty()),
            Err(_) => false,
        }
    }

    fn prepare_data(&self, nonce: u64) -> Result<Vec<u8>> {
        let mut data_bytes = Vec::with_capacity(self.head.len() + self.tail.len() + 10);
        data_bytes.extend(&self.head);
        data_bytes.extend(serialize(&nonce)?);
        data_bytes.extend(&self.tail);
        Ok(data_bytes)
    }

    /// Hash of the block data at `nonce`
    pub fn hash_at(&self, nonce: u64) -> Result<String> {
        let data = self.prepare_data(nonce)?;
        Ok(HEXLOWER.encode(sha256_digest(data.as_slice()).as_slice()))
    }

    /// Search nonces from zero until the hash meets the target.
    ///
    /// Returns `None` if the token is cancelled first. The token is checked
    /// before every attempt.
    pub fn run(&self, cancel: &CancellationToken) -> Result<Option<(u64, String)>> {
        let mut nonce: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!("Nonce search cancelled after {nonce} attempts");
                return Ok(None);
            }

            let data = self.prepare_data(nonce)?;
            let hash = sha256_digest(data.as_slice());
            let hash_int = BigInt::from_bytes_be(Sign::Plus, hash.as_slice());
            if hash_int.lt(self.target.borrow()) {
                debug!(
                    "Nonce {nonce} satisfies difficulty {}",
                    self.difficulty
                );
                return Ok(Some((nonce, HEXLOWER.encode(hash.as_slice()))));
            }

            if nonce > 0 && nonce % PROGRESS_INTERVAL == 0 {
                debug!("Still searching at nonce {nonce} (difficulty {})", self.difficulty);
            }
            nonce = match nonce.checked_add(1) {
                Some(next) => next,
                None => {
                    warn!("Nonce space exhausted at difficulty {}", self.difficulty);
                    return Ok(None);
                }
            };
        }
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }
}
