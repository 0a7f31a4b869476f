//! Timestamp sources for transactions and blocks.
//!
//! Timestamps are hash inputs and ordering hints only. The ledger never relies on
//! wall-clock accuracy, but it does rely on them never going backwards.

use crate::error::Result;
use crate::utils::current_timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Supplies monotonically non-decreasing millisecond timestamps
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Result<i64>;
}

/// Wall clock clamped so that a backwards system-time step never yields an older value
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            last: AtomicI64::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> Result<i64> {
        let now = current_timestamp()?;
        let previous = self.last.fetch_max(now, Ordering::SeqCst);
        Ok(previous.max(now))
    }
}

/// Clock that only moves when told to; every read advances it by `step` milliseconds
#[derive(Debug)]
pub struct ManualClock {
    current: AtomicI64,
    step: i64,
}

impl ManualClock {
    pub fn new(start: i64) -> ManualClock {
        Self::with_step(start, 1)
    }

    pub fn with_step(start: i64, step: i64) -> ManualClock {
        ManualClock {
            current: AtomicI64::new(start),
            step: step.max(0),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.current.fetch_add(millis.max(0), Ordering::SeqCst);
    }

    pub fn peek(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Result<i64> {
        Ok(self.current.fetch_add(self.step, Ordering::SeqCst))
    }
}
