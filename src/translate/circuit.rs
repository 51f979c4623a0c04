// src/translate/circuit.rs
//! Process-wide cooldown after the AI provider reports quota exhaustion.
//!
//! Quota is shared by every request in the process, so the breaker is one atomic
//! timestamp. Writers race (last write wins) and readers may see a slightly stale
//! value; with a minutes-long cooldown neither matters, so no lock is taken.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

const NEVER: i64 = i64::MIN;

static GLOBAL: OnceLock<Arc<CircuitBreaker>> = OnceLock::new();

#[derive(Debug)]
pub struct CircuitBreaker {
    /// Unix milliseconds of the last quota failure, `NEVER` if none.
    last_failure_ms: AtomicI64,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_failure_ms: AtomicI64::new(NEVER),
            cooldown,
        }
    }

    /// The breaker shared by the whole process. The cooldown of the first caller wins.
    pub fn shared(cooldown: Duration) -> Arc<CircuitBreaker> {
        GLOBAL
            .get_or_init(|| Arc::new(CircuitBreaker::new(cooldown)))
            .clone()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// True when an AI attempt may be made at `now`.
    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        let last = self.last_failure_ms.load(Ordering::Relaxed);
        if last == NEVER {
            return true;
        }
        let cooldown_ms = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        now.timestamp_millis().saturating_sub(last) > cooldown_ms
    }

    pub fn record_failure(&self, at: DateTime<Utc>) {
        self.last_failure_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        match self.last_failure_ms.load(Ordering::Relaxed) {
            NEVER => None,
            ms => DateTime::<Utc>::from_timestamp_millis(ms),
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
