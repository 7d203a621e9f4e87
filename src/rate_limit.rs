//! # Rate Limiter
//!
//! One submission per identity per cooldown window.
//!
//! - `can_submit` is a pure read: checking never resets the cooldown.
//! - `record_submission` stamps "now" after a submission was accepted.
//! - `try_acquire` does both under a per-identity lock, so two concurrent
//!   requests for the same identity cannot both pass.
//! - Read failures are treated as "no record"; write failures propagate.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::DynClock;
use crate::logging::anon_id;
use crate::storage::{load_json, save_json, DynStorage, KeyLocks, StorageResult};

pub const KEY_PREFIX: &str = "ratelimit:";
pub const DEFAULT_COOLDOWN_SECS: i64 = 5 * 60;

/// Persisted per-identity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub identity_key: String,
    /// Milliseconds since the UNIX epoch.
    pub last_submission_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub time_remaining_ms: i64,
}

impl RateLimitStatus {
    fn open() -> Self {
        Self {
            allowed: true,
            time_remaining_ms: 0,
        }
    }
}

pub struct RateLimiter {
    store: DynStorage,
    clock: DynClock,
    cooldown: Duration,
    locks: KeyLocks,
}

impl RateLimiter {
    /// Negative cooldowns are treated as zero (no limit).
    pub fn new(store: DynStorage, clock: DynClock, cooldown: Duration) -> Self {
        Self {
            store,
            clock,
            cooldown: cooldown.max(Duration::zero()),
            locks: KeyLocks::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn can_submit(&self, identity_key: &str) -> RateLimitStatus {
        match self.read(identity_key) {
            Some(rec) => self.status_for(&rec, self.clock.now_ms()),
            None => RateLimitStatus::open(),
        }
    }

    /// Stamp the identity's last submission with the current time.
    /// Call only after the submission was accepted.
    pub fn record_submission(&self, identity_key: &str) -> StorageResult<()> {
        self.locks
            .with_lock(identity_key, || self.write_now(identity_key))?
    }

    /// Check and record atomically. Denied attempts leave state untouched.
    pub fn try_acquire(&self, identity_key: &str) -> StorageResult<RateLimitStatus> {
        self.locks.with_lock(identity_key, || {
            let status = self.can_submit(identity_key);
            if !status.allowed {
                debug!(
                    target: "rate_limit",
                    id = %anon_id(identity_key),
                    remaining_ms = status.time_remaining_ms,
                    "submission denied"
                );
                return Ok(status);
            }
            self.write_now(identity_key)?;
            Ok(status)
        })?
    }

    pub fn clear(&self, identity_key: &str) -> StorageResult<()> {
        self.store.remove(&storage_key(identity_key))
    }

    pub fn clear_all(&self) -> StorageResult<()> {
        let rows = self.store.scan_prefix(KEY_PREFIX)?;
        let n = rows.len();
        for (key, _) in rows {
            self.store.remove(&key)?;
        }
        info!(target: "rate_limit", cleared = n, "all rate limits cleared");
        Ok(())
    }

    fn status_for(&self, rec: &RateLimitRecord, now_ms: i64) -> RateLimitStatus {
        let elapsed = now_ms.saturating_sub(rec.last_submission_ms);
        let remaining = (self.cooldown.num_milliseconds() - elapsed).max(0);
        RateLimitStatus {
            allowed: remaining == 0,
            time_remaining_ms: remaining,
        }
    }

    fn read(&self, identity_key: &str) -> Option<RateLimitRecord> {
        match load_json::<RateLimitRecord>(self.store.as_ref(), &storage_key(identity_key)) {
            Ok(rec) => rec,
            Err(e) => {
                warn!(
                    target: "rate_limit",
                    id = %anon_id(identity_key),
                    error = %e,
                    "unreadable rate-limit record, treating as absent"
                );
                None
            }
        }
    }

    // Caller holds the identity lock.
    fn write_now(&self, identity_key: &str) -> StorageResult<()> {
        let now = self.clock.now_ms();
        let last = self
            .read(identity_key)
            .map(|r| r.last_submission_ms.max(now))
            .unwrap_or(now);
        let rec = RateLimitRecord {
            identity_key: identity_key.to_string(),
            last_submission_ms: last,
        };
        save_json(self.store.as_ref(), &storage_key(identity_key), &rec)
    }
}

fn storage_key(identity_key: &str) -> String {
    format!("{KEY_PREFIX}{identity_key}")
}

/// Render a remaining cooldown as `M:SS`. Partial seconds round up so a
/// non-zero remainder never shows as `0:00`.
pub fn format_remaining(ms: i64) -> String {
    let total_secs = (ms.max(0) + 999) / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
