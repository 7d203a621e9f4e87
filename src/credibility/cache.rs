//! Credibility result cache keyed by URL digest, with absolute TTL.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CredibilityResult;
use crate::clock::DynClock;
use crate::logging::anon_id;
use crate::storage::{load_json, save_json, DynStorage, StorageResult};

pub const KEY_PREFIX: &str = "credibility:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCredibility {
    pub result: CredibilityResult,
    pub analyzed_at_ms: i64,
}

pub struct CredibilityCache {
    store: DynStorage,
    clock: DynClock,
    ttl: Duration,
}

impl CredibilityCache {
    pub fn new(store: DynStorage, clock: DynClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Cached result for `url` if present and younger than the TTL.
    pub fn get(&self, url: &str) -> Option<CredibilityResult> {
        let cached = match load_json::<CachedCredibility>(self.store.as_ref(), &cache_key(url)) {
            Ok(c) => c?,
            Err(e) => {
                warn!(target: "credibility", url = %anon_id(url), error = %e, "unreadable cache entry");
                return None;
            }
        };
        let age = self.clock.now_ms().saturating_sub(cached.analyzed_at_ms);
        (age < self.ttl.num_milliseconds()).then_some(cached.result)
    }

    pub fn put(&self, url: &str, result: &CredibilityResult) -> StorageResult<()> {
        let entry = CachedCredibility {
            result: result.clone(),
            analyzed_at_ms: self.clock.now_ms(),
        };
        save_json(self.store.as_ref(), &cache_key(url), &entry)
    }
}

fn cache_key(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.trim().as_bytes());
    let mut key = String::with_capacity(KEY_PREFIX.len() + 64);
    key.push_str(KEY_PREFIX);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut key, "{:02x}", b);
    }
    key
}
