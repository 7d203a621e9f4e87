//! Per-identity XP totals.
//!
//! `add_xp` is a locked read-modify-write per identity; totals only grow.
//! Reads never fail: unreadable records count as zero.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{info, warn};

use super::levels::level_for;
use crate::clock::DynClock;
use crate::logging::anon_id;
use crate::storage::{load_json, save_json, DynStorage, KeyLocks, StorageResult};

pub const KEY_PREFIX: &str = "xp:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserXpRecord {
    pub identity_key: String,
    pub total_xp: u64,
    pub post_count: u64,
    /// `None` until the first award.
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserXpRecord {
    pub fn empty(identity_key: &str) -> Self {
        Self {
            identity_key: identity_key.to_string(),
            total_xp: 0,
            post_count: 0,
            last_updated: None,
        }
    }

    pub fn level(&self) -> u32 {
        level_for(self.total_xp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub identity_key: String,
    pub total_xp: u64,
    pub level: u32,
    pub post_count: u64,
}

pub struct XpLedger {
    store: DynStorage,
    clock: DynClock,
    locks: KeyLocks,
}

impl XpLedger {
    pub fn new(store: DynStorage, clock: DynClock) -> Self {
        Self {
            store,
            clock,
            locks: KeyLocks::new(),
        }
    }

    /// Credit `points` and count one post.
    pub fn add_xp(&self, identity_key: &str, points: u32) -> StorageResult<UserXpRecord> {
        self.locks.with_lock(identity_key, || {
            let mut rec = self.get_xp(identity_key);
            rec.total_xp = rec.total_xp.saturating_add(u64::from(points));
            rec.post_count = rec.post_count.saturating_add(1);
            rec.last_updated = Some(self.clock.now());
            save_json(self.store.as_ref(), &storage_key(identity_key), &rec)?;

            info!(
                target: "rewards",
                id = %anon_id(identity_key),
                points,
                total_xp = rec.total_xp,
                level = rec.level(),
                "xp awarded"
            );
            counter!("rewards_xp_awarded_total").increment(u64::from(points));
            Ok(rec)
        })?
    }

    pub fn get_xp(&self, identity_key: &str) -> UserXpRecord {
        match load_json::<UserXpRecord>(self.store.as_ref(), &storage_key(identity_key)) {
            Ok(Some(rec)) => rec,
            Ok(None) => UserXpRecord::empty(identity_key),
            Err(e) => {
                warn!(
                    target: "rewards",
                    id = %anon_id(identity_key),
                    error = %e,
                    "unreadable xp record, treating as empty"
                );
                UserXpRecord::empty(identity_key)
            }
        }
    }

    /// Top `top_n` identities by total XP. Ties: more posts first, then key.
    pub fn leaderboard(&self, top_n: usize) -> Vec<LeaderboardEntry> {
        let rows = match self.store.scan_prefix(KEY_PREFIX) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(target: "rewards", error = %e, "leaderboard scan failed");
                return Vec::new();
            }
        };

        let mut entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_str::<UserXpRecord>(&raw) {
                Ok(rec) => Some(rec),
                Err(e) => {
                    warn!(target: "rewards", key = %anon_id(&key), error = %e, "skipping unreadable xp record");
                    None
                }
            })
            .map(|rec| LeaderboardEntry {
                level: rec.level(),
                identity_key: rec.identity_key,
                total_xp: rec.total_xp,
                post_count: rec.post_count,
            })
            .collect();

        entries.sort_by(|a, b| {
            (Reverse(a.total_xp), Reverse(a.post_count), &a.identity_key)
                .cmp(&(Reverse(b.total_xp), Reverse(b.post_count), &b.identity_key))
        });
        entries.truncate(top_n);
        entries
    }
}

fn storage_key(identity_key: &str) -> String {
    format!("{KEY_PREFIX}{identity_key}")
}
