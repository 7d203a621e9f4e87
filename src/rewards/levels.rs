//! XP → level step function.

use serde::{Deserialize, Serialize};

/// Minimum total XP for each level; index 0 is level 1.
pub const LEVEL_THRESHOLDS: [u64; 10] = [0, 50, 150, 300, 500, 800, 1200, 1700, 2300, 3000];
pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

/// Level for a total XP value. Total over all inputs, never decreasing, capped at `MAX_LEVEL`.
pub fn level_for(total_xp: u64) -> u32 {
    LEVEL_THRESHOLDS
        .iter()
        .take_while(|&&floor| total_xp >= floor)
        .count()
        .max(1) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub level_floor_xp: u64,
    /// `None` at the maximum level.
    pub next_level_xp: Option<u64>,
    pub xp_to_next_level: u64,
}

pub fn level_progress(total_xp: u64) -> LevelProgress {
    let level = level_for(total_xp);
    let idx = (level - 1) as usize;
    let next = LEVEL_THRESHOLDS.get(idx + 1).copied();
    LevelProgress {
        level,
        level_floor_xp: LEVEL_THRESHOLDS[idx],
        next_level_xp: next,
        xp_to_next_level: next.map(|n| n.saturating_sub(total_xp)).unwrap_or(0),
    }
}
