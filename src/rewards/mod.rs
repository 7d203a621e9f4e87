// src/rewards/mod.rs
//! XP rewards: point rules, per-identity ledger, levels, leaderboard.
//!
//! Point rules are additive:
//! - base for any accepted submission
//! - news whose link the credibility scorer marked reliable
//! - video media
//! - wallet + email both on file

pub mod ledger;
pub mod levels;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credibility::CredibilityResult;
use crate::submission::{ContentType, Identity, MediaType, Submission};

pub use ledger::{LeaderboardEntry, UserXpRecord, XpLedger};
pub use levels::{level_for, level_progress, LevelProgress, LEVEL_THRESHOLDS, MAX_LEVEL};

fn default_base() -> u32 {
    1
}
fn default_reliable_news() -> u32 {
    10
}
fn default_video() -> u32 {
    5
}
fn default_verified_identity() -> u32 {
    3
}

/// Point values per rule. Missing keys in config fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    #[serde(default = "default_base")]
    pub base: u32,
    #[serde(default = "default_reliable_news")]
    pub reliable_news: u32,
    #[serde(default = "default_video")]
    pub video: u32,
    #[serde(default = "default_verified_identity")]
    pub verified_identity: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            base: default_base(),
            reliable_news: default_reliable_news(),
            video: default_video(),
            verified_identity: default_verified_identity(),
        }
    }
}

/// Itemized award, useful for UI breakdowns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub base: u32,
    pub reliable_news: u32,
    pub video: u32,
    pub verified_identity: u32,
}

impl PointsBreakdown {
    pub fn total(&self) -> u32 {
        self.base
            .saturating_add(self.reliable_news)
            .saturating_add(self.video)
            .saturating_add(self.verified_identity)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewardCalculator {
    policy: RewardPolicy,
}

impl RewardCalculator {
    pub fn new(policy: RewardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    /// XP for one accepted submission.
    pub fn calculate_points(
        &self,
        submission: &Submission,
        credibility: Option<&CredibilityResult>,
        identity: Option<&Identity>,
    ) -> u32 {
        self.breakdown(submission, credibility, identity).total()
    }

    pub fn breakdown(
        &self,
        submission: &Submission,
        credibility: Option<&CredibilityResult>,
        identity: Option<&Identity>,
    ) -> PointsBreakdown {
        let p = &self.policy;
        let reliable_news = submission.content_type == ContentType::News
            && credibility.is_some_and(|c| c.is_reliable);
        let video = submission.media_type == MediaType::Video;
        let verified = identity.is_some_and(Identity::is_verified);

        let out = PointsBreakdown {
            base: p.base,
            reliable_news: if reliable_news { p.reliable_news } else { 0 },
            video: if video { p.video } else { 0 },
            verified_identity: if verified { p.verified_identity } else { 0 },
        };
        debug!(target: "rewards", ?out, total = out.total(), "points calculated");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(content_type: ContentType, media_type: MediaType) -> Submission {
        Submission {
            identity_key: "0xABC".into(),
            content_type,
            media_type,
            text: String::new(),
            title: None,
            url: None,
            lat: 0.0,
            lng: 0.0,
            wallet_address: None,
            has_email_pairing: false,
        }
    }

    fn reliable(yes: bool) -> CredibilityResult {
        let mut r = CredibilityResult::fallback();
        r.is_reliable = yes;
        r
    }

    #[test]
    fn plain_story_earns_base() {
        let calc = RewardCalculator::default();
        let s = submission(ContentType::Story, MediaType::Text);
        assert_eq!(calc.calculate_points(&s, None, None), 1);
    }

    #[test]
    fn video_story_earns_six() {
        let calc = RewardCalculator::default();
        let s = submission(ContentType::Story, MediaType::Video);
        assert_eq!(calc.calculate_points(&s, None, None), 6);
    }

    #[test]
    fn reliable_news_bonus_requires_both() {
        let calc = RewardCalculator::default();
        let news = submission(ContentType::News, MediaType::Text);
        let story = submission(ContentType::Story, MediaType::Text);

        assert_eq!(calc.calculate_points(&news, Some(&reliable(true)), None), 11);
        assert_eq!(calc.calculate_points(&news, Some(&reliable(false)), None), 1);
        assert_eq!(calc.calculate_points(&news, None, None), 1);
        assert_eq!(calc.calculate_points(&story, Some(&reliable(true)), None), 1);
    }

    #[test]
    fn verified_identity_bonus() {
        let calc = RewardCalculator::default();
        let s = submission(ContentType::News, MediaType::Video);
        let id = Identity {
            wallet_address: Some("0xABC".into()),
            email_paired: true,
        };
        let b = calc.breakdown(&s, Some(&reliable(true)), Some(&id));
        assert_eq!(
            b,
            PointsBreakdown {
                base: 1,
                reliable_news: 10,
                video: 5,
                verified_identity: 3
            }
        );
        assert_eq!(b.total(), 19);

        let half = Identity {
            wallet_address: Some("0xABC".into()),
            email_paired: false,
        };
        assert_eq!(calc.calculate_points(&s, None, Some(&half)), 6);
    }

    #[test]
    fn policy_overrides_from_toml() {
        let p: RewardPolicy = toml::from_str("video = 8").unwrap();
        assert_eq!(p.video, 8);
        assert_eq!(p.base, 1);
        let calc = RewardCalculator::new(p);
        let s = submission(ContentType::Story, MediaType::Video);
        assert_eq!(calc.calculate_points(&s, None, None), 9);
    }
}
