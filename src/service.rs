// src/service.rs
//! Submission pipeline.
//!
//! Order:
//! 1) Intake validation
//! 2) Rate limit (atomic check + record; denied requests stop here)
//! 3) News only: credibility (cache → article fetch → user text fallback;
//!    only fetched articles are cached)
//! 4) Points + XP ledger update

use chrono::Duration;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::DynClock;
use crate::config::{KleoConfig, StorageBackend, MAX_DURATION_SECS};
use crate::credibility::{
    normalize_article_text, CredibilityCache, CredibilityResult, CredibilityScorer, SourceTable,
};
use crate::error::{KleoError, KleoResult};
use crate::fetch::{Article, DisabledFetcher, DynFetcher, HttpArticleFetcher};
use crate::logging::anon_id;
use crate::rate_limit::{format_remaining, RateLimiter};
use crate::rewards::{
    level_progress, LevelProgress, PointsBreakdown, RewardCalculator, UserXpRecord, XpLedger,
};
use crate::storage::{DynStorage, JsonFileStorage, MemoryStorage};
use crate::submission::{ContentType, Submission};

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub identity_key: String,
    pub points: u32,
    pub breakdown: PointsBreakdown,
    pub xp: UserXpRecord,
    pub level: LevelProgress,
    pub credibility: Option<CredibilityResult>,
    pub credibility_cached: bool,
}

pub struct SubmissionService {
    rate_limiter: RateLimiter,
    scorer: CredibilityScorer,
    cache: CredibilityCache,
    calculator: RewardCalculator,
    ledger: XpLedger,
    fetcher: DynFetcher,
}

impl SubmissionService {
    pub fn new(
        cfg: &KleoConfig,
        sources: SourceTable,
        store: DynStorage,
        clock: DynClock,
        fetcher: DynFetcher,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(
                store.clone(),
                clock.clone(),
                bounded_secs(cfg.rate_limit.cooldown_secs),
            ),
            scorer: CredibilityScorer::new(sources),
            cache: CredibilityCache::new(
                store.clone(),
                clock.clone(),
                bounded_secs(cfg.credibility.cache_ttl_secs),
            ),
            calculator: RewardCalculator::new(cfg.rewards),
            ledger: XpLedger::new(store, clock),
            fetcher,
        }
    }

    /// Wire everything from config: storage backend, source table, fetcher.
    pub fn from_config(cfg: &KleoConfig, clock: DynClock) -> anyhow::Result<Self> {
        let store: DynStorage = match cfg.storage.backend {
            StorageBackend::Memory => MemoryStorage::shared(),
            StorageBackend::File => Arc::new(JsonFileStorage::open(&cfg.storage.path)?),
        };
        let sources = SourceTable::load_from_file(&cfg.credibility.sources_path);
        let fetcher: DynFetcher = if cfg.fetch.enabled {
            Arc::new(HttpArticleFetcher::new(std::time::Duration::from_secs(
                cfg.fetch.timeout_secs,
            ))?)
        } else {
            Arc::new(DisabledFetcher)
        };
        info!(
            target: "kleo",
            backend = ?cfg.storage.backend,
            cooldown_secs = cfg.rate_limit.cooldown_secs,
            sources = sources.len(),
            fetcher = fetcher.name(),
            "submission service ready"
        );
        Ok(Self::new(cfg, sources, store, clock, fetcher))
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn scorer(&self) -> &CredibilityScorer {
        &self.scorer
    }

    pub fn calculator(&self) -> &RewardCalculator {
        &self.calculator
    }

    pub fn ledger(&self) -> &XpLedger {
        &self.ledger
    }

    pub async fn submit(&self, submission: &Submission) -> KleoResult<SubmissionOutcome> {
        if let Err(e) = submission.validate() {
            counter!("submissions_total", "outcome" => "invalid").increment(1);
            return Err(e);
        }
        let id = submission.identity_key.as_str();

        let status = self.rate_limiter.try_acquire(id)?;
        if !status.allowed {
            counter!("submissions_total", "outcome" => "rate_limited").increment(1);
            info!(
                target: "submission",
                id = %anon_id(id),
                remaining_ms = status.time_remaining_ms,
                "submission rate limited"
            );
            return Err(KleoError::RateLimited {
                time_remaining_ms: status.time_remaining_ms,
                formatted: format_remaining(status.time_remaining_ms),
            });
        }

        let (credibility, credibility_cached) = match submission.content_type {
            ContentType::News => {
                let (r, cached) = self.credibility_for(submission).await;
                (Some(r), cached)
            }
            ContentType::Story => (None, false),
        };

        let identity = submission.identity();
        let breakdown = self
            .calculator
            .breakdown(submission, credibility.as_ref(), Some(&identity));
        let points = breakdown.total();
        let xp = self.ledger.add_xp(id, points)?;

        counter!("submissions_total", "outcome" => "accepted").increment(1);
        info!(
            target: "submission",
            id = %anon_id(id),
            content_type = ?submission.content_type,
            media_type = ?submission.media_type,
            points,
            reliable = credibility.as_ref().map(|c| c.is_reliable),
            "submission accepted"
        );

        Ok(SubmissionOutcome {
            identity_key: submission.identity_key.clone(),
            points,
            breakdown,
            level: level_progress(xp.total_xp),
            xp,
            credibility,
            credibility_cached,
        })
    }

    /// Only results computed from the fetched article are shared through the
    /// cache. A verdict on user-supplied text stays with that submission.
    async fn credibility_for(&self, submission: &Submission) -> (CredibilityResult, bool) {
        let Some(url) = submission.news_url() else {
            return (CredibilityResult::fallback(), false);
        };

        if let Some(hit) = self.cache.get(url) {
            return (hit, true);
        }

        match self.fetcher.fetch(url).await {
            Ok(a) if !a.content.trim().is_empty() => {
                let result = self.scorer.analyze(url, &a.content, &a.title);
                if let Err(e) = self.cache.put(url, &result) {
                    warn!(target: "submission", url = %anon_id(url), error = %e, "credibility cache write failed");
                }
                (result, false)
            }
            Ok(_) => (self.analyze_user_text(url, submission), false),
            Err(e) => {
                warn!(
                    target: "submission",
                    url = %anon_id(url),
                    fetcher = self.fetcher.name(),
                    error = %e,
                    "article fetch failed, using submitted text"
                );
                (self.analyze_user_text(url, submission), false)
            }
        }
    }

    fn analyze_user_text(&self, url: &str, submission: &Submission) -> CredibilityResult {
        let article = self.user_article(submission);
        self.scorer.analyze(url, &article.content, &article.title)
    }

    fn user_article(&self, submission: &Submission) -> Article {
        Article {
            title: submission
                .title
                .as_deref()
                .map(normalize_article_text)
                .unwrap_or_default(),
            content: normalize_article_text(&submission.text),
        }
    }
}

// Configs built in code skip `sanitize`; keep chrono within range.
fn bounded_secs(secs: i64) -> Duration {
    Duration::seconds(secs.clamp(0, MAX_DURATION_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fetch::StaticFetcher;
    use crate::submission::MediaType;

    fn service(fetcher: DynFetcher) -> (SubmissionService, ManualClock) {
        let clock = ManualClock::at_epoch_2025();
        let svc = SubmissionService::new(
            &KleoConfig::default(),
            SourceTable::default_seed(),
            MemoryStorage::shared(),
            Arc::new(clock.clone()),
            fetcher,
        );
        (svc, clock)
    }

    fn news(id: &str, url: &str, text: &str) -> Submission {
        Submission {
            identity_key: id.into(),
            content_type: ContentType::News,
            media_type: MediaType::Text,
            text: text.into(),
            title: Some("Harbor ferry".into()),
            url: Some(url.into()),
            lat: 1.0,
            lng: 2.0,
            wallet_address: None,
            has_email_pairing: false,
        }
    }

    #[tokio::test]
    async fn fetched_verdict_is_cached_for_later_submitters() {
        let url = "https://apnews.com/article/ferry";
        let fetcher = StaticFetcher::new().with_article(
            url,
            "Harbor ferry",
            "By Ana Ruiz. According to the port, 2,000 riders a day.",
        );
        let (svc, clock) = service(Arc::new(fetcher));

        let out = svc.submit(&news("a", url, "")).await.unwrap();
        assert_eq!(out.points, 11);
        assert!(out.credibility.as_ref().unwrap().is_reliable);
        assert!(!out.credibility_cached);

        clock.advance_ms(301_000);
        let again = svc.submit(&news("b", url, "")).await.unwrap();
        assert!(again.credibility_cached);
        assert_eq!(again.points, 11);
    }

    #[tokio::test]
    async fn user_text_verdict_is_not_shared_between_identities() {
        let (svc, _) = service(Arc::new(DisabledFetcher));
        let url = "https://www.cnn.com/world/harbor";

        let first = svc
            .submit(&news("attacker", url, "SHOCKING leaked bombshell cover-up!"))
            .await
            .unwrap();
        assert!(!first.credibility.as_ref().unwrap().is_reliable);
        assert_eq!(first.points, 1);

        let honest = news(
            "honest",
            url,
            "By Jane Doe. Published 2024-03-12. Traffic rose 12%, according to port officials.",
        );
        let second = svc.submit(&honest).await.unwrap();
        assert!(!second.credibility_cached);
        assert!(second.credibility.as_ref().unwrap().is_reliable);
        assert_eq!(second.points, 11);
    }

    #[tokio::test]
    async fn fetched_article_is_preferred_over_user_text() {
        let url = "https://unknown-blog.example/p";
        let fetcher = StaticFetcher::new().with_article(url, "Calm title", "Plain report.");
        let (svc, _) = service(Arc::new(fetcher));
        let s = news("a", url, "SHOCKING bombshell!");
        let out = svc.submit(&s).await.unwrap();
        let c = out.credibility.unwrap();
        assert!(!c.content_analysis.has_emotional_language);
        assert!(!c.is_reliable);
        assert_eq!(out.points, 1);
    }

    #[test]
    fn huge_durations_are_bounded_instead_of_panicking() {
        let mut cfg = KleoConfig::default();
        cfg.rate_limit.cooldown_secs = i64::MAX / 100;
        cfg.credibility.cache_ttl_secs = i64::MAX;
        let svc = SubmissionService::new(
            &cfg,
            SourceTable::default_seed(),
            MemoryStorage::shared(),
            Arc::new(ManualClock::at_epoch_2025()),
            Arc::new(DisabledFetcher),
        );
        assert_eq!(
            svc.rate_limiter().cooldown(),
            Duration::seconds(MAX_DURATION_SECS)
        );
    }

    #[tokio::test]
    async fn invalid_submission_does_not_consume_cooldown() {
        let (svc, _) = service(Arc::new(DisabledFetcher));
        let mut s = news("a", "", "text");
        s.url = None;
        assert!(matches!(
            svc.submit(&s).await,
            Err(KleoError::InvalidSubmission(_))
        ));
        assert!(svc.rate_limiter().can_submit("a").allowed);
    }
}
