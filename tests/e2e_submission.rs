// tests/e2e_submission.rs
//
// End-to-end pipeline: intake → rate limit → credibility → points → XP ledger.

use std::sync::Arc;

use kleo_rewards::clock::ManualClock;
use kleo_rewards::config::KleoConfig;
use kleo_rewards::credibility::SourceTable;
use kleo_rewards::fetch::{DisabledFetcher, StaticFetcher};
use kleo_rewards::storage::{DynStorage, JsonFileStorage, MemoryStorage};
use kleo_rewards::submission::{ContentType, MediaType, Submission};
use kleo_rewards::{KleoError, SubmissionService};

fn service_with(store: DynStorage, clock: &ManualClock) -> SubmissionService {
    SubmissionService::new(
        &KleoConfig::default(),
        SourceTable::default_seed(),
        store,
        Arc::new(clock.clone()),
        Arc::new(DisabledFetcher),
    )
}

fn video_story(id: &str) -> Submission {
    Submission {
        identity_key: id.into(),
        content_type: ContentType::Story,
        media_type: MediaType::Video,
        text: "Flooding on 5th street this morning".into(),
        title: None,
        url: None,
        lat: 40.71,
        lng: -74.0,
        wallet_address: None,
        has_email_pairing: false,
    }
}

#[tokio::test]
async fn video_story_then_rate_limited_retry() {
    let clock = ManualClock::at_epoch_2025();
    let svc = service_with(MemoryStorage::shared(), &clock);

    let out = svc.submit(&video_story("0xABC")).await.expect("first submit");
    assert_eq!(out.points, 6);
    assert_eq!(out.xp.total_xp, 6);
    assert_eq!(out.xp.post_count, 1);
    assert!(out.credibility.is_none());

    clock.advance_ms(30_000);
    match svc.submit(&video_story("0xABC")).await {
        Err(KleoError::RateLimited {
            time_remaining_ms,
            formatted,
        }) => {
            assert_eq!(time_remaining_ms, 270_000);
            assert_eq!(formatted, "4:30");
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    // No reward for the denied attempt.
    let rec = svc.ledger().get_xp("0xABC");
    assert_eq!(rec.total_xp, 6);
    assert_eq!(rec.post_count, 1);

    clock.advance_ms(270_000);
    let out = svc.submit(&video_story("0xABC")).await.expect("after cooldown");
    assert_eq!(out.xp.total_xp, 12);
    assert_eq!(out.xp.post_count, 2);
}

#[tokio::test]
async fn verified_reliable_news_earns_full_bonus() {
    let clock = ManualClock::at_epoch_2025();
    let url = "https://www.reuters.com/world/harbor";
    let fetcher = StaticFetcher::new().with_article(
        url,
        "Harbor reopens",
        "By Ana Ruiz. Published 2024-05-01. Traffic rose 12%, according to port officials.",
    );
    let svc = SubmissionService::new(
        &KleoConfig::default(),
        SourceTable::default_seed(),
        MemoryStorage::shared(),
        Arc::new(clock.clone()),
        Arc::new(fetcher),
    );

    let sub = Submission {
        identity_key: "0xDEF".into(),
        content_type: ContentType::News,
        media_type: MediaType::Video,
        text: String::new(),
        title: None,
        url: Some(url.into()),
        lat: 0.0,
        lng: 0.0,
        wallet_address: Some("0xDEF".into()),
        has_email_pairing: true,
    };
    let out = svc.submit(&sub).await.expect("submit news");
    assert_eq!(out.points, 1 + 10 + 5 + 3);
    assert_eq!(out.breakdown.reliable_news, 10);
    assert!(out.credibility.expect("credibility").is_reliable);
}

#[tokio::test]
async fn unreliable_news_gets_base_only() {
    let clock = ManualClock::at_epoch_2025();
    let svc = service_with(MemoryStorage::shared(), &clock);
    let sub = Submission {
        identity_key: "0x123".into(),
        content_type: ContentType::News,
        media_type: MediaType::Text,
        text: "SHOCKING cover-up they don't want you to know".into(),
        title: Some("Wake up".into()),
        url: Some("https://infowars.com/x".into()),
        lat: 0.0,
        lng: 0.0,
        wallet_address: None,
        has_email_pairing: false,
    };
    let out = svc.submit(&sub).await.expect("submit");
    assert_eq!(out.points, 1);
    assert!(!out.credibility.expect("credibility").is_reliable);
}

#[tokio::test]
async fn file_storage_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("kleo.json");
    let clock = ManualClock::at_epoch_2025();

    {
        let store: DynStorage = Arc::new(JsonFileStorage::open(&path).expect("open"));
        let svc = service_with(store, &clock);
        svc.submit(&video_story("0xABC")).await.expect("submit");
    }

    let store: DynStorage = Arc::new(JsonFileStorage::open(&path).expect("reopen"));
    let svc = service_with(store, &clock);
    assert_eq!(svc.ledger().get_xp("0xABC").total_xp, 6);
    assert!(!svc.rate_limiter().can_submit("0xABC").allowed);
}

#[tokio::test]
async fn concurrent_submissions_award_once() {
    let clock = ManualClock::at_epoch_2025();
    let svc = Arc::new(service_with(MemoryStorage::shared(), &clock));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let svc = svc.clone();
        tasks.push(tokio::spawn(async move {
            svc.submit(&video_story("0xRACE")).await.is_ok()
        }));
    }
    let mut accepted = 0;
    for t in tasks {
        if t.await.expect("join") {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(svc.ledger().get_xp("0xRACE").total_xp, 6);
}
