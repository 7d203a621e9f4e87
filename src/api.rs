use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::clock::SystemClock;
use crate::config::KleoConfig;
use crate::credibility::{CredibilityResult, SourceCredibility};
use crate::error::KleoError;
use crate::metrics::Metrics;
use crate::rate_limit::format_remaining;
use crate::rewards::{level_progress, LeaderboardEntry, LevelProgress, UserXpRecord};
use crate::service::{SubmissionOutcome, SubmissionService};
use crate::submission::Submission;

pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";
const MAX_LEADERBOARD: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SubmissionService>,
    pub leaderboard_size: usize,
}

impl AppState {
    pub fn new(service: SubmissionService, cfg: &KleoConfig) -> Self {
        Self {
            service: Arc::new(service),
            leaderboard_size: cfg.api.leaderboard_size,
        }
    }
}

/// Full app from config + env: service, routes, optional debug/metrics routes.
pub fn app() -> anyhow::Result<Router> {
    let cfg = KleoConfig::load()?;
    let service = SubmissionService::from_config(&cfg, Arc::new(SystemClock))?;
    let state = AppState::new(service, &cfg);

    let mut router = router(state.clone());
    if debug_routes_enabled() {
        let metrics = Metrics::init(cfg.rate_limit.cooldown_secs)?;
        router = router.merge(metrics.router()).merge(admin_router(state));
    }
    Ok(router)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/submit", post(submit))
        .route("/credibility", post(analyze_credibility))
        .route("/credibility/source", get(source_credibility))
        .route("/rate-limit/{identity}", get(rate_limit_status))
        .route("/xp/{identity}", get(xp_for))
        .route("/leaderboard", get(leaderboard))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Administrative resets, mounted only with `DEBUG_ROUTES=1`.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/rate-limit/{identity}", delete(admin_clear_rate_limit))
        .route("/admin/rate-limit", delete(admin_clear_all_rate_limits))
        .with_state(state)
}

fn debug_routes_enabled() -> bool {
    std::env::var(ENV_DEBUG_ROUTES).ok().as_deref() == Some("1")
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_in: Option<String>,
}

pub struct ApiError(KleoError);

impl From<KleoError> for ApiError {
    fn from(e: KleoError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            KleoError::RateLimited {
                time_remaining_ms,
                formatted,
            } => {
                let retry_after_secs = ((time_remaining_ms.max(0) + 999) / 1000).to_string();
                let body = ErrorBody {
                    error: "rate_limited".into(),
                    time_remaining_ms: Some(time_remaining_ms),
                    retry_in: Some(formatted),
                };
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_secs)],
                    Json(body),
                )
                    .into_response()
            }
            KleoError::InvalidSubmission(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: msg,
                    time_remaining_ms: None,
                    retry_in: None,
                }),
            )
                .into_response(),
            KleoError::Storage(e) => {
                error!(target: "kleo", error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "storage_error".into(),
                        time_remaining_ms: None,
                        retry_in: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

/* ----------------------------
Handlers
---------------------------- */

async fn submit(
    State(state): State<AppState>,
    Json(body): Json<Submission>,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    let out = state.service.submit(&body).await?;
    Ok(Json(out))
}

#[derive(Deserialize)]
struct CredibilityReq {
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    title: String,
}

async fn analyze_credibility(
    State(state): State<AppState>,
    Json(body): Json<CredibilityReq>,
) -> Json<CredibilityResult> {
    Json(
        state
            .service
            .scorer()
            .analyze(&body.url, &body.content, &body.title),
    )
}

#[derive(Deserialize)]
struct SourceQuery {
    url: String,
}

#[derive(Serialize)]
struct SourceResp {
    #[serde(flatten)]
    source: SourceCredibility,
    known_unreliable: bool,
}

async fn source_credibility(
    State(state): State<AppState>,
    Query(q): Query<SourceQuery>,
) -> Json<SourceResp> {
    let scorer = state.service.scorer();
    Json(SourceResp {
        source: scorer.get_source_credibility(&q.url),
        known_unreliable: scorer.is_known_unreliable_source(&q.url),
    })
}

#[derive(Serialize)]
struct RateLimitResp {
    allowed: bool,
    time_remaining_ms: i64,
    formatted: String,
}

async fn rate_limit_status(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Json<RateLimitResp> {
    let s = state.service.rate_limiter().can_submit(&identity);
    Json(RateLimitResp {
        allowed: s.allowed,
        time_remaining_ms: s.time_remaining_ms,
        formatted: format_remaining(s.time_remaining_ms),
    })
}

#[derive(Serialize)]
struct XpResp {
    #[serde(flatten)]
    record: UserXpRecord,
    progress: LevelProgress,
}

async fn xp_for(State(state): State<AppState>, Path(identity): Path<String>) -> Json<XpResp> {
    let record = state.service.ledger().get_xp(&identity);
    let progress = level_progress(record.total_xp);
    Json(XpResp { record, progress })
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    top: Option<usize>,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> Json<Vec<LeaderboardEntry>> {
    let n = q.top.unwrap_or(state.leaderboard_size).min(MAX_LEADERBOARD);
    Json(state.service.ledger().leaderboard(n))
}

async fn admin_clear_rate_limit(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .rate_limiter()
        .clear(&identity)
        .map_err(KleoError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_clear_all_rate_limits(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .service
        .rate_limiter()
        .clear_all()
        .map_err(KleoError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
