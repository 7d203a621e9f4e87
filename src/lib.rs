// src/lib.rs
// Public library surface for the binary, bins and integration tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod credibility;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod rewards;
pub mod service;
pub mod storage;
pub mod submission;

// ---- Re-exports for stable public API ----
pub use crate::api::{app, router};
pub use crate::error::{KleoError, KleoResult};
pub use crate::service::{SubmissionOutcome, SubmissionService};
