// src/config/mod.rs
//! Runtime configuration: `config/kleo.toml` plus `KLEO_*` env overrides.

pub mod settings;

pub use settings::{
    ApiSection, CredibilitySection, FetchSection, KleoConfig, RateLimitSection, StorageBackend,
    StorageSection, MAX_DURATION_SECS,
};
