// src/config/settings.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::rate_limit::DEFAULT_COOLDOWN_SECS;
use crate::rewards::RewardPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/kleo.toml";
pub const ENV_CONFIG_PATH: &str = "KLEO_CONFIG_PATH";
pub const ENV_COOLDOWN_SECS: &str = "KLEO_COOLDOWN_SECS";
pub const ENV_STORAGE_PATH: &str = "KLEO_STORAGE_PATH";
pub const ENV_FETCH_ENABLED: &str = "KLEO_FETCH_ENABLED";

/// Upper bound for `cooldown_secs` and `cache_ttl_secs` (one year).
pub const MAX_DURATION_SECS: i64 = 365 * 24 * 3600;

fn default_cooldown_secs() -> i64 {
    DEFAULT_COOLDOWN_SECS
}
fn default_sources_path() -> PathBuf {
    PathBuf::from("config/sources.json")
}
fn default_cache_ttl_secs() -> i64 {
    24 * 3600
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("data/kleo.json")
}
fn default_fetch_timeout_secs() -> u64 {
    8
}
fn default_leaderboard_size() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredibilitySection {
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
}

impl Default for CredibilitySection {
    fn default() -> Self {
        Self {
            sources_path: default_sources_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KleoConfig {
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub credibility: CredibilitySection,
    #[serde(default)]
    pub rewards: RewardPolicy,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub api: ApiSection,
}

impl KleoConfig {
    /// Resolve the config path ($KLEO_CONFIG_PATH or `config/kleo.toml`), load it
    /// if present, then apply env overrides. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else if env::var(ENV_CONFIG_PATH).is_ok() {
            return Err(anyhow!(
                "{ENV_CONFIG_PATH} points to non-existent path {}",
                path.display()
            ));
        } else {
            info!(target: "kleo", path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(target: "kleo", path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: KleoConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = env::var(ENV_COOLDOWN_SECS) {
            self.rate_limit.cooldown_secs = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("{ENV_COOLDOWN_SECS} must be an integer, got {raw:?}"))?;
        }
        if let Ok(raw) = env::var(ENV_STORAGE_PATH) {
            if !raw.trim().is_empty() {
                self.storage.backend = StorageBackend::File;
                self.storage.path = PathBuf::from(raw.trim());
            }
        }
        if let Ok(raw) = env::var(ENV_FETCH_ENABLED) {
            self.fetch.enabled = matches!(raw.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        self.rate_limit.cooldown_secs = self.rate_limit.cooldown_secs.clamp(0, MAX_DURATION_SECS);
        self.credibility.cache_ttl_secs =
            self.credibility.cache_ttl_secs.clamp(0, MAX_DURATION_SECS);
        if self.fetch.timeout_secs == 0 {
            self.fetch.timeout_secs = default_fetch_timeout_secs();
        }
        if self.api.leaderboard_size == 0 {
            self.api.leaderboard_size = default_leaderboard_size();
        }
    }
}
