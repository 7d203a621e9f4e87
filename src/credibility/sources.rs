//! # Source table
//!
//! Static reputation table for news domains.
//!
//! - Loads from a JSON array of `SourceRecord`s, falling back to `default_seed()`.
//! - Lookup order: exact domain → containment (`known ⊆ submitted`, longest
//!   known domain wins) → `{low, unknown, 30}`.
//! - Domains are compared lowercased with a leading `www.` removed.

use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credibility {
    High,
    Medium,
    Low,
}

impl fmt::Display for Credibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Credibility::High => "high",
            Credibility::Medium => "medium",
            Credibility::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Mainstream,
    Independent,
    Satire,
    Conspiracy,
    Unknown,
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceCategory::Mainstream => "mainstream",
            SourceCategory::Independent => "independent",
            SourceCategory::Satire => "satire",
            SourceCategory::Conspiracy => "conspiracy",
            SourceCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub domain: String,
    pub credibility: Credibility,
    pub category: SourceCategory,
    /// 0..=100
    pub fact_check_rating: u8,
}

/// Lightweight view returned by pre-submission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCredibility {
    pub credibility: Credibility,
    pub category: SourceCategory,
    pub rating: u8,
}

impl From<&SourceRecord> for SourceCredibility {
    fn from(r: &SourceRecord) -> Self {
        Self {
            credibility: r.credibility,
            category: r.category,
            rating: r.fact_check_rating,
        }
    }
}

pub const UNKNOWN_SOURCE_RATING: u8 = 30;

#[derive(Debug, Clone)]
pub struct SourceTable {
    entries: Vec<SourceRecord>,
}

impl SourceTable {
    pub fn new(entries: Vec<SourceRecord>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|mut r| {
                r.domain = normalize_domain(&r.domain);
                r.fact_check_rating = r.fact_check_rating.min(100);
                (!r.domain.is_empty()).then_some(r)
            })
            .collect();
        Self { entries }
    }

    /// Load from a JSON file; on any error fall back to the built-in seed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<Vec<SourceRecord>>(&s).map_err(Into::into));
        match parsed {
            Ok(entries) => {
                let table = Self::new(entries);
                info!(
                    target: "credibility",
                    path = %path.display(),
                    sources = table.len(),
                    "source table loaded"
                );
                table
            }
            Err(e) => {
                warn!(
                    target: "credibility",
                    path = %path.display(),
                    error = %e,
                    "source table unavailable, using built-in seed"
                );
                Self::default_seed()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a (host) domain to its record, or the unknown default.
    pub fn lookup(&self, domain: &str) -> SourceRecord {
        let d = normalize_domain(domain);
        if d.is_empty() {
            return unknown_source(&d);
        }

        if let Some(r) = self.entries.iter().find(|r| r.domain == d) {
            return r.clone();
        }

        self.entries
            .iter()
            .filter(|r| d.contains(r.domain.as_str()))
            .max_by_key(|r| r.domain.len())
            .cloned()
            .unwrap_or_else(|| unknown_source(&d))
    }

    /// Built-in seed of well-known outlets.
    pub fn default_seed() -> Self {
        use Credibility::*;
        use SourceCategory::*;

        let seed: [(&str, Credibility, SourceCategory, u8); 29] = [
            ("reuters.com", High, Mainstream, 95),
            ("apnews.com", High, Mainstream, 95),
            ("bbc.com", High, Mainstream, 90),
            ("bbc.co.uk", High, Mainstream, 90),
            ("npr.org", High, Mainstream, 88),
            ("pbs.org", High, Mainstream, 88),
            ("nytimes.com", High, Mainstream, 85),
            ("washingtonpost.com", High, Mainstream, 84),
            ("wsj.com", High, Mainstream, 86),
            ("bloomberg.com", High, Mainstream, 88),
            ("economist.com", High, Mainstream, 87),
            ("theguardian.com", High, Mainstream, 83),
            ("propublica.org", High, Independent, 90),
            ("cnn.com", Medium, Mainstream, 72),
            ("nbcnews.com", Medium, Mainstream, 75),
            ("cbsnews.com", Medium, Mainstream, 75),
            ("abcnews.go.com", Medium, Mainstream, 75),
            ("foxnews.com", Medium, Mainstream, 60),
            ("usatoday.com", Medium, Mainstream, 70),
            ("politico.com", Medium, Mainstream, 74),
            ("axios.com", Medium, Independent, 76),
            ("theintercept.com", Medium, Independent, 68),
            ("dailymail.co.uk", Low, Mainstream, 40),
            ("nypost.com", Medium, Mainstream, 58),
            ("theonion.com", Low, Satire, 5),
            ("babylonbee.com", Low, Satire, 5),
            ("infowars.com", Low, Conspiracy, 10),
            ("naturalnews.com", Low, Conspiracy, 8),
            ("beforeitsnews.com", Low, Conspiracy, 5),
        ];

        Self::new(
            seed.into_iter()
                .map(|(domain, credibility, category, rating)| SourceRecord {
                    domain: domain.to_string(),
                    credibility,
                    category,
                    fact_check_rating: rating,
                })
                .collect(),
        )
    }
}

impl Default for SourceTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

fn unknown_source(domain: &str) -> SourceRecord {
    SourceRecord {
        domain: domain.to_string(),
        credibility: Credibility::Low,
        category: SourceCategory::Unknown,
        fact_check_rating: UNKNOWN_SOURCE_RATING,
    }
}

/// Lowercase, trim, drop a trailing dot and a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let d = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    match d.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => d,
    }
}

/// Host part of `url`, normalized. `None` when the URL does not parse or has no host.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let d = normalize_domain(host);
    (!d.is_empty()).then_some(d)
}
