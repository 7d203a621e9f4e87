// src/credibility/mod.rs
//! Credibility scoring for submitted news links.
//!
//! Order:
//! 1) Domain from URL (malformed URL → conservative fallback result)
//! 2) Source table lookup (exact → containment → unknown)
//! 3) Content predicates over title + text
//! 4) Additive score from base 50, clamped to 0..=100
//! 5) Reliability threshold 60, confidence capped at 0.95

pub mod cache;
pub mod content;
pub mod sources;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::anon_id;

pub use cache::CredibilityCache;
pub use content::{analyze_content, normalize_article_text, ContentAnalysis, MAX_ARTICLE_CHARS};
pub use sources::{
    domain_of, Credibility, SourceCategory, SourceCredibility, SourceRecord, SourceTable,
};

pub const RELIABILITY_THRESHOLD: i32 = 60;
pub const MAX_CONFIDENCE: f32 = 0.95;

const BASE_SCORE: i32 = 50;
const FALLBACK_SCORE: u8 = 30;
const FALLBACK_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityResult {
    pub is_reliable: bool,
    /// 0.0..=0.95
    pub confidence: f32,
    /// 0..=100
    pub score: u8,
    pub reasons: Vec<String>,
    pub source_credibility: Credibility,
    pub source_category: SourceCategory,
    pub content_analysis: ContentAnalysis,
    pub recommendations: Vec<String>,
}

impl CredibilityResult {
    /// Conservative result used whenever the input cannot be analyzed.
    pub fn fallback() -> Self {
        Self {
            is_reliable: false,
            confidence: FALLBACK_CONFIDENCE,
            score: FALLBACK_SCORE,
            reasons: vec!["Unable to verify article credibility".to_string()],
            source_credibility: Credibility::Low,
            source_category: SourceCategory::Unknown,
            content_analysis: ContentAnalysis::default(),
            recommendations: vec!["Verify this story from multiple sources".to_string()],
        }
    }
}

/// Per-signal score adjustments.
fn source_adjustment(c: Credibility) -> i32 {
    match c {
        Credibility::High => 30,
        Credibility::Medium => 15,
        Credibility::Low => -20,
    }
}

fn content_adjustment(a: &ContentAnalysis) -> i32 {
    let mut delta = 0;
    if a.has_factual_claims {
        delta += 10;
    }
    if !a.has_emotional_language {
        delta += 15;
    }
    if a.has_multiple_sources {
        delta += 10;
    }
    if a.has_author_info {
        delta += 5;
    }
    if a.has_publication_date {
        delta += 5;
    }
    // Red flags, applied on top of the bonuses above.
    if a.has_emotional_language {
        delta -= 10;
    }
    if !a.has_factual_claims {
        delta -= 5;
    }
    if !a.has_author_info {
        delta -= 5;
    }
    delta
}

/// Combine source and content signals into a clamped 0..=100 score.
pub fn score_for(source: Credibility, analysis: &ContentAnalysis) -> u8 {
    let raw = BASE_SCORE + source_adjustment(source) + content_adjustment(analysis);
    raw.clamp(0, 100) as u8
}

pub fn confidence_for(score: u8) -> f32 {
    (score as f32 / 100.0).min(MAX_CONFIDENCE)
}

#[derive(Debug, Clone, Default)]
pub struct CredibilityScorer {
    sources: SourceTable,
}

impl CredibilityScorer {
    pub fn new(sources: SourceTable) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    /// Full analysis of a URL plus its article text.
    pub fn analyze(&self, url: &str, content: &str, title: &str) -> CredibilityResult {
        let Some(domain) = domain_of(url) else {
            debug!(target: "credibility", url = %anon_id(url), "malformed url, fallback result");
            counter!("credibility_analyses_total", "outcome" => "fallback").increment(1);
            return CredibilityResult::fallback();
        };

        let source = self.sources.lookup(&domain);
        let analysis = analyze_content(title, content);
        let score = score_for(source.credibility, &analysis);
        let is_reliable = i32::from(score) >= RELIABILITY_THRESHOLD;

        let result = CredibilityResult {
            is_reliable,
            confidence: confidence_for(score),
            score,
            reasons: build_reasons(&source, &analysis),
            source_credibility: source.credibility,
            source_category: source.category,
            content_analysis: analysis,
            recommendations: build_recommendations(&source, &analysis, is_reliable),
        };

        debug!(
            target: "credibility",
            url = %anon_id(url),
            source = %source.domain,
            credibility = %source.credibility,
            score,
            is_reliable,
            "article analyzed"
        );
        let outcome = if is_reliable { "reliable" } else { "unreliable" };
        counter!("credibility_analyses_total", "outcome" => outcome).increment(1);

        result
    }

    /// Source-only lookup for quick pre-submission checks.
    pub fn get_source_credibility(&self, url: &str) -> SourceCredibility {
        let domain = domain_of(url).unwrap_or_default();
        SourceCredibility::from(&self.sources.lookup(&domain))
    }

    /// Low-credibility or satire sources.
    pub fn is_known_unreliable_source(&self, url: &str) -> bool {
        let s = self.get_source_credibility(url);
        s.credibility == Credibility::Low || s.category == SourceCategory::Satire
    }
}

fn build_reasons(source: &SourceRecord, a: &ContentAnalysis) -> Vec<String> {
    let mut reasons = Vec::with_capacity(6);

    reasons.push(match source.credibility {
        Credibility::High => format!(
            "Source has high credibility ({} outlet, fact-check rating {})",
            source.category, source.fact_check_rating
        ),
        Credibility::Medium => format!(
            "Source has medium credibility ({} outlet, fact-check rating {})",
            source.category, source.fact_check_rating
        ),
        Credibility::Low if source.category == SourceCategory::Unknown => {
            "Source is not in the list of known outlets".to_string()
        }
        Credibility::Low => format!(
            "Source has low credibility ({} outlet, fact-check rating {})",
            source.category, source.fact_check_rating
        ),
    });

    reasons.push(if a.has_factual_claims {
        "Contains specific factual claims (numbers, dates, amounts)".to_string()
    } else {
        "Lacks specific factual claims".to_string()
    });

    reasons.push(if a.has_emotional_language {
        "Uses sensational or emotional language".to_string()
    } else {
        "Uses neutral, non-sensational language".to_string()
    });

    reasons.push(if a.has_multiple_sources {
        "Attributes information to named sources".to_string()
    } else {
        "Does not attribute information to other sources".to_string()
    });

    reasons.push(if a.has_author_info {
        "Author is identified".to_string()
    } else {
        "No author information found".to_string()
    });

    reasons.push(if a.has_publication_date {
        "Publication date is present".to_string()
    } else {
        "No publication date found".to_string()
    });

    reasons
}

fn build_recommendations(
    source: &SourceRecord,
    a: &ContentAnalysis,
    is_reliable: bool,
) -> Vec<String> {
    let mut recs = Vec::new();

    if !is_reliable {
        recs.push("Verify this story with other trusted news outlets before sharing".to_string());
        if source.credibility == Credibility::Low {
            recs.push("Find a more reputable source reporting the same story".to_string());
        }
    }
    if source.category == SourceCategory::Satire {
        recs.push("This outlet publishes satire; do not present it as factual news".to_string());
    }
    if a.has_emotional_language {
        recs.push("Be cautious of sensational headlines and wording".to_string());
    }
    if !a.has_multiple_sources {
        recs.push("Look for coverage that cites primary sources".to_string());
    }
    if !a.has_publication_date {
        recs.push("Check when the story was published to make sure it is current".to_string());
    }

    recs
}
