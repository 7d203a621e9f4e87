//! Content heuristics: literal pattern predicates over article text.
//!
//! Each predicate is independent and runs on `(title + " " + content)`
//! lowercased. The author byline check is the one exception: "By First Last"
//! needs capitalization, so it also looks at the original-case text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub has_factual_claims: bool,
    pub has_emotional_language: bool,
    pub has_multiple_sources: bool,
    pub has_author_info: bool,
    pub has_publication_date: bool,
}

const EMOTIONAL_WORDS: &[&str] = &[
    "shocking",
    "outrageous",
    "unbelievable",
    "incredible",
    "devastating",
    "horrifying",
    "terrifying",
    "explosive",
    "bombshell",
    "conspiracy",
    "cover-up",
    "coverup",
    "leaked",
    "exposed",
    "secret",
    "miracle",
    "scandal",
    "hoax",
    "you won't believe",
    "they don't want you to know",
    "wake up",
];

const ATTRIBUTION_PHRASES: &[&str] = &[
    "according to",
    "sources say",
    "sources said",
    "source said",
    "officials said",
    "reported by",
    "told reporters",
    "said in a statement",
    "a spokesperson",
    "spokesman said",
    "spokeswoman said",
    "study published",
    "data from",
];

static RE_FACTUAL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 4-digit year
        r"\b\d{4}\b",
        // percentage
        r"\d+(?:\.\d+)?\s?%",
        r"\b\d+(?:\.\d+)?\s?percent\b",
        // decimal
        r"\b\d+\.\d+\b",
        // dollar amount
        r"\$\s?\d[\d,]*(?:\.\d+)?",
        // N million/billion
        r"\b\d+(?:[.,]\d+)?\s*(?:million|billion|trillion)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("factual regex"))
    .collect()
});

static RE_EMOTIONAL: Lazy<Regex> = Lazy::new(|| word_list_regex(EMOTIONAL_WORDS));

static RE_BYLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[Bb]y\s+[A-Z][a-zA-Z'.-]+\s+[A-Z][a-zA-Z'.-]+").expect("byline regex")
});

static RE_AUTHOR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bauthor\s*:|\bwritten by\b").expect("author regex"));

static RE_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b\d{1,2}/\d{1,2}/\d{2,4}\b",
        r"\b\d{4}-\d{2}-\d{2}\b",
        r"\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b",
        r"\b\d{1,2}\s+(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{4}\b",
        r"\b(?:published|updated)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date regex"))
    .collect()
});

fn word_list_regex(words: &[&str]) -> Regex {
    let alts = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alts})\b")).expect("word list regex")
}

/// Run all predicates over a title/content pair.
pub fn analyze_content(title: &str, content: &str) -> ContentAnalysis {
    let original = format!("{title} {content}");
    let text = original.to_lowercase();

    ContentAnalysis {
        has_factual_claims: RE_FACTUAL.iter().any(|re| re.is_match(&text)),
        has_emotional_language: RE_EMOTIONAL.is_match(&text),
        has_multiple_sources: ATTRIBUTION_PHRASES.iter().any(|p| text.contains(p)),
        has_author_info: RE_AUTHOR_TAG.is_match(&text) || RE_BYLINE.is_match(&original),
        has_publication_date: RE_DATE.iter().any(|re| re.is_match(&text)),
    }
}

/// Normalize fetched or pasted article text: decode HTML entities, strip tags,
/// straighten typographic quotes, collapse whitespace, cap length.
pub fn normalize_article_text(s: &str) -> String {
    static RE_SCRIPT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("script regex"));
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

    let out = RE_SCRIPT.replace_all(s, " ");
    let out = RE_TAGS.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out).to_string();
    let out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let out = RE_WS.replace_all(&out, " ");
    let out = out.trim();

    if out.chars().count() > MAX_ARTICLE_CHARS {
        out.chars().take(MAX_ARTICLE_CHARS).collect()
    } else {
        out.to_string()
    }
}

pub const MAX_ARTICLE_CHARS: usize = 20_000;
