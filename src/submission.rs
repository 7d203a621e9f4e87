// src/submission.rs
//! Submission intake types: what the map/upload form hands to the core.
//!
//! Coordinates and text length are carried through untouched; range checks
//! belong to the caller.

use serde::{Deserialize, Serialize};

use crate::error::{KleoError, KleoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Story,
    News,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Text,
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub identity_key: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// Wallet linked to the submitting profile, if any.
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// The profile has an email paired with its wallet.
    #[serde(default)]
    pub has_email_pairing: bool,
}

impl Submission {
    /// Boundary checks the components rely on.
    pub fn validate(&self) -> KleoResult<()> {
        if self.identity_key.trim().is_empty() {
            return Err(KleoError::InvalidSubmission(
                "identity_key must not be empty".into(),
            ));
        }
        if self.content_type == ContentType::News && self.news_url().is_none() {
            return Err(KleoError::InvalidSubmission(
                "news submissions require a url".into(),
            ));
        }
        Ok(())
    }

    /// Trimmed, non-empty URL.
    pub fn news_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn identity(&self) -> Identity {
        Identity {
            wallet_address: self.wallet_address.clone(),
            email_paired: self.has_email_pairing,
        }
    }
}

/// What the reward rules need to know about the submitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub wallet_address: Option<String>,
    pub email_paired: bool,
}

impl Identity {
    pub fn is_verified(&self) -> bool {
        self.email_paired
            && self
                .wallet_address
                .as_deref()
                .is_some_and(|w| !w.trim().is_empty())
    }
}
