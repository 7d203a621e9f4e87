// src/fetch.rs
//! Article fetch collaborator: turns a news URL into title + plain text for the
//! credibility scorer. Failures are returned to the caller, which falls back to
//! the user's own text.
//!
//! The HTTP fetcher only follows public http(s) URLs and reads at most
//! `MAX_ARTICLE_BYTES` of the response.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

use crate::credibility::normalize_article_text;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Article>;
    fn name(&self) -> &'static str;
}

pub type DynFetcher = Arc<dyn ArticleFetcher>;

/// Always fails; used when outbound fetching is switched off.
pub struct DisabledFetcher;

#[async_trait]
impl ArticleFetcher for DisabledFetcher {
    async fn fetch(&self, _url: &str) -> Result<Article> {
        Err(anyhow!("article fetching disabled"))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Serves canned articles by exact URL (fixtures, demos).
#[derive(Default)]
pub struct StaticFetcher {
    articles: HashMap<String, Article>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, url: &str, title: &str, content: &str) -> Self {
        self.articles.insert(
            url.to_string(),
            Article {
                title: title.to_string(),
                content: content.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl ArticleFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Article> {
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for url"))
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

/// Largest response body read from an article page.
pub const MAX_ARTICLE_BYTES: usize = 2 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

/// Fetches the page over HTTP and extracts `<title>` and visible body text.
pub struct HttpArticleFetcher {
    http: reqwest::Client,
}

impl HttpArticleFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        // Redirect targets go through the same URL screening as the original link.
        let redirects = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if check_fetch_url(attempt.url().as_str()).is_err() {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });
        let http = reqwest::Client::builder()
            .user_agent("kleo-rewards/0.1 (credibility check)")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .redirect(redirects)
            .build()
            .context("building article http client")?;
        Ok(Self { http })
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let url = check_fetch_url(url)?;
        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .context("requesting article")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("article fetch returned {status}"));
        }
        if resp
            .content_length()
            .is_some_and(|n| n > MAX_ARTICLE_BYTES as u64)
        {
            return Err(anyhow!("article larger than {MAX_ARTICLE_BYTES} bytes"));
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.context("reading article body")? {
            let room = MAX_ARTICLE_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch(&self, url: &str) -> Result<Article> {
        let t0 = std::time::Instant::now();
        let body = match self.fetch_body(url).await {
            Ok(b) => b,
            Err(e) => {
                counter!("fetch_errors_total").increment(1);
                return Err(e);
            }
        };
        tracing::debug!(
            target: "credibility",
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "article fetched"
        );
        Ok(extract_article(&body))
    }
    fn name(&self) -> &'static str {
        "http"
    }
}

/// Accept only public http(s) URLs. Loopback, private, link-local and
/// unspecified addresses are refused, as is `localhost`.
pub fn check_fetch_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).context("parsing article url")?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("unsupported url scheme {}", url.scheme()));
    }
    let blocked = match url.host() {
        None => true,
        Some(Host::Domain(d)) => {
            let d = d.trim_end_matches('.').to_ascii_lowercase();
            d == "localhost" || d.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => !is_public_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => !is_public_ip(IpAddr::V6(ip)),
    };
    if blocked {
        return Err(anyhow!("article host not allowed"));
    }
    Ok(url)
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64))
        }
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_ip(IpAddr::V4(v4)),
            None => {
                let first = v6.segments()[0];
                !(v6.is_loopback()
                    || v6.is_unspecified()
                    || (first & 0xfe00) == 0xfc00
                    || (first & 0xffc0) == 0xfe80)
            }
        },
    }
}

/// Pull the title and readable text out of an HTML document.
pub fn extract_article(html: &str) -> Article {
    static RE_TITLE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
    static RE_HEAD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<head[^>]*>.*?</head>").expect("head regex"));

    let title = RE_TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| normalize_article_text(m.as_str()))
        .unwrap_or_default();
    let body = RE_HEAD.replace(html, " ");
    Article {
        title,
        content: normalize_article_text(&body),
    }
}
