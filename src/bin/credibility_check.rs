//! Scores article URLs from the command line and prints the credibility JSON.
//! Usage: `credibility_check <url> [title] [content]`

use kleo_rewards::config::KleoConfig;
use kleo_rewards::credibility::{CredibilityScorer, SourceTable};
use kleo_rewards::fetch::{ArticleFetcher, HttpArticleFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    kleo_rewards::logging::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        anyhow::bail!("usage: credibility_check <url> [title] [content]");
    };
    let title = args.next();
    let content = args.next();

    let cfg = KleoConfig::load()?;
    let scorer = CredibilityScorer::new(SourceTable::load_from_file(&cfg.credibility.sources_path));

    // Without explicit text, try the live page when fetching is enabled.
    let (title, content) = match (title, content) {
        (Some(t), Some(c)) => (t, c),
        (t, c) if cfg.fetch.enabled => {
            let fetcher =
                HttpArticleFetcher::new(std::time::Duration::from_secs(cfg.fetch.timeout_secs))?;
            match fetcher.fetch(&url).await {
                Ok(a) => (t.unwrap_or(a.title), c.unwrap_or(a.content)),
                Err(e) => {
                    tracing::warn!(error = %e, "fetch failed, scoring with supplied text");
                    (t.unwrap_or_default(), c.unwrap_or_default())
                }
            }
        }
        (t, c) => (t.unwrap_or_default(), c.unwrap_or_default()),
    };

    let result = scorer.analyze(&url, &content, &title);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
