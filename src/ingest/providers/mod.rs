// src/ingest/providers/mod.rs
pub mod gdelt;
pub mod newsapi;
pub mod rss;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;

use crate::ingest::types::FetchOutcome;

pub use gdelt::GdeltAdapter;
pub use newsapi::NewsApiAdapter;
pub use rss::RssAdapter;

pub(crate) const USER_AGENT: &str = "vantagepoint/0.1 (supply-chain signals)";
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One reqwest client per adapter; every request it sends is bounded by `timeout`.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .context("building upstream http client")
}

/// Map a non-success HTTP status to an outcome. `None` means the body should be parsed.
///
/// Only 429 counts as rate limiting; every other failure status is structural.
pub fn classify_status(status: StatusCode) -> Option<FetchOutcome> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(FetchOutcome::RateLimited)
    } else {
        Some(FetchOutcome::Error)
    }
}

/// Upstream query as `a OR "multi word" OR c`.
pub fn or_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| {
            if k.contains(char::is_whitespace) {
                format!("\"{k}\"")
            } else {
                k.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_separates_rate_limits() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchOutcome::RateLimited)
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(FetchOutcome::Error)
        );
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(FetchOutcome::Error)
        );
    }

    #[test]
    fn or_query_quotes_phrases_and_skips_blanks() {
        let kws = vec!["port strike".to_string(), " cement ".into(), "".into()];
        assert_eq!(or_query(&kws), "\"port strike\" OR cement");
    }
}
