// src/ingest/providers/newsapi.rs
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use metrics::histogram;
use serde::Deserialize;

use crate::config::sources::NewsApiConfig;
use crate::ingest::providers::{classify_status, http_client, or_query};
use crate::ingest::types::{FetchOutcome, FetchResult, RawItem, SourceAdapter, SourceKind};

#[derive(Debug, Deserialize)]
struct Everything {
    status: String,
    code: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI title for articles pulled by the publisher.
const REMOVED: &str = "[Removed]";

/// NewsAPI `/v2/everything`. Unavailable without an API key.
pub struct NewsApiAdapter {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    page_size: u32,
}

impl NewsApiAdapter {
    pub fn from_config(cfg: &NewsApiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg.timeout())?,
            url: cfg.url.clone(),
            api_key: cfg.api_key.clone(),
            page_size: cfg.page_size,
        })
    }

    /// Interpret a response body. NewsAPI reports errors in the body too, with or without a
    /// failing status, so the body is checked before the status is trusted.
    pub fn parse_body(body: &str) -> FetchResult {
        let t0 = std::time::Instant::now();
        let parsed: Everything = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "NEWSAPI", error = %e, "non-json body");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };
        if parsed.status != "ok" {
            let outcome = match parsed.code.as_deref() {
                Some("rateLimited") => FetchOutcome::RateLimited,
                _ => FetchOutcome::Error,
            };
            tracing::warn!(target: "ingest", provider = "NEWSAPI", code = ?parsed.code, "error status in body");
            return FetchResult::failed(outcome);
        }

        let items = parsed
            .articles
            .into_iter()
            .filter_map(|a| {
                let headline = a.title?.trim().to_string();
                if headline.is_empty() || headline == REMOVED {
                    return None;
                }
                Some(RawItem {
                    headline,
                    summary: a.description,
                    url: a.url,
                    published: a.published_at,
                    outlet: a.source.and_then(|s| s.name),
                })
            })
            .collect::<Vec<_>>();

        histogram!("ingest_parse_ms", "source" => "NEWSAPI")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        FetchResult::from_items(items)
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::NewsApi
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, keywords: &[String], window: Duration) -> FetchResult {
        let Some(key) = self.api_key.as_deref() else {
            return FetchResult::failed(FetchOutcome::Error);
        };
        let from = chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| Utc::now().checked_sub_signed(w))
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let query = or_query(keywords);
        let page_size = self.page_size.to_string();

        let resp = self
            .client
            .get(&self.url)
            .header("X-Api-Key", key)
            .query(&[
                ("q", query.as_str()),
                ("from", from.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "relevancy"),
                ("language", "en"),
            ])
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "NEWSAPI", timeout = e.is_timeout(), error = %e, "http error");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };
        let status = resp.status();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "NEWSAPI", error = %e, "reading body");
                return FetchResult::failed(classify_status(status).unwrap_or(FetchOutcome::Error));
            }
        };
        match classify_status(status) {
            // 429 wins even if the body could not be read as the documented error shape
            Some(FetchOutcome::RateLimited) => FetchResult::failed(FetchOutcome::RateLimited),
            Some(outcome) => {
                let from_body = Self::parse_body(&body);
                if from_body.outcome == FetchOutcome::RateLimited {
                    from_body
                } else {
                    tracing::warn!(target: "ingest", provider = "NEWSAPI", status = %status, "upstream refused");
                    FetchResult::failed(outcome)
                }
            }
            None => Self::parse_body(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_skips_removed_articles() {
        let body = include_str!("../../../tests/fixtures/newsapi_everything.json");
        let res = NewsApiAdapter::parse_body(body);
        assert_eq!(res.outcome, FetchOutcome::Ok);
        assert_eq!(res.items.len(), 2);
        assert_eq!(res.items[0].outlet.as_deref(), Some("Supply Chain Dive"));
        assert_eq!(res.items[1].summary, None);
    }

    #[test]
    fn error_bodies_map_to_outcomes() {
        let limited = r#"{"status":"error","code":"rateLimited","message":"too many"}"#;
        assert_eq!(
            NewsApiAdapter::parse_body(limited).outcome,
            FetchOutcome::RateLimited
        );
        let bad_key = r#"{"status":"error","code":"apiKeyInvalid","message":"nope"}"#;
        assert_eq!(NewsApiAdapter::parse_body(bad_key).outcome, FetchOutcome::Error);
        let empty = r#"{"status":"ok","totalResults":0,"articles":[]}"#;
        assert_eq!(NewsApiAdapter::parse_body(empty).outcome, FetchOutcome::Empty);
    }

    #[test]
    fn unavailable_without_key() {
        let cfg = NewsApiConfig {
            api_key: None,
            ..Default::default()
        };
        let adapter = NewsApiAdapter::from_config(&cfg).unwrap();
        assert!(!adapter.is_available());

        let cfg = NewsApiConfig {
            api_key: Some("k".into()),
            ..Default::default()
        };
        assert!(NewsApiAdapter::from_config(&cfg).unwrap().is_available());
    }
}
