// src/ingest/providers/gdelt.rs
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;

use crate::config::sources::GdeltConfig;
use crate::ingest::providers::{classify_status, http_client, or_query};
use crate::ingest::types::{FetchOutcome, FetchResult, RawItem, SourceAdapter, SourceKind};

#[derive(Debug, Deserialize)]
struct ArtList {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    /// `YYYYMMDDTHHMMSSZ`
    seendate: Option<String>,
    domain: Option<String>,
    snippet: Option<String>,
}

/// GDELT DOC 2.0 article list. No credential.
pub struct GdeltAdapter {
    client: reqwest::Client,
    url: String,
    max_records: u32,
}

impl GdeltAdapter {
    pub fn from_config(cfg: &GdeltConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg.timeout())?,
            url: cfg.url.clone(),
            max_records: cfg.max_records,
        })
    }

    /// GDELT wants OR-ed terms wrapped in parentheses.
    pub fn build_query(keywords: &[String]) -> String {
        format!("({})", or_query(keywords))
    }

    /// Window as GDELT `timespan`, whole hours, at least one.
    pub fn timespan(window: Duration) -> String {
        format!("{}h", (window.as_secs() / 3600).max(1))
    }

    /// Interpret a 2xx response body.
    pub fn parse_body(body: &str) -> FetchResult {
        let t0 = std::time::Instant::now();
        let parsed: ArtList = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                // GDELT throttles with a 200 and a plain-text notice instead of a 429.
                if body.to_ascii_lowercase().contains("limit requests") {
                    tracing::warn!(target: "ingest", provider = "GDELT", "throttle notice in body");
                    return FetchResult::failed(FetchOutcome::RateLimited);
                }
                tracing::warn!(target: "ingest", provider = "GDELT", error = %e, "non-json body");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };

        let items = parsed
            .articles
            .into_iter()
            .filter_map(|a| {
                let headline = a.title?.trim().to_string();
                if headline.is_empty() {
                    return None;
                }
                Some(RawItem {
                    summary: a.snippet,
                    headline,
                    url: a.url,
                    published: a.seendate,
                    outlet: a.domain,
                })
            })
            .collect::<Vec<_>>();

        histogram!("ingest_parse_ms", "source" => "GDELT")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        FetchResult::from_items(items)
    }
}

#[async_trait]
impl SourceAdapter for GdeltAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Gdelt
    }

    async fn fetch(&self, keywords: &[String], window: Duration) -> FetchResult {
        let query = Self::build_query(keywords);
        let max_records = self.max_records.to_string();
        let timespan = Self::timespan(window);
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("query", query.as_str()),
                ("mode", "artlist"),
                ("format", "json"),
                ("maxrecords", max_records.as_str()),
                ("timespan", timespan.as_str()),
            ])
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "GDELT", timeout = e.is_timeout(), error = %e, "http error");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };
        if let Some(outcome) = classify_status(resp.status()) {
            tracing::warn!(target: "ingest", provider = "GDELT", status = %resp.status(), "upstream refused");
            return FetchResult::failed(outcome);
        }
        match resp.text().await {
            Ok(body) => Self::parse_body(&body),
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "GDELT", error = %e, "reading body");
                FetchResult::failed(FetchOutcome::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_parses_to_raw_items() {
        let body = include_str!("../../../tests/fixtures/gdelt_artlist.json");
        let res = GdeltAdapter::parse_body(body);
        assert_eq!(res.outcome, FetchOutcome::Ok);
        // one article has an empty title
        assert_eq!(res.items.len(), 3);
        assert_eq!(res.items[0].published.as_deref(), Some("20240115T103000Z"));
        assert_eq!(res.items[0].outlet.as_deref(), Some("freightwaves.com"));
    }

    #[test]
    fn empty_and_throttled_bodies() {
        assert_eq!(
            GdeltAdapter::parse_body(r#"{"articles": []}"#).outcome,
            FetchOutcome::Empty
        );
        assert_eq!(GdeltAdapter::parse_body("{}").outcome, FetchOutcome::Empty);
        assert_eq!(
            GdeltAdapter::parse_body("Please limit requests to one every 5 seconds").outcome,
            FetchOutcome::RateLimited
        );
        assert_eq!(
            GdeltAdapter::parse_body("<html>oops</html>").outcome,
            FetchOutcome::Error
        );
    }

    #[test]
    fn query_and_timespan() {
        let kws = vec!["port strike".to_string(), "cement".into()];
        assert_eq!(GdeltAdapter::build_query(&kws), "(\"port strike\" OR cement)");
        assert_eq!(GdeltAdapter::timespan(Duration::from_secs(48 * 3600)), "48h");
        assert_eq!(GdeltAdapter::timespan(Duration::from_secs(60)), "1h");
    }
}
