// src/ingest/providers/rss.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::config::sources::RssConfig;
use crate::ingest::providers::{classify_status, http_client};
use crate::ingest::types::{FetchOutcome, FetchResult, RawItem, SourceAdapter, SourceKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Parsed RSS 2.0 document.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<RawItem>,
}

/// Parse one RSS document, keeping at most `max_entries` items that have a title.
/// Items take the channel title as their outlet.
pub fn parse_feed(xml: &str, max_entries: usize) -> Result<ParsedFeed> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let title = rss
        .channel
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let items = rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            let headline = it.title?.trim().to_string();
            (!headline.is_empty()).then(|| RawItem {
                headline,
                summary: it.description,
                url: it.link,
                published: it.pub_date,
                outlet: title.clone(),
            })
        })
        .take(max_entries)
        .collect::<Vec<_>>();

    histogram!("ingest_parse_ms", "source" => "RSS").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(ParsedFeed { title, items })
}

/// Entities HTML feeds use that XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

/// Merge per-feed outcomes: any items make the batch OK; otherwise a rate limit beats
/// an empty feed, and an error is reported only when every feed failed.
pub fn merge_outcomes(outcomes: &[FetchOutcome], total_items: usize) -> FetchOutcome {
    if total_items > 0 {
        FetchOutcome::Ok
    } else if outcomes.contains(&FetchOutcome::RateLimited) {
        FetchOutcome::RateLimited
    } else if !outcomes.is_empty() && outcomes.iter().all(|o| *o == FetchOutcome::Error) {
        FetchOutcome::Error
    } else {
        FetchOutcome::Empty
    }
}

/// Fixed list of curated logistics feeds. No query, no window, no credential.
pub struct RssAdapter {
    client: reqwest::Client,
    feeds: Vec<String>,
    max_entries_per_feed: usize,
}

impl RssAdapter {
    pub fn from_config(cfg: &RssConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(cfg.timeout())?,
            feeds: cfg.feeds.clone(),
            max_entries_per_feed: cfg.max_entries_per_feed,
        })
    }

    async fn fetch_feed(&self, url: &str) -> FetchResult {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "RSS", feed = url, timeout = e.is_timeout(), error = %e, "http error");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };
        if let Some(outcome) = classify_status(resp.status()) {
            tracing::warn!(target: "ingest", provider = "RSS", feed = url, status = %resp.status(), "feed refused");
            return FetchResult::failed(outcome);
        }
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "RSS", feed = url, error = %e, "reading body");
                return FetchResult::failed(FetchOutcome::Error);
            }
        };
        match parse_feed(&body, self.max_entries_per_feed) {
            Ok(feed) => FetchResult::from_items(feed.items),
            Err(e) => {
                tracing::warn!(target: "ingest", provider = "RSS", feed = url, error = ?e, "feed parse error");
                FetchResult::failed(FetchOutcome::Error)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    /// Keywords and window do not apply; every configured feed is read and the items merged.
    async fn fetch(&self, _keywords: &[String], _window: Duration) -> FetchResult {
        let mut items = Vec::new();
        let mut outcomes = Vec::with_capacity(self.feeds.len());
        for url in &self.feeds {
            let mut res = self.fetch_feed(url).await;
            outcomes.push(res.outcome);
            items.append(&mut res.items);
        }
        let outcome = merge_outcomes(&outcomes, items.len());
        FetchResult { items, outcome }
    }
}
