// src/ingest/types.rs
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyze::schema::Category;

/// Upstream a signal was served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    Gdelt,
    NewsApi,
    Rss,
    /// Built-in sample batch; never part of the live chain.
    Demo,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Gdelt => "GDELT",
            SourceKind::NewsApi => "NEWSAPI",
            SourceKind::Rss => "RSS",
            SourceKind::Demo => "DEMO",
        }
    }

    /// Whether the upstream query already filtered by keyword. RSS feeds are curated but
    /// unfiltered, so their items must match the vocabulary to be kept.
    pub fn keyword_prefiltered(self) -> bool {
        !matches!(self, SourceKind::Rss)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item exactly as an adapter pulled it out of the upstream payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub headline: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    /// Upstream timestamp text, format depends on the source.
    pub published: Option<String>,
    /// Publisher display name (domain, NewsAPI source name, feed title).
    pub outlet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchOutcome {
    Ok,
    Empty,
    RateLimited,
    Error,
}

impl FetchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchOutcome::Ok => "ok",
            FetchOutcome::Empty => "empty",
            FetchOutcome::RateLimited => "rate_limited",
            FetchOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub items: Vec<RawItem>,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    /// OK when there is at least one item, EMPTY otherwise.
    pub fn from_items(items: Vec<RawItem>) -> Self {
        let outcome = if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Ok
        };
        Self { items, outcome }
    }

    pub fn failed(outcome: FetchOutcome) -> Self {
        Self {
            items: Vec::new(),
            outcome,
        }
    }
}

/// One upstream news source in the fallback chain.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// False when a required credential is missing; the chain then never calls `fetch`.
    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, keywords: &[String], window: Duration) -> FetchResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationWarning {
    MissingTimestamp,
    UnparseableTimestamp { raw: String },
}

/// One normalized news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub source: SourceKind,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub location_hint: Option<String>,
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
    #[serde(default)]
    pub outlet: Option<String>,
    #[serde(default)]
    pub category_hint: Option<Category>,
    #[serde(default = "default_risk_hint")]
    pub risk_hint: u8,
    /// 1..=10 risk that came with the item rather than from keywords (the demo batch).
    /// A model analysis still takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curated_risk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commodity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NormalizationWarning>,
}

fn default_risk_hint() -> u8 {
    1
}
