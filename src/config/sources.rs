// src/config/sources.rs
use serde::{Deserialize, Serialize};

use std::time::Duration;

use super::{resolve_key, timeout_secs};

/// Keyword list sent upstream when the caller does not supply one.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "port strike",
    "supply chain",
    "shortage",
    "factory",
    "shipping",
    "freight",
    "cement",
    "steel",
];

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.supplychaindive.com/feeds/news/",
    "https://www.freightwaves.com/news/feed",
    "https://www.logisticsmgmt.com/rss/topic/all",
    "https://www.joc.com/rss.xml",
];

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}
fn default_window_hours() -> u64 {
    48
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
    /// Replaces the built-in relevance vocabulary when set.
    pub vocabulary: Option<Vec<String>>,
    /// Serve the demo batch when every live source comes back empty.
    #[serde(default = "default_true")]
    pub demo_fallback: bool,
    pub gdelt: GdeltConfig,
    pub newsapi: NewsApiConfig,
    pub rss: RssConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            window_hours: default_window_hours(),
            vocabulary: None,
            demo_fallback: true,
            gdelt: GdeltConfig::default(),
            newsapi: NewsApiConfig::default(),
            rss: RssConfig::default(),
        }
    }
}

impl SourcesConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_hours.max(1) * 3600)
    }

    pub(crate) fn resolve_credentials(&mut self) {
        self.newsapi.api_key = resolve_key(self.newsapi.api_key.take(), "NEWSAPI_API_KEY");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GdeltConfig {
    pub url: String,
    pub max_records: u32,
    pub timeout_secs: u64,
}

impl GdeltConfig {
    pub fn timeout(&self) -> Duration {
        timeout_secs(self.timeout_secs)
    }
}

impl Default for GdeltConfig {
    fn default() -> Self {
        Self {
            url: "https://api.gdeltproject.org/api/v2/doc/doc".into(),
            max_records: 25,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    pub url: String,
    /// "ENV" means: read from NEWSAPI_API_KEY
    pub api_key: Option<String>,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl NewsApiConfig {
    pub fn timeout(&self) -> Duration {
        timeout_secs(self.timeout_secs)
    }
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            url: "https://newsapi.org/v2/everything".into(),
            api_key: Some("ENV".into()),
            page_size: 50,
            timeout_secs: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    pub feeds: Vec<String>,
    pub max_entries_per_feed: usize,
    /// Per feed, not for the whole list.
    pub timeout_secs: u64,
}

impl RssConfig {
    pub fn timeout(&self) -> Duration {
        timeout_secs(self.timeout_secs)
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            max_entries_per_feed: 15,
            timeout_secs: 10,
        }
    }
}
