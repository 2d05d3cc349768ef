// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::SourcesConfig;
use crate::ingest::normalize::Normalizer;
use crate::ingest::providers::{GdeltAdapter, NewsApiAdapter, RssAdapter};
use crate::ingest::types::{FetchOutcome, Signal, SourceAdapter, SourceKind};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_fetch_attempts_total",
            "Adapter fetches by source and outcome."
        );
        describe_counter!(
            "ingest_signals_kept_total",
            "Signals returned to the caller by source."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Raw items dropped by the normalizer, by reason."
        );
        describe_counter!(
            "ingest_exhausted_total",
            "Acquisitions where no source produced a signal."
        );
        describe_histogram!("ingest_parse_ms", "Upstream body parse time in milliseconds.");
    });
}

/// A source that was tried and could not serve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} unavailable: {reason}")]
pub struct SourceUnavailable {
    pub kind: SourceKind,
    /// `rate_limited` or `error`
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Served { signals: usize },
    /// Upstream answered, but nothing survived normalization.
    Empty { raw_items: usize },
    Unavailable { reason: String },
    /// Never called (missing credential).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttempt {
    pub source: SourceKind,
    #[serde(flatten)]
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum SourceUsed {
    Source(SourceKind),
    NoneAvailable,
    Demo,
}

/// Result of one pass over the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub signals: Vec<Signal>,
    pub source_used: SourceUsed,
    pub attempts: Vec<SourceAttempt>,
}

impl Acquisition {
    pub fn is_exhausted(&self) -> bool {
        self.source_used == SourceUsed::NoneAvailable
    }

    /// Unavailable attempts as typed errors, in chain order.
    pub fn unavailable(&self) -> Vec<SourceUnavailable> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.status {
                AttemptStatus::Unavailable { reason } => Some(SourceUnavailable {
                    kind: a.source,
                    reason: if reason == FetchOutcome::RateLimited.as_str() {
                        FetchOutcome::RateLimited.as_str()
                    } else {
                        FetchOutcome::Error.as_str()
                    },
                }),
                _ => None,
            })
            .collect()
    }
}

/// Ordered adapters; the first one that yields signals wins and nothing is merged.
pub struct FallbackChain {
    adapters: Vec<Box<dyn SourceAdapter>>,
    normalizer: Normalizer,
}

impl FallbackChain {
    pub fn new(adapters: Vec<Box<dyn SourceAdapter>>, normalizer: Normalizer) -> Self {
        Self {
            adapters,
            normalizer,
        }
    }

    /// GDELT, then NewsAPI, then RSS.
    pub fn from_config(cfg: &SourcesConfig) -> Result<Self> {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(GdeltAdapter::from_config(&cfg.gdelt)?),
            Box::new(NewsApiAdapter::from_config(&cfg.newsapi)?),
            Box::new(RssAdapter::from_config(&cfg.rss)?),
        ];
        let normalizer = match &cfg.vocabulary {
            Some(v) => Normalizer::with_vocabulary(v)?,
            None => Normalizer::default(),
        };
        Ok(Self::new(adapters, normalizer))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn order(&self) -> Vec<SourceKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    pub async fn acquire_signals(&self, keywords: &[String], window: Duration) -> Acquisition {
        ensure_metrics_described();
        let mut attempts = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let kind = adapter.kind();
            if !adapter.is_available() {
                tracing::info!(target: "ingest", source = %kind, "skipped: no credential");
                counter!("ingest_fetch_attempts_total", "source" => kind.as_str(), "outcome" => "skipped")
                    .increment(1);
                attempts.push(SourceAttempt {
                    source: kind,
                    status: AttemptStatus::Skipped,
                });
                continue;
            }

            let t0 = std::time::Instant::now();
            let res = adapter.fetch(keywords, window).await;
            counter!("ingest_fetch_attempts_total", "source" => kind.as_str(), "outcome" => res.outcome.as_str())
                .increment(1);

            match res.outcome {
                FetchOutcome::RateLimited | FetchOutcome::Error => {
                    let err = SourceUnavailable {
                        kind,
                        reason: res.outcome.as_str(),
                    };
                    tracing::warn!(target: "ingest", source = %kind, ms = t0.elapsed().as_millis() as u64, "{err}; falling back");
                    attempts.push(SourceAttempt {
                        source: kind,
                        status: AttemptStatus::Unavailable {
                            reason: err.reason.to_string(),
                        },
                    });
                }
                FetchOutcome::Empty | FetchOutcome::Ok => {
                    let raw_items = res.items.len();
                    let batch = self.normalizer.normalize(res.items, kind);
                    if batch.signals.is_empty() {
                        tracing::info!(target: "ingest", source = %kind, raw_items, dropped = batch.dropped.total(), "no signals; falling back");
                        attempts.push(SourceAttempt {
                            source: kind,
                            status: AttemptStatus::Empty { raw_items },
                        });
                        continue;
                    }
                    let kept = batch.signals.len();
                    tracing::info!(target: "ingest", source = %kind, raw_items, kept, ms = t0.elapsed().as_millis() as u64, "source served");
                    counter!("ingest_signals_kept_total", "source" => kind.as_str())
                        .increment(kept as u64);
                    attempts.push(SourceAttempt {
                        source: kind,
                        status: AttemptStatus::Served { signals: kept },
                    });
                    return Acquisition {
                        signals: batch.signals,
                        source_used: SourceUsed::Source(kind),
                        attempts,
                    };
                }
            }
        }

        tracing::warn!(target: "ingest", tried = attempts.len(), "every source exhausted");
        counter!("ingest_exhausted_total").increment(1);
        Acquisition {
            signals: Vec::new(),
            source_used: SourceUsed::NoneAvailable,
            attempts,
        }
    }

    /// Live acquisition, with the built-in demo batch standing in on exhaustion.
    pub async fn acquire_or_demo(&self, keywords: &[String], window: Duration) -> Acquisition {
        let mut acq = self.acquire_signals(keywords, window).await;
        if acq.is_exhausted() {
            acq.signals = crate::demo::demo_signals(&self.normalizer, Utc::now());
            acq.source_used = SourceUsed::Demo;
            tracing::info!(target: "ingest", signals = acq.signals.len(), "serving demo batch");
        }
        acq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{FetchResult, RawItem};
    use async_trait::async_trait;

    struct Fixed(SourceKind, FetchOutcome, Vec<&'static str>);

    #[async_trait]
    impl SourceAdapter for Fixed {
        fn kind(&self) -> SourceKind {
            self.0
        }
        async fn fetch(&self, _k: &[String], _w: Duration) -> FetchResult {
            FetchResult {
                outcome: self.1,
                items: self
                    .2
                    .iter()
                    .map(|h| RawItem {
                        headline: h.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            }
        }
    }

    #[tokio::test]
    async fn ok_with_only_off_topic_rss_items_falls_through() {
        let chain = FallbackChain::new(
            vec![
                Box::new(Fixed(SourceKind::Rss, FetchOutcome::Ok, vec!["Webinar recap"])),
                Box::new(Fixed(SourceKind::Gdelt, FetchOutcome::Ok, vec!["Port strike in Rotterdam"])),
            ],
            Normalizer::default(),
        );
        let acq = chain.acquire_signals(&[], Duration::from_secs(3600)).await;
        assert_eq!(acq.source_used, SourceUsed::Source(SourceKind::Gdelt));
        assert_eq!(acq.attempts[0].status, AttemptStatus::Empty { raw_items: 1 });
        assert_eq!(acq.signals.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_attempts_surface_as_typed_errors() {
        let chain = FallbackChain::new(
            vec![
                Box::new(Fixed(SourceKind::Gdelt, FetchOutcome::RateLimited, vec![])),
                Box::new(Fixed(SourceKind::Rss, FetchOutcome::Error, vec![])),
            ],
            Normalizer::default(),
        );
        let acq = chain.acquire_signals(&[], Duration::from_secs(3600)).await;
        assert!(acq.is_exhausted());
        let errs = acq.unavailable();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].to_string(), "GDELT unavailable: rate_limited");
        assert_eq!(errs[1].reason, "error");
    }
}
