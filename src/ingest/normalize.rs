// src/ingest/normalize.rs
//! Turns one adapter's raw items into `Signal`s: text cleanup, timestamp parsing, stable ids,
//! keyword tagging, location/category/risk hints, and first-wins dedup within the batch.

use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::geo;
use crate::ingest::types::{NormalizationWarning, RawItem, Signal, SourceKind};
use crate::triage::{heuristic_category, heuristic_risk};

pub const HEADLINE_MAX_CHARS: usize = 500;
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Supply-chain relevance vocabulary used for `matched_keywords`.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "port strike",
    "cement",
    "steel",
    "shortage",
    "supply chain",
    "factory",
    "infrastructure",
    "logistics",
    "shipping",
    "freight",
    "cargo",
    "port",
    "disruption",
    "strike",
    "manufacturing",
    "inventory",
    "shipment",
    "supplier",
    "procurement",
    "warehouse",
    "distribution",
    "export",
    "import",
    "container",
    "rail",
    "trucking",
    "delivery",
    "outage",
    "closure",
    "backlog",
    "blockade",
    "congestion",
    "sanction",
];

/// Clean upstream text: decode entities, strip tags, ASCII quotes, collapse whitespace, cap length.
pub fn clean_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect::<String>().trim_end().to_string();
    }
    out
}

/// Parse the timestamp formats our upstreams emit:
/// RFC 3339 (NewsAPI), RFC 2822 (RSS), `YYYYMMDDTHHMMSSZ` (GDELT seendate), `YYYY-MM-DD HH:MM`.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            OffsetDateTime::parse(s, &Rfc2822)
                .ok()
                .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
        })
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ").ok().map(|n| n.and_utc()))
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").ok().map(|n| n.and_utc()))
}

/// Deterministic id: source tag, URL (headline when there is none) and the hour bucket of the
/// upstream timestamp. Items without a usable upstream timestamp use `-` for the bucket, so
/// re-fetching them reproduces the same id.
pub fn signal_id(
    source: SourceKind,
    url: &str,
    headline: &str,
    upstream_time: Option<DateTime<Utc>>,
) -> String {
    let key = if url.is_empty() {
        headline.to_lowercase()
    } else {
        url.to_string()
    };
    let bucket = upstream_time
        .map(|t| t.timestamp().div_euclid(3600).to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(key.as_bytes());
    hasher.update(b"|");
    hasher.update(bucket.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub empty_headline: usize,
    /// No vocabulary match from a source that does not filter by keyword.
    pub off_topic: usize,
    pub duplicate: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.empty_headline + self.off_topic + self.duplicate
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub signals: Vec<Signal>,
    pub dropped: DropCounts,
}

pub struct Normalizer {
    vocabulary: Vec<(String, Regex)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        let vocabulary = DEFAULT_VOCABULARY
            .iter()
            .filter_map(|kw| keyword_regex(kw).ok().map(|re| (kw.to_string(), re)))
            .collect();
        Self { vocabulary }
    }
}

/// Whole-word match that also accepts a plural suffix ("strikes", "shortages").
fn keyword_regex(kw: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b{}(?:s|es)?\b", regex::escape(kw.trim())))
}

impl Normalizer {
    /// Custom vocabulary (e.g. from config). Blank entries are skipped.
    pub fn with_vocabulary<I, S>(vocabulary: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for kw in vocabulary {
            let kw = kw.as_ref().trim().to_lowercase();
            if kw.is_empty() || !seen.insert(kw.clone()) {
                continue;
            }
            let re = keyword_regex(&kw).with_context(|| format!("keyword {kw:?}"))?;
            out.push((kw, re));
        }
        Ok(Self { vocabulary: out })
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.iter().map(|(k, _)| k.as_str())
    }

    pub fn match_keywords(&self, text: &str) -> BTreeSet<String> {
        self.vocabulary
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn normalize(&self, raw: Vec<RawItem>, source: SourceKind) -> NormalizedBatch {
        self.normalize_at(raw, source, Utc::now())
    }

    /// Same as [`Normalizer::normalize`] with an explicit ingestion time.
    pub fn normalize_at(
        &self,
        raw: Vec<RawItem>,
        source: SourceKind,
        ingested_at: DateTime<Utc>,
    ) -> NormalizedBatch {
        let mut batch = NormalizedBatch {
            signals: Vec::with_capacity(raw.len()),
            dropped: DropCounts::default(),
        };
        let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());

        for item in raw {
            let headline = clean_text(&item.headline, HEADLINE_MAX_CHARS);
            if headline.is_empty() {
                batch.dropped.empty_headline += 1;
                continue;
            }
            let summary = clean_text(item.summary.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS);

            let matched_keywords = self.match_keywords(&format!("{headline} {summary}"));
            if matched_keywords.is_empty() && !source.keyword_prefiltered() {
                batch.dropped.off_topic += 1;
                continue;
            }

            let mut warnings = Vec::new();
            let upstream_time = match item.published.as_deref().map(str::trim) {
                None | Some("") => {
                    warnings.push(NormalizationWarning::MissingTimestamp);
                    None
                }
                Some(raw_ts) => {
                    let parsed = parse_published(raw_ts);
                    if parsed.is_none() {
                        warnings.push(NormalizationWarning::UnparseableTimestamp {
                            raw: raw_ts.to_string(),
                        });
                    }
                    parsed
                }
            };

            let url = item
                .url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty() && *u != "#")
                .unwrap_or_default()
                .to_string();

            let id = signal_id(source, &url, &headline, upstream_time);
            if !seen.insert(id.clone()) {
                batch.dropped.duplicate += 1;
                continue;
            }

            let location_hint = geo::locate(&headline)
                .or_else(|| geo::locate(&summary))
                .map(str::to_string);
            let outlet = item
                .outlet
                .as_deref()
                .map(|o| clean_text(o, 120))
                .filter(|o| !o.is_empty());

            batch.signals.push(Signal {
                id,
                source,
                category_hint: heuristic_category(&headline),
                risk_hint: heuristic_risk(&headline, &summary),
                curated_risk: None,
                commodity: None,
                headline,
                summary,
                url,
                published_at: upstream_time.unwrap_or(ingested_at),
                location_hint,
                matched_keywords,
                outlet,
                warnings,
            });
        }

        let d = batch.dropped;
        counter!("ingest_dropped_total", "reason" => "empty_headline")
            .increment(d.empty_headline as u64);
        counter!("ingest_dropped_total", "reason" => "off_topic").increment(d.off_topic as u64);
        counter!("ingest_dropped_total", "reason" => "duplicate").increment(d.duplicate as u64);
        tracing::debug!(
            target: "ingest",
            source = %source,
            kept = batch.signals.len(),
            empty_headline = d.empty_headline,
            off_topic = d.off_topic,
            duplicate = d.duplicate,
            "normalized batch"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(headline: &str, url: Option<&str>, published: Option<&str>) -> RawItem {
        RawItem {
            headline: headline.into(),
            summary: Some("Dock workers walk out at the container terminal.".into()),
            url: url.map(str::to_string),
            published: published.map(str::to_string),
            outlet: Some("example.com".into()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn clean_text_decodes_strips_and_collapses() {
        let out = clean_text("  <b>Port&nbsp;&nbsp;strike</b>  \u{201C}looms\u{201D}! ", 100);
        assert_eq!(out, "Port strike \"looms\"!");
        assert_eq!(clean_text("abcdef", 3), "abc");
    }

    #[test]
    fn parses_each_upstream_format() {
        let want = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_published("2024-01-15T10:30:00Z"), Some(want));
        assert_eq!(parse_published("Mon, 15 Jan 2024 10:30:00 +0000"), Some(want));
        assert_eq!(parse_published("20240115T103000Z"), Some(want));
        assert_eq!(parse_published("2024-01-15 10:30"), Some(want));
        assert_eq!(parse_published("yesterday"), None);
    }

    #[test]
    fn same_item_twice_gets_same_id_and_is_deduped() {
        let n = Normalizer::default();
        let raw = vec![
            item("Port strike in LA", Some("https://x/a"), Some("2024-01-15T10:30:00Z")),
            item("Port strike in LA", Some("https://x/a"), Some("2024-01-15T10:45:00Z")),
        ];
        let batch = n.normalize_at(raw.clone(), SourceKind::Gdelt, now());
        assert_eq!(batch.signals.len(), 1);
        assert_eq!(batch.dropped.duplicate, 1);

        let again = n.normalize_at(raw, SourceKind::Gdelt, now());
        assert_eq!(again.signals[0].id, batch.signals[0].id);
    }

    #[test]
    fn id_depends_on_source_and_falls_back_to_headline() {
        let a = signal_id(SourceKind::Gdelt, "", "Port Strike", None);
        let b = signal_id(SourceKind::Gdelt, "", "port strike", None);
        let c = signal_id(SourceKind::Rss, "", "port strike", None);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn missing_or_bad_timestamp_uses_ingestion_time_with_warning() {
        let n = Normalizer::default();
        let raw = vec![
            item("Cement shortage deepens", Some("https://x/1"), None),
            item("Steel mill outage", Some("https://x/2"), Some("last tuesday")),
        ];
        let batch = n.normalize_at(raw, SourceKind::NewsApi, now());
        assert_eq!(batch.signals.len(), 2);
        assert!(batch.signals.iter().all(|s| s.published_at == now()));
        assert_eq!(
            batch.signals[0].warnings,
            vec![NormalizationWarning::MissingTimestamp]
        );
        assert!(matches!(
            batch.signals[1].warnings[0],
            NormalizationWarning::UnparseableTimestamp { .. }
        ));
    }

    #[test]
    fn rss_items_need_a_keyword_match() {
        let n = Normalizer::default();
        let off_topic = RawItem {
            headline: "Celebrity chef opens bistro".into(),
            summary: Some("A new menu for spring.".into()),
            ..Default::default()
        };
        let on_topic = RawItem {
            headline: "Freight rates climb on Red Sea detours".into(),
            ..Default::default()
        };
        let batch = n.normalize_at(vec![off_topic.clone(), on_topic], SourceKind::Rss, now());
        assert_eq!(batch.signals.len(), 1);
        assert_eq!(batch.dropped.off_topic, 1);
        assert_eq!(batch.signals[0].location_hint.as_deref(), Some("Red Sea"));
        assert!(batch.signals[0].matched_keywords.contains("freight"));

        // query-filtered sources keep it
        let batch = n.normalize_at(vec![off_topic], SourceKind::Gdelt, now());
        assert_eq!(batch.signals.len(), 1);
    }

    #[test]
    fn keywords_match_on_word_boundaries() {
        let n = Normalizer::default();
        let kws = n.match_keywords("Analysts report record imports");
        assert!(!kws.contains("port"));
        assert!(kws.contains("import"));
        assert!(n.match_keywords("Supportive comments").is_empty());
        let kws = n.match_keywords("Port strike halts import of steel");
        for k in ["port", "port strike", "strike", "import", "steel"] {
            assert!(kws.contains(k), "missing {k}");
        }
    }

    #[test]
    fn plural_headlines_are_on_topic() {
        let n = Normalizer::default();
        let raw = [
            "Chip shortages ripple across automakers",
            "Dockworkers stage strikes at three ports",
            "New sanctions curb exports of rare earths",
        ]
        .into_iter()
        .map(|h| RawItem {
            headline: h.into(),
            ..Default::default()
        })
        .collect();
        let batch = n.normalize_at(raw, SourceKind::Rss, now());
        assert_eq!(batch.dropped.off_topic, 0);
        assert_eq!(batch.signals.len(), 3);
        assert!(batch.signals[0].matched_keywords.contains("shortage"));
        let ports = &batch.signals[1].matched_keywords;
        assert!(ports.contains("strike") && ports.contains("port"));
        let trade = &batch.signals[2].matched_keywords;
        assert!(trade.contains("sanction") && trade.contains("export"));
    }

    #[test]
    fn empty_headlines_and_placeholder_urls() {
        let n = Normalizer::default();
        let raw = vec![
            item("   ", None, None),
            item("Rail backlog grows", Some("#"), None),
        ];
        let batch = n.normalize_at(raw, SourceKind::NewsApi, now());
        assert_eq!(batch.dropped.empty_headline, 1);
        assert_eq!(batch.signals[0].url, "");
    }

    #[test]
    fn custom_vocabulary_is_deduped_and_trimmed() {
        let n = Normalizer::with_vocabulary([" Lithium ", "lithium", "", "cobalt"]).unwrap();
        assert_eq!(n.vocabulary().collect::<Vec<_>>(), ["lithium", "cobalt"]);
    }
}
