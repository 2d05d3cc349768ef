//! Keyword heuristics for signals that have not been through the model yet, plus the
//! filters and the health index the dashboard shows over a batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyze::schema::{AnalysisResult, Category};
use crate::geo::{self, Region};
use crate::ingest::types::Signal;

/// First matching rule wins, so order encodes precedence.
const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (
        Category::Construction,
        &["cement", "steel", "lumber", "infrastructure"],
    ),
    (
        Category::Disruption,
        &["strike", "port", "congestion", "canal", "blockade"],
    ),
    (Category::Shortage, &["shortage"]),
    (Category::Manufacturing, &["factory", "fab", "assembly"]),
    (Category::Geopolitical, &["sanction", "trade", "export"]),
];

/// Substring match on the lowercased headline; `None` means "general".
pub fn heuristic_category(headline: &str) -> Option<Category> {
    let t = headline.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, words)| words.iter().any(|w| t.contains(w)))
        .map(|(c, _)| *c)
}

/// 1..=5 keyword risk for items the model has not scored.
pub fn heuristic_risk(headline: &str, summary: &str) -> u8 {
    let t = format!("{headline} {summary}").to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| t.contains(w));
    if any(&["strike", "shortage", "blockade", "outage", "closure", "crisis"]) {
        4
    } else if any(&["disruption", "delay", "backlog", "congestion"]) {
        3
    } else if any(&["supply chain", "logistics", "shipping", "freight", "port", "cargo"]) {
        2
    } else {
        1
    }
}

/// Risk and category for a signal: the model's verdict when there is one, then the
/// curated score, then the keyword hints.
pub fn effective(
    signal: &Signal,
    analyses: &HashMap<String, AnalysisResult>,
) -> (u8, Option<Category>) {
    match analyses.get(&signal.id) {
        Some(a) => (a.risk_score, Some(a.category)),
        None => (
            signal.curated_risk.unwrap_or(signal.risk_hint),
            signal.category_hint,
        ),
    }
}

/// Supply Chain Health Index, 0..=100, higher is healthier.
///
/// Each high-risk signal (>= 7) costs 5 points and each disruption costs 3.
pub fn health_index(signals: &[Signal], analyses: &HashMap<String, AnalysisResult>) -> u8 {
    let (high, disruptions) = signals.iter().fold((0u32, 0u32), |(h, d), s| {
        let (risk, cat) = effective(s, analyses);
        (
            h + u32::from(risk >= 7),
            d + u32::from(cat == Some(Category::Disruption)),
        )
    });
    let penalty = high * 5 + disruptions * 3;
    100u32.saturating_sub(penalty) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn contains(self, risk: u8) -> bool {
        match self {
            RiskBand::Low => risk <= 3,
            RiskBand::Medium => (4..=6).contains(&risk),
            RiskBand::High => risk >= 7,
        }
    }
}

/// Every `None` field means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageFilter {
    #[serde(default)]
    pub risk_band: Option<RiskBand>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub region: Option<Region>,
    /// Case-insensitive; signals without a commodity never match.
    #[serde(default)]
    pub commodity: Option<String>,
}

pub fn filter_signals<'a>(
    signals: &'a [Signal],
    analyses: &HashMap<String, AnalysisResult>,
    filter: &TriageFilter,
) -> Vec<&'a Signal> {
    signals
        .iter()
        .filter(|s| {
            let (risk, cat) = effective(s, analyses);
            let region = s.location_hint.as_deref().and_then(geo::region_for);
            filter.risk_band.map_or(true, |b| b.contains(risk))
                && filter.category.map_or(true, |c| cat == Some(c))
                && filter.region.map_or(true, |r| region == Some(r))
                && filter.commodity.as_deref().map_or(true, |want| {
                    s.commodity
                        .as_deref()
                        .is_some_and(|have| have.eq_ignore_ascii_case(want.trim()))
                })
        })
        .collect()
}
