// src/analyze/context.rs
//! Grounding context for brief and Q&A prompts. Pure; nothing is remembered between calls.

use serde::{Deserialize, Serialize};

use crate::ingest::types::Signal;

pub const DEFAULT_MAX_SIGNALS: usize = 50;

/// Rendered when the caller's view holds no signals.
pub const EMPTY_VIEW: &str = "No events in the current view";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub max_signals: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_signals: DEFAULT_MAX_SIGNALS,
        }
    }
}

impl ContextBudget {
    pub fn new(max_signals: usize) -> Self {
        Self {
            max_signals: max_signals.max(1),
        }
    }
}

/// Ids of the signals that made it into `rendered`, in render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    pub signal_ids: Vec<String>,
    pub rendered: String,
    /// Signals past the budget, neither rendered nor recorded.
    #[serde(default)]
    pub omitted: usize,
}

impl ContextPayload {
    /// Warning text for a truncated context, `None` when everything fit.
    pub fn truncation_warning(&self) -> Option<String> {
        (self.omitted > 0).then(|| {
            format!(
                "context truncated: {} of {} signals left out",
                self.omitted,
                self.omitted + self.signal_ids.len()
            )
        })
    }
}

/// One line per signal, in caller order, until the budget runs out.
pub fn build_context(signals: &[Signal], budget: ContextBudget) -> ContextPayload {
    if signals.is_empty() {
        return ContextPayload {
            signal_ids: Vec::new(),
            rendered: EMPTY_VIEW.to_string(),
            omitted: 0,
        };
    }
    let window = &signals[..signals.len().min(budget.max_signals)];
    let rendered = window
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join("\n");
    ContextPayload {
        signal_ids: window.iter().map(|s| s.id.clone()).collect(),
        rendered,
        omitted: signals.len() - window.len(),
    }
}

fn render_line(s: &Signal) -> String {
    format!(
        "- [{}/5] {} | {} | {}",
        s.risk_hint,
        s.headline,
        s.category_hint.map(|c| c.as_str()).unwrap_or("General"),
        s.location_hint.as_deref().unwrap_or("Unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::schema::Category;
    use crate::ingest::types::SourceKind;
    use chrono::Utc;

    fn sig(id: &str, headline: &str) -> Signal {
        Signal {
            id: id.into(),
            source: SourceKind::Gdelt,
            headline: headline.into(),
            summary: String::new(),
            url: String::new(),
            published_at: Utc::now(),
            location_hint: None,
            matched_keywords: Default::default(),
            outlet: None,
            category_hint: None,
            risk_hint: 1,
            curated_risk: None,
            commodity: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn empty_view_is_explicit() {
        let ctx = build_context(&[], ContextBudget::default());
        assert!(ctx.signal_ids.is_empty());
        assert_eq!(ctx.rendered, EMPTY_VIEW);
    }

    #[test]
    fn line_format_uses_hints_and_fallbacks() {
        let mut a = sig("a", "Port strike in Rotterdam");
        a.risk_hint = 4;
        a.category_hint = Some(Category::Disruption);
        a.location_hint = Some("Rotterdam, Netherlands".into());
        let b = sig("b", "Quiet day");
        let ctx = build_context(&[a, b], ContextBudget::default());
        assert_eq!(
            ctx.rendered,
            "- [4/5] Port strike in Rotterdam | Disruption | Rotterdam, Netherlands\n\
             - [1/5] Quiet day | General | Unknown"
        );
        assert_eq!(ctx.signal_ids, vec!["a".to_string(), "b".into()]);
    }

    #[test]
    fn budget_truncates_ids_and_lines_together() {
        let signals: Vec<_> = (0..5).map(|i| sig(&format!("s{i}"), "x")).collect();
        let ctx = build_context(&signals, ContextBudget::new(3));
        assert_eq!(ctx.signal_ids, vec!["s0", "s1", "s2"]);
        assert_eq!(ctx.rendered.lines().count(), 3);
        assert_eq!(ctx.omitted, 2);
        assert_eq!(
            ctx.truncation_warning().as_deref(),
            Some("context truncated: 2 of 5 signals left out")
        );

        let fits = build_context(&signals, ContextBudget::default());
        assert_eq!(fits.omitted, 0);
        assert_eq!(fits.truncation_warning(), None);
    }
}
