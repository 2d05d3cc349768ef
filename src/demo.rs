// src/demo.rs
//! Built-in sample batch for demo mode and for live acquisitions that come back empty.
//!
//! Each event carries a curated location, risk score, category and commodity, so the health
//! index and the filters behave on the demo batch the way they do on analyzed live data.

use chrono::{DateTime, Duration, Utc};

use crate::analyze::schema::Category::{
    self, Construction, Disruption, Geopolitical, Manufacturing, Shortage,
};
use crate::ingest::normalize::Normalizer;
use crate::ingest::types::{RawItem, Signal, SourceKind};

const OUTLET: &str = "Global News Wire";

struct DemoEvent {
    hours_ago: i64,
    headline: &'static str,
    summary: &'static str,
    slug: &'static str,
    location: &'static str,
    risk: u8,
    category: Category,
    commodity: &'static str,
}

#[allow(clippy::too_many_arguments)]
const fn ev(
    hours_ago: i64,
    headline: &'static str,
    summary: &'static str,
    slug: &'static str,
    location: &'static str,
    risk: u8,
    category: Category,
    commodity: &'static str,
) -> DemoEvent {
    DemoEvent {
        hours_ago,
        headline,
        summary,
        slug,
        location,
        risk,
        category,
        commodity,
    }
}

const EVENTS: &[DemoEvent] = &[
    ev(1, "Port Strike Threatens West Coast Logistics",
        "Union vote authorizes strike at Los Angeles and Long Beach; shippers brace for delays.",
        "la-strike", "Los Angeles, USA", 9, Disruption, "General Cargo"),
    ev(2, "Panama Canal Drought Restricts Draft",
        "Canal authority limits vessel draft due to drought; some cargo must reroute.",
        "panama-canal", "Panama City, Panama", 8, Disruption, "All"),
    ev(3, "Trade Route Blockade in Red Sea",
        "Persistent attacks force major carriers to avoid the Red Sea; Suez traffic drops.",
        "red-sea", "Suez, Egypt", 9, Geopolitical, "Oil/Gas"),
    ev(4, "Chip Fab Contamination Halts Production",
        "Major semiconductor fab in Hsinchu halts production due to contamination incident.",
        "hsinchu-fab", "Hsinchu, Taiwan", 9, Manufacturing, "Semiconductors"),
    ev(5, "Typhoon Warnings Halt Shipping Lanes",
        "Typhoon forces closure of Manila port; shipping lanes suspended for 48h.",
        "manila-typhoon", "Manila, Philippines", 7, Disruption, "Electronics"),
    ev(6, "Critical Neon Gas Shortage for Lasers",
        "Neon gas supply from Ukraine remains constrained; chip makers seek alternatives.",
        "neon-ukraine", "Odessa, Ukraine", 8, Shortage, "Neon Gas"),
    ev(7, "New Sanctions Block Tech Exports",
        "Latest sanctions prohibit export of advanced chips and equipment to Russia.",
        "sanctions-tech", "Moscow, Russia", 8, Geopolitical, "Technology"),
    ev(8, "Foxconn Factory Power Outage",
        "Power outage at Foxconn Zhengzhou facility disrupts production lines.",
        "foxconn", "Zhengzhou, China", 7, Manufacturing, "Consumer Electronics"),
    ev(9, "Earthquake Damages Port Infrastructure",
        "Strong earthquake causes damage to port facilities; operations partially suspended.",
        "istanbul-quake", "Istanbul, Turkey", 7, Disruption, "General Cargo"),
    ev(10, "Railway Union Protest Blocks Freight",
        "Protest action blocks key rail lines near Hamburg; automotive supply chain impacted.",
        "hamburg-rail", "Hamburg, Germany", 6, Disruption, "Auto Parts"),
    ev(11, "Customs System Outage Delays Clearance",
        "Customs system failure at Felixstowe leads to container backlog.",
        "felixstowe", "Felixstowe, UK", 5, Disruption, "Retail Goods"),
    ev(12, "Rare Earth Export Restrictions Announced",
        "Beijing announces new export controls on rare earth elements and processing tech.",
        "rare-earth", "Beijing, China", 7, Geopolitical, "Rare Earths"),
    ev(13, "Flooding Closes Key Highway to Port",
        "Flooding on the Trans-Canada Highway disrupts cargo movement to Vancouver port.",
        "vancouver-flood", "Vancouver, Canada", 6, Disruption, "Lumber"),
    ev(14, "Auto Assembly Line Paused Missing Parts",
        "VW Wolfsburg pauses assembly due to missing components from Asia.",
        "wolfsburg", "Wolfsburg, Germany", 6, Manufacturing, "Automotive"),
    ev(15, "Textile Mill Fire Impacts Holiday Orders",
        "Fire at a major textile mill in Dhaka raises concerns for holiday apparel supply.",
        "dhaka-textile", "Dhaka, Bangladesh", 5, Manufacturing, "Textiles"),
    ev(16, "Lithium Pricing Surge Signals Scarcity",
        "Lithium prices hit new highs as EV demand outstrips supply; shortage feared.",
        "lithium", "Antofagasta, Chile", 6, Shortage, "Lithium"),
    ev(17, "Cocoa Bean Supply Drop Hits Chocolate Makers",
        "Cocoa harvest in Ivory Coast falls short; chocolate manufacturers warn of price increases.",
        "cocoa", "Abidjan, Ivory Coast", 4, Shortage, "Food"),
    ev(18, "Massive Cement Orders for New Zone in Haiphong",
        "Port data shows a 40% spike in cement imports destined for a new development zone.",
        "haiphong-cement", "Haiphong, Vietnam", 2, Construction, "Cement"),
    ev(19, "Steel Shipment Surge to Neom Project",
        "Steel deliveries to Red Sea ports for Neom have doubled, with no immediate disruption risk.",
        "neom-steel", "Tabuk, Saudi Arabia", 3, Construction, "Steel"),
    ev(20, "Lumber Stockpiling Detected in Texas Port",
        "Houston port logs show unusual lumber inventory build-up ahead of residential projects.",
        "houston-lumber", "Houston, USA", 4, Construction, "Lumber"),
    ev(20, "New Battery Plant Foundation Laid",
        "EV battery facility construction begins in Debrecen with concrete and steel deliveries ramping.",
        "debrecen-battery", "Debrecen, Hungary", 2, Construction, "Concrete"),
    ev(21, "Copper Wiring Imports Spike 400%",
        "Chennai port reports a 400% increase in copper wiring imports over the previous quarter.",
        "chennai-copper", "Chennai, India", 3, Construction, "Copper"),
    ev(22, "Infrastructure Expansion: Bridge Materials Arriving",
        "Steel and concrete shipments for new bridge and road projects are arriving at Lagos port.",
        "lagos-bridge", "Lagos, Nigeria", 5, Construction, "Steel"),
    ev(23, "RETROSPECTIVE: Unusual Spike in Medical Glove Exports",
        "Data showed abnormal medical glove and PPE exports from Wuhan in late 2019.",
        "wuhan-retro", "Wuhan, China", 10, Shortage, "Medical Supplies"),
    ev(24, "RETROSPECTIVE: Ventilator Parts Orders Triple",
        "Ventilator and ICU equipment orders spiked in Lombardy in early 2020.",
        "lombardy-retro", "Lombardy, Italy", 9, Shortage, "Medical Devices"),
];

fn demo_url(slug: &str) -> String {
    format!("https://example.com/{slug}")
}

/// Demo batch timestamped relative to `now`, normalized like live data, then stamped with
/// each event's curated location, risk, category and commodity.
pub fn demo_signals(normalizer: &Normalizer, now: DateTime<Utc>) -> Vec<Signal> {
    let raw = EVENTS
        .iter()
        .map(|e| RawItem {
            headline: e.headline.to_string(),
            summary: Some(e.summary.to_string()),
            url: Some(demo_url(e.slug)),
            published: Some(
                (now - Duration::hours(e.hours_ago))
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
            outlet: Some(OUTLET.to_string()),
        })
        .collect();

    let mut signals = normalizer.normalize_at(raw, SourceKind::Demo, now).signals;
    for s in &mut signals {
        if let Some(e) = EVENTS.iter().find(|e| demo_url(e.slug) == s.url) {
            s.location_hint = Some(e.location.to_string());
            s.category_hint = Some(e.category);
            s.curated_risk = Some(e.risk);
            s.commodity = Some(e.commodity.to_string());
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::geo;
    use crate::triage::{filter_signals, health_index, RiskBand, TriageFilter};

    #[test]
    fn every_demo_event_survives_normalization() {
        let now = Utc::now();
        let signals = demo_signals(&Normalizer::default(), now);
        assert_eq!(signals.len(), EVENTS.len());
        assert!(signals.iter().all(|s| s.source == SourceKind::Demo));
        assert!(signals.iter().all(|s| s.warnings.is_empty()));
        assert!(signals.iter().all(|s| s.published_at < now));
    }

    #[test]
    fn demo_batch_carries_curated_fields() {
        let signals = demo_signals(&Normalizer::default(), Utc::now());
        let strike = &signals[0];
        assert_eq!(strike.location_hint.as_deref(), Some("Los Angeles, USA"));
        assert_eq!(strike.category_hint, Some(Category::Disruption));
        assert_eq!(strike.curated_risk, Some(9));
        assert_eq!(strike.commodity.as_deref(), Some("General Cargo"));
        assert!(signals
            .iter()
            .all(|s| s.location_hint.as_deref().and_then(geo::region_for).is_some()));
        assert!(signals.iter().all(|s| s.curated_risk.is_some() && s.commodity.is_some()));
    }

    #[test]
    fn health_index_and_high_band_on_demo_batch() {
        let signals = demo_signals(&Normalizer::default(), Utc::now());
        let none = HashMap::new();

        // 12 high-risk events (-60) and 7 disruptions (-21)
        assert_eq!(health_index(&signals, &none), 19);

        let high = TriageFilter {
            risk_band: Some(RiskBand::High),
            ..Default::default()
        };
        assert_eq!(filter_signals(&signals, &none, &high).len(), 12);

        let steel = TriageFilter {
            commodity: Some("steel".into()),
            ..Default::default()
        };
        let hits = filter_signals(&signals, &none, &steel);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|s| s.category_hint == Some(Category::Construction)));
    }
}
