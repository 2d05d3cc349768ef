//! Gazetteer for best-effort location hints.
//!
//! Matching is case-insensitive on word boundaries. When several places appear in the
//! same text, the one mentioned first wins; ties go to the longer name, so
//! "Panama Canal" beats "Panama".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Asia,
    Europe,
    Americas,
    Africa,
    MiddleEast,
    Oceania,
}

struct Place {
    /// Canonical label stored in `Signal::location_hint`.
    label: &'static str,
    re: Regex,
}

// (pattern, label, region). Patterns are literal names; aliases share a label.
const PLACES: &[(&str, &str, Region)] = &[
    ("los angeles", "Los Angeles, USA", Region::Americas),
    ("long beach", "Long Beach, USA", Region::Americas),
    ("houston", "Houston, USA", Region::Americas),
    ("savannah", "Savannah, USA", Region::Americas),
    ("new york", "New York, USA", Region::Americas),
    ("vancouver", "Vancouver, Canada", Region::Americas),
    ("panama canal", "Panama Canal, Panama", Region::Americas),
    ("panama city", "Panama City, Panama", Region::Americas),
    ("panama", "Panama", Region::Americas),
    ("santos", "Santos, Brazil", Region::Americas),
    ("antofagasta", "Antofagasta, Chile", Region::Americas),
    ("mexico", "Mexico", Region::Americas),
    ("united states", "United States", Region::Americas),
    ("u.s.", "United States", Region::Americas),
    ("canada", "Canada", Region::Americas),
    ("brazil", "Brazil", Region::Americas),
    ("chile", "Chile", Region::Americas),
    ("rotterdam", "Rotterdam, Netherlands", Region::Europe),
    ("antwerp", "Antwerp, Belgium", Region::Europe),
    ("hamburg", "Hamburg, Germany", Region::Europe),
    ("felixstowe", "Felixstowe, UK", Region::Europe),
    ("wolfsburg", "Wolfsburg, Germany", Region::Europe),
    ("debrecen", "Debrecen, Hungary", Region::Europe),
    ("lombardy", "Lombardy, Italy", Region::Europe),
    ("istanbul", "Istanbul, Turkey", Region::Europe),
    ("odessa", "Odessa, Ukraine", Region::Europe),
    ("moscow", "Moscow, Russia", Region::Europe),
    ("germany", "Germany", Region::Europe),
    ("united kingdom", "United Kingdom", Region::Europe),
    ("uk", "United Kingdom", Region::Europe),
    ("france", "France", Region::Europe),
    ("italy", "Italy", Region::Europe),
    ("ukraine", "Ukraine", Region::Europe),
    ("russia", "Russia", Region::Europe),
    ("shanghai", "Shanghai, China", Region::Asia),
    ("shenzhen", "Shenzhen, China", Region::Asia),
    ("ningbo", "Ningbo, China", Region::Asia),
    ("zhengzhou", "Zhengzhou, China", Region::Asia),
    ("wuhan", "Wuhan, China", Region::Asia),
    ("beijing", "Beijing, China", Region::Asia),
    ("hong kong", "Hong Kong", Region::Asia),
    ("singapore", "Singapore", Region::Asia),
    ("busan", "Busan, South Korea", Region::Asia),
    ("hsinchu", "Hsinchu, Taiwan", Region::Asia),
    ("haiphong", "Haiphong, Vietnam", Region::Asia),
    ("manila", "Manila, Philippines", Region::Asia),
    ("chennai", "Chennai, India", Region::Asia),
    ("mumbai", "Mumbai, India", Region::Asia),
    ("dhaka", "Dhaka, Bangladesh", Region::Asia),
    ("strait of malacca", "Strait of Malacca", Region::Asia),
    ("china", "China", Region::Asia),
    ("taiwan", "Taiwan", Region::Asia),
    ("japan", "Japan", Region::Asia),
    ("south korea", "South Korea", Region::Asia),
    ("india", "India", Region::Asia),
    ("vietnam", "Vietnam", Region::Asia),
    ("bangladesh", "Bangladesh", Region::Asia),
    ("suez canal", "Suez Canal, Egypt", Region::MiddleEast),
    ("suez", "Suez, Egypt", Region::MiddleEast),
    ("red sea", "Red Sea", Region::MiddleEast),
    ("strait of hormuz", "Strait of Hormuz", Region::MiddleEast),
    ("tabuk", "Tabuk, Saudi Arabia", Region::MiddleEast),
    ("neom", "Tabuk, Saudi Arabia", Region::MiddleEast),
    ("dubai", "Dubai, UAE", Region::MiddleEast),
    ("saudi arabia", "Saudi Arabia", Region::MiddleEast),
    ("israel", "Israel", Region::MiddleEast),
    ("iran", "Iran", Region::MiddleEast),
    ("lagos", "Lagos, Nigeria", Region::Africa),
    ("durban", "Durban, South Africa", Region::Africa),
    ("abidjan", "Abidjan, Ivory Coast", Region::Africa),
    ("mombasa", "Mombasa, Kenya", Region::Africa),
    ("nigeria", "Nigeria", Region::Africa),
    ("south africa", "South Africa", Region::Africa),
    ("ivory coast", "Ivory Coast", Region::Africa),
    ("egypt", "Egypt", Region::Africa),
    ("sydney", "Sydney, Australia", Region::Oceania),
    ("melbourne", "Melbourne, Australia", Region::Oceania),
    ("australia", "Australia", Region::Oceania),
    ("new zealand", "New Zealand", Region::Oceania),
];

static GAZETTEER: Lazy<Vec<Place>> = Lazy::new(|| {
    PLACES
        .iter()
        .map(|&(pat, label, _)| Place {
            label,
            // \b cannot follow a trailing '.' (as in "u.s."), so close on end-of-text or \W.
            re: Regex::new(&format!(r"(?i)\b{}(?:$|\W)", regex::escape(pat)))
                .expect("static gazetteer pattern"),
        })
        .collect()
});

/// First place named in `text`, as its canonical label.
pub fn locate(text: &str) -> Option<&'static str> {
    GAZETTEER
        .iter()
        .filter_map(|p| p.re.find(text).map(|m| (m.start(), m.len(), p.label)))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, label)| label)
}

/// Region of a canonical label (as produced by [`locate`]).
pub fn region_for(label: &str) -> Option<Region> {
    PLACES
        .iter()
        .find(|(_, l, _)| l.eq_ignore_ascii_case(label))
        .map(|(_, _, r)| *r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_mention_wins() {
        let hint = locate("Strike at Rotterdam spreads to Hamburg terminals");
        assert_eq!(hint, Some("Rotterdam, Netherlands"));
    }

    #[test]
    fn longer_name_wins_at_same_position() {
        assert_eq!(
            locate("Panama Canal drought restricts draft"),
            Some("Panama Canal, Panama")
        );
    }

    #[test]
    fn no_partial_word_matches() {
        // "uk" must not match inside "ukulele"
        assert_eq!(locate("Ukulele makers report brisk sales"), None);
    }

    #[test]
    fn regions_resolve_from_labels() {
        assert_eq!(region_for("Los Angeles, USA"), Some(Region::Americas));
        assert_eq!(region_for("Red Sea"), Some(Region::MiddleEast));
        assert_eq!(region_for("Atlantis"), None);
    }
}
