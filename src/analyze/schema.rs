//! Response contract for the three analysis modes.
//!
//! Model output is parsed into `serde_json::Value` first and then checked field by field, so a
//! rejection lists every missing or mistyped field at once instead of stopping at the first.
//! Numbers and booleans are never defaulted. The only repairs are the ones that cannot change
//! meaning, and each one leaves a warning on the `Validated` wrapper.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Closed set of event categories the dashboard knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Disruption,
    Construction,
    Shortage,
    Manufacturing,
    Geopolitical,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Disruption,
        Category::Construction,
        Category::Shortage,
        Category::Manufacturing,
        Category::Geopolitical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Disruption => "Disruption",
            Category::Construction => "Construction",
            Category::Shortage => "Shortage",
            Category::Manufacturing => "Manufacturing",
            Category::Geopolitical => "Geopolitical",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(t))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub short_term: String,
    pub medium_term: String,
    pub long_term: String,
}

/// Single-event risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 1..=10
    pub risk_score: u8,
    pub category: Category,
    pub affected_industries: Vec<String>,
    pub geographic_ripple: String,
    pub timeline: Timeline,
    pub reasoning: String,
    pub actionable_intelligence: String,
    pub construction_related: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_prediction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveBrief {
    pub summary: String,
    /// Exactly three, highest risk first.
    pub top_risks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Analysis,
    Brief,
    Answer,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Analysis => "analysis",
            Shape::Brief => "brief",
            Shape::Answer => "answer",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Analysis(AnalysisResult),
    Brief(ExecutiveBrief),
    Answer(String),
}

/// A value that passed validation, plus any non-fatal repairs made on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validated<T> {
    pub value: T,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> Validated<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validated<U> {
        Validated {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Null,
    WrongType { expected: String },
    OutOfRange { min: i64, max: i64, actual: String },
    UnknownCategory { actual: String },
    WrongLength { expected: usize, actual: usize },
    EmptyList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted JSON path, e.g. `timeline.long_term` or `top_risks[1]`.
    pub path: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "{}: missing", self.path),
            IssueKind::Null => write!(f, "{}: null", self.path),
            IssueKind::WrongType { expected } => write!(f, "{}: expected {expected}", self.path),
            IssueKind::OutOfRange { min, max, actual } => {
                write!(f, "{}: {actual} outside {min}..={max}", self.path)
            }
            IssueKind::UnknownCategory { actual } => {
                write!(f, "{}: unknown category {actual:?}", self.path)
            }
            IssueKind::WrongLength { expected, actual } => {
                write!(f, "{}: expected {expected} items, got {actual}", self.path)
            }
            IssueKind::EmptyList => write!(f, "{}: empty list", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{shape} response failed validation: {}", render_issues(.issues))]
pub struct ValidationError {
    pub shape: Shape,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ------------------------------------------------------------
// Entry points
// ------------------------------------------------------------

pub fn validate(raw: &Value, shape: Shape) -> Result<Validated<TypedValue>, ValidationError> {
    match shape {
        Shape::Analysis => validate_analysis(raw).map(|v| v.map(TypedValue::Analysis)),
        Shape::Brief => validate_brief(raw).map(|v| v.map(TypedValue::Brief)),
        Shape::Answer => validate_answer(raw).map(|v| v.map(TypedValue::Answer)),
    }
}

pub fn validate_analysis(raw: &Value) -> Result<Validated<AnalysisResult>, ValidationError> {
    let mut r = Report::new(Shape::Analysis);
    let Some(obj) = r.root(raw) else {
        return Err(r.into_error());
    };

    let risk_score = r.integer_in(obj, "", "risk_score", 1, 10);
    let category = r.category(obj, "", "category");
    let affected_industries = r.string_list(obj, "", "affected_industries");
    let geographic_ripple = r.text_or_joined_list(obj, "", "geographic_ripple");
    let timeline = r.object(obj, "", "timeline").map(|t| {
        (
            r.text(t, "timeline.", "short_term"),
            r.text(t, "timeline.", "medium_term"),
            r.text(t, "timeline.", "long_term"),
        )
    });
    let reasoning = r.text(obj, "", "reasoning");
    let actionable_intelligence = r.text(obj, "", "actionable_intelligence");
    let construction_related = r.boolean_with_alias(obj, "construction_related", "is_construction_related");
    let construction_prediction = r.optional_text(obj, "construction_prediction");

    match (
        risk_score,
        category,
        affected_industries,
        geographic_ripple,
        timeline,
        reasoning,
        actionable_intelligence,
        construction_related,
    ) {
        (
            Some(risk_score),
            Some(category),
            Some(affected_industries),
            Some(geographic_ripple),
            Some((Some(short_term), Some(medium_term), Some(long_term))),
            Some(reasoning),
            Some(actionable_intelligence),
            Some(construction_related),
        ) if r.issues.is_empty() => Ok(Validated {
            value: AnalysisResult {
                // range-checked above
                risk_score: risk_score as u8,
                category,
                affected_industries,
                geographic_ripple,
                timeline: Timeline {
                    short_term,
                    medium_term,
                    long_term,
                },
                reasoning,
                actionable_intelligence,
                construction_related,
                construction_prediction,
            },
            warnings: r.warnings,
        }),
        _ => Err(r.into_error()),
    }
}

pub fn validate_brief(raw: &Value) -> Result<Validated<ExecutiveBrief>, ValidationError> {
    let mut r = Report::new(Shape::Brief);
    let Some(obj) = r.root(raw) else {
        return Err(r.into_error());
    };

    let summary = r.text(obj, "", "summary");
    let top_risks = r.string_list(obj, "", "top_risks");
    if let Some(risks) = &top_risks {
        if risks.len() != 3 {
            r.issue(
                "top_risks",
                IssueKind::WrongLength {
                    expected: 3,
                    actual: risks.len(),
                },
            );
        }
    }

    match (summary, top_risks) {
        (Some(summary), Some(top_risks)) if r.issues.is_empty() => Ok(Validated {
            value: ExecutiveBrief { summary, top_risks },
            warnings: r.warnings,
        }),
        _ => Err(r.into_error()),
    }
}

pub fn validate_answer(raw: &Value) -> Result<Validated<String>, ValidationError> {
    let mut r = Report::new(Shape::Answer);
    let Some(obj) = r.root(raw) else {
        return Err(r.into_error());
    };
    match r.text(obj, "", "answer") {
        Some(answer) if r.issues.is_empty() => Ok(Validated {
            value: answer,
            warnings: r.warnings,
        }),
        _ => Err(r.into_error()),
    }
}

/// Parse model text as JSON, tolerating a surrounding markdown code fence.
pub fn extract_json(text: &str) -> Result<Value, serde_json::Error> {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        // drop the info string ("json") on the fence line
        t = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
        t = t.trim_end();
        t = t.strip_suffix("```").unwrap_or(t);
    }
    serde_json::from_str(t.trim())
}

/// JSON schema sent alongside the prompt so the endpoint constrains its output.
pub fn response_schema(shape: Shape) -> Value {
    let text = json!({ "type": "STRING" });
    match shape {
        Shape::Analysis => json!({
            "type": "OBJECT",
            "properties": {
                "risk_score": { "type": "INTEGER", "minimum": 1, "maximum": 10 },
                "category": {
                    "type": "STRING",
                    "enum": Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                },
                "affected_industries": { "type": "ARRAY", "items": text, "minItems": 1 },
                "geographic_ripple": text,
                "timeline": {
                    "type": "OBJECT",
                    "properties": {
                        "short_term": text,
                        "medium_term": text,
                        "long_term": text,
                    },
                    "required": ["short_term", "medium_term", "long_term"],
                },
                "reasoning": text,
                "actionable_intelligence": text,
                "construction_related": { "type": "BOOLEAN" },
                "construction_prediction": { "type": "STRING", "nullable": true },
            },
            "required": [
                "risk_score", "category", "affected_industries", "geographic_ripple",
                "timeline", "reasoning", "actionable_intelligence", "construction_related",
            ],
        }),
        Shape::Brief => json!({
            "type": "OBJECT",
            "properties": {
                "summary": text,
                "top_risks": { "type": "ARRAY", "items": text, "minItems": 3, "maxItems": 3 },
            },
            "required": ["summary", "top_risks"],
        }),
        Shape::Answer => json!({
            "type": "OBJECT",
            "properties": { "answer": text },
            "required": ["answer"],
        }),
    }
}

// ------------------------------------------------------------
// Field checks
// ------------------------------------------------------------

struct Report {
    shape: Shape,
    issues: Vec<FieldIssue>,
    warnings: Vec<String>,
}

impl Report {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            shape: self.shape,
            issues: self.issues,
        }
    }

    fn issue(&mut self, path: impl Into<String>, kind: IssueKind) {
        self.issues.push(FieldIssue {
            path: path.into(),
            kind,
        });
    }

    fn wrong_type(&mut self, path: impl Into<String>, expected: &str) {
        self.issue(
            path,
            IssueKind::WrongType {
                expected: expected.to_string(),
            },
        );
    }

    fn root<'v>(&mut self, raw: &'v Value) -> Option<&'v Map<String, Value>> {
        let obj = raw.as_object();
        if obj.is_none() {
            self.wrong_type("$", "object");
        }
        obj
    }

    /// Present and non-null, or an issue is recorded.
    fn required<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        prefix: &str,
        key: &str,
    ) -> Option<&'v Value> {
        match obj.get(key) {
            None => {
                self.issue(format!("{prefix}{key}"), IssueKind::Missing);
                None
            }
            Some(Value::Null) => {
                self.issue(format!("{prefix}{key}"), IssueKind::Null);
                None
            }
            Some(v) => Some(v),
        }
    }

    fn text(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) -> Option<String> {
        let v = self.required(obj, prefix, key)?;
        match v.as_str() {
            Some(s) => {
                let s = s.trim();
                if s.is_empty() {
                    self.warnings.push(format!("{prefix}{key} is empty"));
                }
                Some(s.to_string())
            }
            None => {
                self.wrong_type(format!("{prefix}{key}"), "string");
                None
            }
        }
    }

    fn optional_text(&mut self, obj: &Map<String, Value>, key: &str) -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => {
                self.warnings.push(format!("{key} ignored: not a string"));
                None
            }
        }
    }

    fn integer_in(
        &mut self,
        obj: &Map<String, Value>,
        prefix: &str,
        key: &str,
        min: i64,
        max: i64,
    ) -> Option<i64> {
        let v = self.required(obj, prefix, key)?;
        // 7.0 is a float in serde_json and is rejected along with 7.5 and "7"
        match v.as_i64() {
            Some(n) if (min..=max).contains(&n) => Some(n),
            Some(n) => {
                self.issue(
                    format!("{prefix}{key}"),
                    IssueKind::OutOfRange {
                        min,
                        max,
                        actual: n.to_string(),
                    },
                );
                None
            }
            None if v.is_u64() => {
                self.issue(
                    format!("{prefix}{key}"),
                    IssueKind::OutOfRange {
                        min,
                        max,
                        actual: v.to_string(),
                    },
                );
                None
            }
            None => {
                self.wrong_type(format!("{prefix}{key}"), "integer");
                None
            }
        }
    }

    fn category(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) -> Option<Category> {
        let v = self.required(obj, prefix, key)?;
        let Some(s) = v.as_str() else {
            self.wrong_type(format!("{prefix}{key}"), "string");
            return None;
        };
        let parsed = Category::parse(s);
        if parsed.is_none() {
            self.issue(
                format!("{prefix}{key}"),
                IssueKind::UnknownCategory {
                    actual: s.to_string(),
                },
            );
        }
        parsed
    }

    fn object<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        prefix: &str,
        key: &str,
    ) -> Option<&'v Map<String, Value>> {
        let v = self.required(obj, prefix, key)?;
        let o = v.as_object();
        if o.is_none() {
            self.wrong_type(format!("{prefix}{key}"), "object");
        }
        o
    }

    /// Array of strings; an empty array is an issue.
    fn string_list(
        &mut self,
        obj: &Map<String, Value>,
        prefix: &str,
        key: &str,
    ) -> Option<Vec<String>> {
        let v = self.required(obj, prefix, key)?;
        let Some(items) = v.as_array() else {
            self.wrong_type(format!("{prefix}{key}"), "array of strings");
            return None;
        };
        if items.is_empty() {
            self.issue(format!("{prefix}{key}"), IssueKind::EmptyList);
            return None;
        }
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) => out.push(s.trim().to_string()),
                None => {
                    self.wrong_type(format!("{prefix}{key}[{i}]"), "string");
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    /// Text, or a list of strings joined with ", " (models often answer with a country list).
    fn text_or_joined_list(
        &mut self,
        obj: &Map<String, Value>,
        prefix: &str,
        key: &str,
    ) -> Option<String> {
        if let Some(Value::Array(items)) = obj.get(key) {
            if let Some(parts) = items
                .iter()
                .map(|v| v.as_str().map(str::trim))
                .collect::<Option<Vec<_>>>()
            {
                self.warnings
                    .push(format!("{prefix}{key} given as a list; joined into text"));
                return Some(parts.join(", "));
            }
        }
        self.text(obj, prefix, key)
    }

    fn boolean_with_alias(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        alias: &str,
    ) -> Option<bool> {
        let lookup = if obj.contains_key(key) || !obj.contains_key(alias) {
            key
        } else {
            self.warnings.push(format!("{alias} read as {key}"));
            alias
        };
        let v = self.required(obj, "", lookup)?;
        let b = v.as_bool();
        if b.is_none() {
            self.wrong_type(lookup, "boolean");
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_analysis() -> Value {
        json!({
            "risk_score": 8,
            "category": "Disruption",
            "affected_industries": ["Retail", "Automotive"],
            "geographic_ripple": "US West Coast, Transpacific lanes",
            "timeline": {
                "short_term": "Vessel queues build",
                "medium_term": "Rates spike",
                "long_term": "Shift to East Coast ports"
            },
            "reasoning": "Strike halts container handling.",
            "actionable_intelligence": "Watch union vote outcome.",
            "construction_related": false
        })
    }

    #[test]
    fn accepts_complete_analysis() {
        let v = validate_analysis(&good_analysis()).unwrap();
        assert_eq!(v.value.risk_score, 8);
        assert_eq!(v.value.category, Category::Disruption);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn missing_long_term_is_rejected_not_defaulted() {
        let mut raw = good_analysis();
        raw["timeline"].as_object_mut().unwrap().remove("long_term");
        let err = validate_analysis(&raw).unwrap_err();
        assert!(err.has_issue_at("timeline.long_term"));
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn risk_score_is_not_clamped() {
        for bad in [json!(0), json!(11), json!(-3), json!(7.5), json!(7.0), json!("7")] {
            let mut raw = good_analysis();
            raw["risk_score"] = bad.clone();
            let err = validate_analysis(&raw).unwrap_err();
            assert!(err.has_issue_at("risk_score"), "accepted {bad}");
        }
    }

    #[test]
    fn unknown_category_rejected_and_case_canonicalised() {
        let mut raw = good_analysis();
        raw["category"] = json!("Weather");
        let err = validate_analysis(&raw).unwrap_err();
        assert!(matches!(
            err.issues[0].kind,
            IssueKind::UnknownCategory { .. }
        ));

        raw["category"] = json!(" shortage ");
        let ok = validate_analysis(&raw).unwrap();
        assert_eq!(ok.value.category, Category::Shortage);
    }

    #[test]
    fn every_issue_is_reported() {
        let raw = json!({ "risk_score": "high", "timeline": {} });
        let err = validate_analysis(&raw).unwrap_err();
        for path in [
            "risk_score",
            "category",
            "affected_industries",
            "geographic_ripple",
            "timeline.short_term",
            "timeline.medium_term",
            "timeline.long_term",
            "reasoning",
            "actionable_intelligence",
            "construction_related",
        ] {
            assert!(err.has_issue_at(path), "no issue for {path}: {err}");
        }
    }

    #[test]
    fn repairs_leave_warnings() {
        let mut raw = good_analysis();
        raw["geographic_ripple"] = json!(["Japan", "Korea"]);
        let obj = raw.as_object_mut().unwrap();
        obj.remove("construction_related");
        obj.insert("is_construction_related".into(), json!(true));
        obj.insert("reasoning".into(), json!("  "));

        let v = validate_analysis(&raw).unwrap();
        assert_eq!(v.value.geographic_ripple, "Japan, Korea");
        assert!(v.value.construction_related);
        assert_eq!(v.value.reasoning, "");
        assert_eq!(v.warnings.len(), 3);
    }

    #[test]
    fn null_text_is_rejected() {
        let mut raw = good_analysis();
        raw["reasoning"] = Value::Null;
        let err = validate_analysis(&raw).unwrap_err();
        assert_eq!(err.issues[0].kind, IssueKind::Null);
    }

    #[test]
    fn brief_needs_exactly_three_risks() {
        for n in [0usize, 2, 4] {
            let risks: Vec<String> = (0..n).map(|i| format!("risk {i}")).collect();
            let raw = json!({ "summary": "s", "top_risks": risks });
            assert!(validate_brief(&raw).is_err(), "accepted {n} risks");
        }
        let raw = json!({ "summary": "s", "top_risks": ["a", "b", "c"] });
        assert_eq!(validate_brief(&raw).unwrap().value.top_risks.len(), 3);
    }

    #[test]
    fn dispatch_by_shape() {
        let v = validate(&json!({ "answer": "Ports." }), Shape::Answer).unwrap();
        assert_eq!(v.value, TypedValue::Answer("Ports.".into()));
        assert!(validate(&json!([]), Shape::Brief).is_err());
    }

    #[test]
    fn code_fences_are_stripped() {
        let v = extract_json("```json\n{\"answer\": \"x\"}\n```").unwrap();
        assert_eq!(v["answer"], "x");
        assert!(extract_json("The answer is x").is_err());
    }
}
