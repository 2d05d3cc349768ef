//! Analysis client: provider abstraction + the three structured analysis modes.
//!
//! Every call is one request with structured output (`application/json` plus a response schema),
//! then JSON extraction, then strict validation. Nothing is cached and nothing is retried.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analyze::context::{build_context, ContextBudget, ContextPayload};
use crate::analyze::prompts;
use crate::analyze::schema::{
    extract_json, response_schema, validate_analysis, validate_answer, validate_brief,
    AnalysisResult, ExecutiveBrief, Shape, Validated, ValidationError,
};
use crate::config::AiConfig;
use crate::ingest::providers::{CONNECT_TIMEOUT, USER_AGENT};
use crate::ingest::types::Signal;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// HTTP failure, non-2xx status or timeout.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Envelope or model text is not the JSON we asked for.
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error(transparent)]
    SchemaInvalid(#[from] ValidationError),
    #[error("analysis is not configured")]
    Unconfigured,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl AnalysisError {
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Malformed(_) => "malformed",
            AnalysisError::SchemaInvalid(_) => "schema_invalid",
            AnalysisError::Unconfigured => "unconfigured",
            AnalysisError::InvalidInput(_) => "invalid_input",
        }
    }
}

/// A question, its answer, and exactly the signal ids the answer was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QAExchange {
    pub question: String,
    pub answer: String,
    pub context_signal_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What a provider is asked to produce: the prompt and the JSON schema the output must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: Value,
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: one remote call returning the model's raw text.
/// Separated so the same client runs against Gemini in production and a mock in tests.
pub trait Provider: Send + Sync + 'static {
    fn generate<'a>(
        &'a self,
        req: &'a StructuredRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// Gemini `generateContent` with structured output.
pub struct GeminiProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, model: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: format!(
                "{}/models/{}:generateContent",
                endpoint.trim_end_matches('/'),
                model
            ),
            api_key,
        })
    }

    pub fn request_body(req: &StructuredRequest) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": req.prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": req.schema,
            },
        })
    }

    /// Model text out of the `generateContent` envelope.
    pub fn extract_text(envelope: &Value) -> Result<String, AnalysisError> {
        if let Some(reason) = envelope
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(AnalysisError::Malformed(format!("prompt blocked: {reason}")));
        }
        envelope
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::Malformed("no candidate text in response".into()))
    }
}

impl Provider for GeminiProvider {
    fn generate<'a>(
        &'a self,
        req: &'a StructuredRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self
                .http
                .post(&self.url)
                .header("x-goog-api-key", &self.api_key)
                .json(&Self::request_body(req))
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        AnalysisError::Transport("timed out".into())
                    } else {
                        AnalysisError::Transport(e.to_string())
                    }
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(AnalysisError::Transport(format!("endpoint returned {status}")));
            }
            let envelope: Value = resp
                .json()
                .await
                .map_err(|e| AnalysisError::Malformed(format!("envelope: {e}")))?;
            Self::extract_text(&envelope)
        })
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Used when analysis is switched off or no credential was resolved.
pub struct DisabledProvider;

impl Provider for DisabledProvider {
    fn generate<'a>(
        &'a self,
        _req: &'a StructuredRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async { Err(AnalysisError::Unconfigured) })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted reply for [`MockProvider`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    TransportFailure(String),
}

/// Deterministic provider for tests and local runs. Scripted replies are served in order,
/// then `fixed` forever. Every request is recorded.
pub struct MockProvider {
    fixed: MockReply,
    script: Mutex<VecDeque<MockReply>>,
    seen: Mutex<Vec<StructuredRequest>>,
}

impl MockProvider {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::scripted(Vec::new(), MockReply::Text(text.into()))
    }

    pub fn scripted(script: Vec<MockReply>, fixed: MockReply) -> Self {
        Self {
            fixed,
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Provider for MockProvider {
    fn generate<'a>(
        &'a self,
        req: &'a StructuredRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        self.seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(req.clone());
        let reply = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fixed.clone());
        Box::pin(async move {
            match reply {
                MockReply::Text(t) => Ok(t),
                MockReply::TransportFailure(msg) => Err(AnalysisError::Transport(msg)),
            }
        })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Client
// ------------------------------------------------------------

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "analysis_requests_total",
            "Analysis calls by mode and outcome reason."
        );
        describe_histogram!(
            "analysis_latency_ms",
            "Analysis call latency in milliseconds, provider round trip included."
        );
    });
}

#[derive(Clone)]
pub struct AnalysisClient {
    provider: Arc<dyn Provider>,
    budget: ContextBudget,
}

impl AnalysisClient {
    pub fn new(provider: Arc<dyn Provider>, budget: ContextBudget) -> Self {
        Self { provider, budget }
    }

    /// Gemini when enabled with a resolved key, otherwise every call answers `Unconfigured`.
    pub fn from_config(cfg: &AiConfig) -> anyhow::Result<Self> {
        let budget = ContextBudget::new(cfg.context_max_signals);
        let provider: Arc<dyn Provider> = match (&cfg.api_key, cfg.enabled) {
            (Some(key), true) => Arc::new(GeminiProvider::new(
                &cfg.endpoint,
                &cfg.model,
                key.clone(),
                cfg.timeout(),
            )?),
            _ => Arc::new(DisabledProvider),
        };
        Ok(Self::new(provider, budget))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_configured(&self) -> bool {
        self.provider.name() != "disabled"
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    pub async fn analyze_event(
        &self,
        signal: &Signal,
    ) -> Result<Validated<AnalysisResult>, AnalysisError> {
        let prompt = prompts::analyze_event(signal);
        let res = self
            .structured("analyze", prompt, Shape::Analysis, |v| Ok(validate_analysis(v)?))
            .await;
        if let Ok(v) = &res {
            tracing::info!(target: "analyze", signal = %signal.id, risk = v.value.risk_score, category = %v.value.category, "event analyzed");
        }
        res
    }

    pub async fn synthesize_brief(
        &self,
        signals: &[Signal],
    ) -> Result<Validated<ExecutiveBrief>, AnalysisError> {
        if signals.is_empty() {
            return self.reject("brief", "no signals to summarize");
        }
        let ctx = build_context(signals, self.budget);
        let prompt = prompts::executive_brief(&ctx.rendered);
        let mut brief = self
            .structured("brief", prompt, Shape::Brief, |v| Ok(validate_brief(v)?))
            .await?;
        brief.warnings.extend(self.truncation_warning("brief", &ctx));
        Ok(brief)
    }

    pub async fn ask(
        &self,
        question: &str,
        visible_signals: &[Signal],
    ) -> Result<QAExchange, AnalysisError> {
        let question = question.trim();
        if question.is_empty() {
            return self.reject("ask", "question is blank");
        }
        let ctx = build_context(visible_signals, self.budget);
        let prompt = prompts::ask(&ctx.rendered, question);
        let mut answer = self
            .structured("ask", prompt, Shape::Answer, |v| Ok(validate_answer(v)?))
            .await?;
        answer.warnings.extend(self.truncation_warning("ask", &ctx));
        Ok(QAExchange {
            question: question.to_string(),
            answer: answer.value,
            context_signal_ids: ctx.signal_ids,
            warnings: answer.warnings,
        })
    }

    fn truncation_warning(&self, mode: &'static str, ctx: &ContextPayload) -> Option<String> {
        let w = ctx.truncation_warning()?;
        tracing::info!(target: "analyze", mode, omitted = ctx.omitted, max = self.budget.max_signals, "context truncated");
        Some(w)
    }

    fn reject<T>(&self, mode: &'static str, why: &'static str) -> Result<T, AnalysisError> {
        ensure_metrics_described();
        let err = AnalysisError::InvalidInput(why);
        counter!("analysis_requests_total", "mode" => mode, "outcome" => err.reason()).increment(1);
        tracing::debug!(target: "analyze", mode, "rejected: {why}");
        Err(err)
    }

    async fn structured<T>(
        &self,
        mode: &'static str,
        prompt: String,
        shape: Shape,
        check: impl FnOnce(&Value) -> Result<T, AnalysisError>,
    ) -> Result<T, AnalysisError> {
        ensure_metrics_described();
        let t0 = Instant::now();
        let req = StructuredRequest {
            prompt,
            schema: response_schema(shape),
        };

        let out = match self.provider.generate(&req).await {
            Ok(text) => match extract_json(&text) {
                Ok(value) => check(&value),
                Err(e) => Err(AnalysisError::Malformed(format!("model text is not JSON: {e}"))),
            },
            Err(e) => Err(e),
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("analysis_latency_ms", "mode" => mode).record(ms);
        let outcome = match &out {
            Ok(_) => "ok",
            Err(e) => e.reason(),
        };
        counter!("analysis_requests_total", "mode" => mode, "outcome" => outcome).increment(1);
        match &out {
            Ok(_) => tracing::debug!(target: "analyze", mode, provider = self.provider.name(), prompt_len = req.prompt.len(), ms, "ok"),
            Err(e) => tracing::warn!(target: "analyze", mode, provider = self.provider.name(), reason = e.reason(), error = %e, "analysis failed"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_body_carries_schema_and_mime() {
        let req = StructuredRequest {
            prompt: "hello".into(),
            schema: response_schema(Shape::Answer),
        };
        let body = GeminiProvider::request_body(&req);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][0],
            "answer"
        );
    }

    #[test]
    fn gemini_envelope_text_extraction() {
        let ok = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"answer\":\"x\"}" }] } }]
        });
        assert_eq!(
            GeminiProvider::extract_text(&ok).unwrap(),
            "{\"answer\":\"x\"}"
        );

        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            GeminiProvider::extract_text(&blocked),
            Err(AnalysisError::Malformed(_))
        ));
        assert!(matches!(
            GeminiProvider::extract_text(&json!({ "candidates": [] })),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn url_is_built_from_endpoint_and_model() {
        let p = GeminiProvider::new(
            "https://example.test/v1beta/",
            "gemini-2.0-flash",
            "k".into(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            p.url,
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn config_without_key_is_disabled() {
        let cfg = AiConfig {
            api_key: None,
            ..Default::default()
        };
        let client = AnalysisClient::from_config(&cfg).unwrap();
        assert!(!client.is_configured());

        let cfg = AiConfig {
            api_key: Some("k".into()),
            enabled: false,
            ..Default::default()
        };
        assert_eq!(
            AnalysisClient::from_config(&cfg).unwrap().provider_name(),
            "disabled"
        );
    }

    #[test]
    fn reasons_are_stable() {
        assert_eq!(AnalysisError::Unconfigured.reason(), "unconfigured");
        assert_eq!(AnalysisError::InvalidInput("x").reason(), "invalid_input");
        assert_eq!(AnalysisError::Transport("x".into()).reason(), "transport");
    }
}
