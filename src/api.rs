use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::analyze::schema::validate_analysis;
use crate::analyze::{AnalysisClient, AnalysisError, AnalysisResult, ExecutiveBrief, QAExchange, Validated};
use crate::bootstrap::VantageRuntime;
use crate::demo::demo_signals;
use crate::ingest::types::Signal;
use crate::ingest::{Acquisition, FallbackChain, SourceUsed};
use crate::triage::{filter_signals, health_index, TriageFilter};

/// Shared handles only; nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<FallbackChain>,
    pub client: Arc<AnalysisClient>,
    pub keywords: Arc<Vec<String>>,
    pub window: Duration,
    pub demo_fallback: bool,
}

impl AppState {
    pub fn from_runtime(rt: &VantageRuntime) -> Self {
        Self {
            chain: rt.chain.clone(),
            client: rt.client.clone(),
            keywords: Arc::new(rt.cfg.sources.keywords.clone()),
            window: rt.cfg.sources.window(),
            demo_fallback: rt.cfg.sources.demo_fallback,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/signals", get(signals))
        .route("/analyze", post(analyze))
        .route("/brief", post(brief))
        .route("/ask", post(ask))
        .route("/health-index", post(health))
        .route("/filter", post(filter))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Analysis failure as `{error, reason, issues?}` with a status chosen by reason.
pub struct ApiError(pub AnalysisError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AnalysisError::Transport(_) | AnalysisError::Malformed(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::SchemaInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.0.to_string(),
            "reason": self.0.reason(),
        });
        if let AnalysisError::SchemaInvalid(v) = &self.0 {
            body["issues"] = json!(v.issues);
        }
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    Live,
    Demo,
}

#[derive(Deserialize)]
struct SignalsQuery {
    #[serde(default)]
    mode: Mode,
    /// Comma-separated; the configured keywords when absent.
    keywords: Option<String>,
}

async fn signals(State(state): State<AppState>, Query(q): Query<SignalsQuery>) -> Json<Acquisition> {
    if let Mode::Demo = q.mode {
        return Json(Acquisition {
            signals: demo_signals(state.chain.normalizer(), Utc::now()),
            source_used: SourceUsed::Demo,
            attempts: Vec::new(),
        });
    }
    let keywords: Vec<String> = q
        .keywords
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|ks| !ks.is_empty())
        .unwrap_or_else(|| state.keywords.as_ref().clone());
    let acq = if state.demo_fallback {
        state.chain.acquire_or_demo(&keywords, state.window).await
    } else {
        state.chain.acquire_signals(&keywords, state.window).await
    };
    Json(acq)
}

#[derive(Deserialize)]
struct AnalyzeReq {
    signal: Signal,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<Validated<AnalysisResult>>, ApiError> {
    Ok(Json(state.client.analyze_event(&body.signal).await?))
}

#[derive(Deserialize)]
struct BriefReq {
    signals: Vec<Signal>,
}

async fn brief(
    State(state): State<AppState>,
    Json(body): Json<BriefReq>,
) -> Result<Json<Validated<ExecutiveBrief>>, ApiError> {
    Ok(Json(state.client.synthesize_brief(&body.signals).await?))
}

#[derive(Deserialize)]
struct AskReq {
    question: String,
    #[serde(default)]
    signals: Vec<Signal>,
}

async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskReq>,
) -> Result<Json<QAExchange>, ApiError> {
    Ok(Json(state.client.ask(&body.question, &body.signals).await?))
}

/// Caller-supplied analyses, keyed by signal id, held to the same contract as model output.
fn checked_analyses(
    raw: HashMap<String, Value>,
) -> Result<HashMap<String, AnalysisResult>, ApiError> {
    raw.into_iter()
        .map(|(id, v)| {
            validate_analysis(&v)
                .map(|ok| (id, ok.value))
                .map_err(|e| ApiError(AnalysisError::SchemaInvalid(e)))
        })
        .collect()
}

#[derive(Deserialize)]
struct HealthReq {
    signals: Vec<Signal>,
    /// Keyed by signal id.
    #[serde(default)]
    analyses: HashMap<String, Value>,
}

#[derive(Serialize)]
struct HealthOut {
    health_index: u8,
}

async fn health(Json(body): Json<HealthReq>) -> Result<Json<HealthOut>, ApiError> {
    let analyses = checked_analyses(body.analyses)?;
    Ok(Json(HealthOut {
        health_index: health_index(&body.signals, &analyses),
    }))
}

#[derive(Deserialize)]
struct FilterReq {
    signals: Vec<Signal>,
    #[serde(default)]
    analyses: HashMap<String, Value>,
    #[serde(default)]
    filter: TriageFilter,
}

async fn filter(Json(body): Json<FilterReq>) -> Result<Json<Vec<Signal>>, ApiError> {
    let analyses = checked_analyses(body.analyses)?;
    let kept = filter_signals(&body.signals, &analyses, &body.filter)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(kept))
}
