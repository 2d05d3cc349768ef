// src/analyze/mod.rs
//! Structured analysis of signals: prompts, grounding context, the response contract and the
//! client that ties them to a model provider.

pub mod ai_adapter;
pub mod context;
pub mod prompts;
pub mod schema;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{AnalysisClient, AnalysisError, QAExchange};
pub use crate::analyze::context::{build_context, ContextBudget, ContextPayload};
pub use crate::analyze::schema::{
    AnalysisResult, Category, ExecutiveBrief, Shape, Validated, ValidationError,
};
