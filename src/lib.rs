// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod demo;
pub mod geo;
pub mod metrics;
pub mod triage;

// Signal acquisition: adapters, fallback chain, normalizer
pub mod ingest;

// Structured analysis: schema, context, prompts, client
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{AnalysisClient, AnalysisError};
pub use crate::api::router;
pub use crate::ingest::types::{Signal, SourceKind};
pub use crate::ingest::{Acquisition, FallbackChain, SourceUsed};
