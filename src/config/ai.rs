// src/config/ai.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{resolve_key, timeout_secs};

fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_signals() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Off means every analysis call answers "unconfigured", key or not.
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL; the model path and `:generateContent` are appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// "ENV" means: read from GEMINI_API_KEY
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on signals rendered into brief and Q&A prompts.
    #[serde(default = "default_max_signals")]
    pub context_max_signals: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: Some("ENV".into()),
            timeout_secs: default_timeout(),
            context_max_signals: default_max_signals(),
        }
    }
}

impl AiConfig {
    pub(crate) fn resolve_credentials(&mut self) {
        self.api_key = resolve_key(self.api_key.take(), "GEMINI_API_KEY");
        if self.context_max_signals == 0 {
            self.context_max_signals = default_max_signals();
        }
    }

    pub fn timeout(&self) -> Duration {
        timeout_secs(self.timeout_secs)
    }

    /// Analysis is callable only when enabled and a key was resolved.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}
