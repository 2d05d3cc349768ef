// src/config/mod.rs
//! Startup configuration: `config/vantage.toml` (or `$VANTAGE_CONFIG_PATH`) plus credentials
//! from the environment. Resolved once; components receive plain values.

pub mod ai;
pub mod sources;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub use ai::AiConfig;
pub use sources::SourcesConfig;

const ENV_PATH: &str = "VANTAGE_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/vantage.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    /// Parse a TOML document and resolve `"ENV"` credentials.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing vantage config")?;
        cfg.resolve_credentials();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// 1) $VANTAGE_CONFIG_PATH, which must exist
    /// 2) config/vantage.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        let mut cfg = AppConfig::default();
        cfg.resolve_credentials();
        Ok(cfg)
    }

    fn resolve_credentials(&mut self) {
        self.sources.resolve_credentials();
        self.ai.resolve_credentials();
    }
}

/// Request timeout from config seconds; 0 would fail every request, so it reads as 1.
pub(crate) fn timeout_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// `"ENV"` (any case) reads `var`; blank values and unset vars become `None`.
pub(crate) fn resolve_key(raw: Option<String>, var: &str) -> Option<String> {
    let raw = raw?;
    let value = if raw.trim().eq_ignore_ascii_case("env") {
        std::env::var(var).ok()?
    } else {
        raw
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
