// src/bootstrap.rs
use std::sync::Arc;

use tracing::info;

use crate::analyze::AnalysisClient;
use crate::config::AppConfig;
use crate::ingest::FallbackChain;

/// Everything resolved once at startup: config, the source chain and the analysis client.
pub struct VantageRuntime {
    pub cfg: AppConfig,
    pub chain: Arc<FallbackChain>,
    pub client: Arc<AnalysisClient>,
}

impl VantageRuntime {
    /// `$VANTAGE_CONFIG_PATH`, then `config/vantage.toml`, then defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::load_default()?)
    }

    pub fn from_config(cfg: AppConfig) -> anyhow::Result<Self> {
        let chain = FallbackChain::from_config(&cfg.sources)?;
        let client = AnalysisClient::from_config(&cfg.ai)?;
        // Safe diagnostics: presence only, never key material
        info!(
            order = ?chain.order(),
            newsapi_key = cfg.sources.newsapi.api_key.is_some(),
            rss_feeds = cfg.sources.rss.feeds.len(),
            ai_provider = client.provider_name(),
            ai_model = %cfg.ai.model,
            "runtime ready"
        );
        Ok(Self {
            cfg,
            chain: Arc::new(chain),
            client: Arc::new(client),
        })
    }

    pub fn newsapi_configured(&self) -> bool {
        self.cfg.sources.newsapi.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceKind;

    #[test]
    fn builds_fixed_order_without_credentials() {
        let mut cfg = AppConfig::default();
        cfg.sources.newsapi.api_key = None;
        cfg.ai.api_key = None;
        let rt = VantageRuntime::from_config(cfg).unwrap();
        assert_eq!(
            rt.chain.order(),
            vec![SourceKind::Gdelt, SourceKind::NewsApi, SourceKind::Rss]
        );
        assert!(!rt.newsapi_configured());
        assert!(!rt.client.is_configured());
    }
}
