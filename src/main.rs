//! VantagePoint signals service: binary entrypoint.
//! Resolves configuration once, then serves the JSON API plus `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vantagepoint::api::{self, AppState};
use vantagepoint::bootstrap::VantageRuntime;
use vantagepoint::metrics::Metrics;

/// `RUST_LOG` wins; `LOG_FORMAT=json` switches to JSON lines.
/// The runtime may already have installed a subscriber, in which case this is a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vantagepoint=info,ingest=info,analyze=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let runtime = VantageRuntime::load()?;
    let metrics = Metrics::init(runtime.newsapi_configured(), runtime.client.is_configured())?;

    let router = api::router(AppState::from_runtime(&runtime)).merge(metrics.router());
    Ok(router.into())
}
