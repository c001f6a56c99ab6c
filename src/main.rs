//! Article archive browse service: binary entrypoint.
//! Boots the Axum HTTP server over the persisted store, plus `/metrics`.

use article_archive::api::{self, AppState};
use article_archive::config::{self, ArchiveConfig};
use article_archive::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    if !config::dev_logging_enabled() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    // Shuttle may already own the global subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ArchiveConfig::from_env()?;
    let state = AppState::from_config(&cfg)?;
    let metrics = Metrics::init(state.article_count())?;

    tracing::info!(store = %cfg.store_path.display(), "browse service starting");

    let router = api::router(state).merge(metrics.router());
    Ok(router.into())
}
