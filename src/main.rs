//! Binary entrypoint: boots the Axum HTTP server, wiring configuration,
//! corpus refresh, metrics, and routes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use uni_finder::api::{create_router, AppState};
use uni_finder::config::AppConfig;
use uni_finder::corpus::scheduler::spawn_refresh_scheduler;
use uni_finder::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,corpus=info,search=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::resolve();
    tracing::info!(
        data_path = %cfg.corpus.data_path,
        ttl_secs = cfg.corpus.refresh_ttl_secs,
        scorer = %cfg.scorer,
        "starting uni-finder"
    );

    // The recorder must be installed before any counter is touched.
    let metrics = Metrics::init(cfg.corpus.refresh_ttl_secs);

    let bind_addr = cfg.bind_addr.clone();
    let refresh_secs = cfg.corpus.refresh_ttl_secs;
    let state = AppState::new(cfg);

    // Warm-up load plus periodic refresh; queries keep serving the previous
    // snapshot while a reload is in flight.
    spawn_refresh_scheduler(state.corpus.clone(), refresh_secs);
    // Evict idle rate-limiter buckets so the per-user map stays bounded.
    uni_finder::ratelimit::spawn_prune_task(
        state.limiter.clone(),
        state.cfg.rate_limit_window_secs,
    );

    let router = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
