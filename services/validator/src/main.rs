use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use validator::config::AppConfig;
use validator::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    // Oracles may come up after us; a failed probe is only reported.
    startup_checks(&cfg).await;

    let app_state = Arc::new(AppState::open(cfg.clone())?);
    let shutdown = app_state.shutdown.clone();
    let app = validator::app(app_state);

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(ledger = %cfg.ledger_path, "validator listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "ctrl-c handler failed");
            }
            info!("shutting down, cancelling in-flight requests");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn startup_checks(cfg: &AppConfig) {
    for (name, base) in [("spark", &cfg.spark_url), ("mlr3", &cfg.mlr3_url)] {
        match check_oracle(base).await {
            Ok(()) => info!(oracle = name, url = %base, "oracle: reachable"),
            Err(e) => warn!(oracle = name, url = %base, error = %e, "oracle: unreachable"),
        }
    }
}

async fn check_oracle(base: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(3))
        .build()
        .context("Failed to build HTTP client")?;
    // Any HTTP answer means the service is up; scoring routes only take POST.
    client
        .get(base.trim_end_matches('/'))
        .send()
        .await
        .context("Oracle request failed")?;
    Ok(())
}
