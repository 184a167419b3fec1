use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use labelserver::config::AppConfig;
use labelserver::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let state = AppState::new(cfg.results_dir.clone(), cfg.frames_root.clone())
        .with_context(|| format!("Failed to open results dir {}", cfg.results_dir.display()))?;
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.bind_addr))?;
    info!(
        addr = %cfg.bind_addr,
        results_dir = %cfg.results_dir.display(),
        frames_root = %cfg.frames_root.display(),
        "labelserver listening"
    );
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
