// =============================================================================
// Move Scanner — Main Entry Point
// =============================================================================
//
// Serves a ranked move-probability scan of a fixed equity basket.  Every scan
// pulls a fresh intraday snapshot per symbol through a throttled provider
// client; nothing is cached or persisted between requests.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod indicators;
mod provider;
mod runtime_config;
mod scanner;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::{AlphaVantageClient, DataProvider, Throttle};
use crate::runtime_config::ScannerConfig;
use crate::scanner::SymbolScanner;
use crate::signals::MoveScorer;

const CONFIG_PATH: &str = "scanner_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Move Scanner starting up");

    let mut config = ScannerConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ScannerConfig::default()
    });
    config.apply_env()?;
    config.validate().context("invalid scanner configuration")?;

    if config.api_key.is_empty() {
        warn!("ALPHA_VANTAGE_API_KEY is not set; every fetch will be refused upstream");
    }

    // ── 2. Provider, throttle, scanner ───────────────────────────────────
    let provider: Arc<dyn DataProvider> = Arc::new(AlphaVantageClient::new(
        config.api_key.clone(),
        config.provider_base_url.clone(),
        config.interval.clone(),
        config.output_size.clone(),
    )?);
    let throttle = Arc::new(Throttle::new(config.call_budget()));

    let budget = throttle.budget();
    info!(
        symbols = ?config.symbols,
        interval = %config.interval,
        max_calls = budget.max_calls,
        window_ms = budget.per.as_millis() as u64,
        timeout_secs = ?config.scan_timeout_secs,
        base_cap = config.score.base_cap,
        bonus_cap = config.score.bonus_cap,
        "Configured scan basket"
    );

    let scanner = Arc::new(
        SymbolScanner::new(provider, throttle)
            .with_scorer(MoveScorer::new(config.score.clone()))
            .with_min_bars(config.min_bars),
    );

    // ── 3. Shared state & API server ─────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, scanner));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 4. Serve until Ctrl+C ────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Move Scanner shut down complete.");
    Ok(())
}
