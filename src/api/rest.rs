// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are public.  A scan request runs the
// whole basket through the throttled provider before answering, so expect
// roughly `symbols x rate window` of latency.
//
// CORS is configured permissively; tighten `allow_origin` in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::ApiError;
use crate::app_state::{AppState, LastScanSummary};
use crate::provider::ThrottleSnapshot;
use crate::scanner::ScanReport;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scan", get(scan))
        .route("/api/v1/scan/report", get(scan_report))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
    symbols: Vec<String>,
    scans_started: u64,
    last_scan: Option<LastScanSummary>,
    throttle: ThrottleSnapshot,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        symbols: state.config.symbols.clone(),
        scans_started: state
            .scans_started
            .load(std::sync::atomic::Ordering::SeqCst),
        last_scan: state.last_scan.read().clone(),
        throttle: state.scanner.throttle().snapshot(),
    };
    Json(resp)
}

// =============================================================================
// Scan
// =============================================================================

/// Aborts the scan task when the request future is dropped (client gone).
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one scan on its own task so a panic inside it becomes a 500 instead of
/// a dropped connection.
async fn run_scan(state: &Arc<AppState>) -> Result<ScanReport, ApiError> {
    let seq = state.begin_scan();
    info!(seq, symbols = state.config.symbols.len(), "scan requested");

    let scanner = state.scanner.clone();
    let symbols = state.config.symbols.clone();
    let timeout = state.config.scan_timeout();

    let handle = tokio::spawn(async move {
        let deadline = timeout.map(|t| Instant::now() + t);
        scanner.scan_until(&symbols, deadline).await
    });
    let _abort = AbortOnDrop(handle.abort_handle());

    let report = handle
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("scan task failed: {e}")))?;

    state.record_scan(&report);
    Ok(report)
}

/// Ranked list of scores, highest probability first.
async fn scan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = run_scan(&state).await?;
    Ok(Json(report.results))
}

/// Ranked list plus skipped symbols and completion flag.
async fn scan_report(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = run_scan(&state).await?;
    Ok(Json(report))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CallBudget, DataProvider, Throttle};
    use crate::runtime_config::ScannerConfig;
    use crate::scanner::tests::{quiet, rally, selloff, FakeProvider};
    use crate::scanner::SymbolScanner;
    use crate::types::PriceSeries;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_with(provider: Arc<dyn DataProvider>, symbols: &[&str]) -> Router {
        let config = ScannerConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            ..ScannerConfig::default()
        };
        let throttle = Arc::new(Throttle::new(CallBudget::fixed_delay(Duration::from_secs(15))));
        let scanner = Arc::new(SymbolScanner::new(provider, throttle));
        router(Arc::new(AppState::new(config, scanner)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn scan_returns_ranked_array() {
        let provider = Arc::new(
            FakeProvider::default()
                .with(quiet("FLAT"))
                .with(rally("UP"))
                .with(selloff("DOWN")),
        );
        let app = app_with(provider, &["FLAT", "GONE", "UP", "DOWN"]);

        let (status, body) = get_json(app, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::OK);

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i["symbol"] != "GONE"));

        let probs: Vec<u64> = items.iter().map(|i| i["probability"].as_u64().unwrap()).collect();
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));

        let first = &items[0];
        for key in ["symbol", "price", "change", "volatility", "probability", "direction"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        for key in ["roc", "macd", "atr", "rsi", "volumeRatio"] {
            assert!(first["indicators"].get(key).is_some(), "missing indicators.{key}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn report_lists_skipped_symbols() {
        let provider = Arc::new(FakeProvider::default().with(rally("UP")));
        let app = app_with(provider, &["UP", "GONE"]);

        let (status, body) = get_json(app, "/api/v1/scan/report").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complete"], true);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["skipped"][0]["symbol"], "GONE");
    }

    #[tokio::test(start_paused = true)]
    async fn health_reports_last_scan() {
        let provider = Arc::new(FakeProvider::default().with(rally("UP")));
        let app = app_with(provider, &["UP"]);

        let (_, before) = get_json(app.clone(), "/api/v1/health").await;
        assert_eq!(before["status"], "ok");
        assert!(before["last_scan"].is_null());

        get_json(app.clone(), "/api/v1/scan").await;

        let (_, after) = get_json(app, "/api/v1/health").await;
        assert_eq!(after["scans_started"], 1);
        assert_eq!(after["last_scan"]["scored"], 1);
        assert_eq!(after["throttle"]["total_calls"], 1);
    }

    struct PanickingProvider;

    #[async_trait]
    impl DataProvider for PanickingProvider {
        async fn fetch_series(&self, _symbol: &str) -> anyhow::Result<PriceSeries> {
            panic!("provider blew up");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn internal_failure_maps_to_500() {
        let app = app_with(Arc::new(PanickingProvider), &["UP"]);
        let (status, body) = get_json(app, "/api/v1/scan").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 500);
        assert!(body["error"].as_str().unwrap().contains("scan task failed"));
    }
}
