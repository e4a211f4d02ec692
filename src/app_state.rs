// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across request handlers via `Arc<AppState>`.  Holds the scanner, the
// configuration it was built from, and a small summary of the most recent
// scan for the health endpoint.  Scores themselves are never retained.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::runtime_config::ScannerConfig;
use crate::scanner::{ScanReport, SymbolScanner};

/// What the health endpoint reports about the previous scan.
#[derive(Debug, Clone, Serialize)]
pub struct LastScanSummary {
    pub scan_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub scored: usize,
    pub skipped: usize,
    pub complete: bool,
}

pub struct AppState {
    pub config: ScannerConfig,
    pub scanner: Arc<SymbolScanner>,

    /// Scans started since boot.
    pub scans_started: AtomicU64,
    pub last_scan: RwLock<Option<LastScanSummary>>,

    /// Instant the service started, for uptime.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: ScannerConfig, scanner: Arc<SymbolScanner>) -> Self {
        Self {
            config,
            scanner,
            scans_started: AtomicU64::new(0),
            last_scan: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    /// Count a scan as started and return its sequence number.
    pub fn begin_scan(&self) -> u64 {
        self.scans_started.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_scan(&self, report: &ScanReport) {
        *self.last_scan.write() = Some(LastScanSummary {
            scan_id: report.scan_id,
            finished_at: report.finished_at,
            scored: report.results.len(),
            skipped: report.skipped.len(),
            complete: report.complete,
        });
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
