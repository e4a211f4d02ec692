// =============================================================================
// Symbol Scanner — fetch, score and rank a basket of symbols
// =============================================================================
//
// Symbols are processed strictly one at a time in configured order.  Every
// provider call goes through the shared `Throttle`, which is the only thing
// pacing the scan; the scanner itself never sleeps.
//
// A symbol that cannot be fetched, has too little history, or produces a
// malformed snapshot is skipped and recorded in the report.  Nothing is
// retried within a pass.  When a deadline is given and reached, the scan
// returns whatever it has ranked so far.
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::indicators::{IndicatorParams, IndicatorSnapshot};
use crate::provider::{DataProvider, Throttle};
use crate::signals::{MoveScorer, ScoreResult};
use crate::types::PriceSeries;

/// Fewest bars a series needs to be scored (last close + previous close).
pub const DEFAULT_MIN_BARS: usize = 2;

/// A symbol left out of the ranking, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Ranked by probability, highest first.
    pub results: Vec<ScoreResult>,
    pub skipped: Vec<SkippedSymbol>,
    /// False when the deadline cut the scan short.
    pub complete: bool,
}

pub struct SymbolScanner {
    provider: Arc<dyn DataProvider>,
    throttle: Arc<Throttle>,
    scorer: MoveScorer,
    params: IndicatorParams,
    min_bars: usize,
}

impl SymbolScanner {
    pub fn new(provider: Arc<dyn DataProvider>, throttle: Arc<Throttle>) -> Self {
        Self {
            provider,
            throttle,
            scorer: MoveScorer::default(),
            params: IndicatorParams::default(),
            min_bars: DEFAULT_MIN_BARS,
        }
    }

    pub fn with_scorer(mut self, scorer: MoveScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars.max(1);
        self
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// Scan every symbol to completion.
    #[cfg(test)]
    pub async fn scan(&self, symbols: &[String]) -> ScanReport {
        self.scan_until(symbols, None).await
    }

    /// Scan `symbols`, giving up on the remaining ones once `deadline` passes.
    pub async fn scan_until(&self, symbols: &[String], deadline: Option<Instant>) -> ScanReport {
        let scan_id = Uuid::new_v4();
        self.run_scan(scan_id, symbols, deadline).await
    }

    #[instrument(skip(self, symbols, deadline), fields(provider = self.provider.name(), symbols = symbols.len()))]
    async fn run_scan(
        &self,
        scan_id: Uuid,
        symbols: &[String],
        deadline: Option<Instant>,
    ) -> ScanReport {
        let started_at = Utc::now();
        let mut results = Vec::with_capacity(symbols.len());
        let mut skipped = Vec::new();
        let mut complete = true;

        for (i, symbol) in symbols.iter().enumerate() {
            let fetch = self.throttle.run(|| self.provider.fetch_series(symbol));

            let fetched = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
                    Ok(fetched) => fetched,
                    Err(_) => {
                        warn!(
                            remaining = symbols.len() - i,
                            "scan deadline reached, returning partial results"
                        );
                        skipped.extend(symbols[i..].iter().map(|s| SkippedSymbol {
                            symbol: s.clone(),
                            reason: "scan deadline reached".to_string(),
                        }));
                        complete = false;
                        break;
                    }
                },
                None => fetch.await,
            };

            let series = match fetched {
                Ok(series) => series,
                Err(e) => {
                    warn!(symbol = %symbol, error = %format!("{e:#}"), "fetch failed, skipping symbol");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: format!("fetch failed: {e:#}"),
                    });
                    continue;
                }
            };

            match self.score_series(&series) {
                Ok(result) => {
                    debug!(
                        symbol = %symbol,
                        probability = result.probability,
                        direction = %result.direction,
                        "symbol scored"
                    );
                    results.push(result);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "symbol not scorable, skipping");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Stable: equal probabilities keep configured order.
        results.sort_by(|a, b| b.probability.cmp(&a.probability));

        info!(
            scored = results.len(),
            skipped = skipped.len(),
            complete,
            "scan finished"
        );

        ScanReport {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            results,
            skipped,
            complete,
        }
    }

    /// Indicator pass plus scoring for one already-fetched series.
    pub fn score_series(&self, series: &PriceSeries) -> Result<ScoreResult> {
        let symbol = series.symbol();
        if series.len() < self.min_bars {
            bail!(
                "{symbol}: only {} bars, need at least {}",
                series.len(),
                self.min_bars
            );
        }
        let snapshot = IndicatorSnapshot::compute(series, &self.params);
        self.scorer.score(symbol, &snapshot)
    }
}
