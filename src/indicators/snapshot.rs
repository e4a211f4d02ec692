// =============================================================================
// Indicator Snapshot — latest reading of every indicator for one series
// =============================================================================


use super::{atr, macd, roc, rsi, MacdValue};
use crate::types::PriceSeries;

/// Look-back settings for the indicator pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorParams {
    pub roc_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    /// Number of trailing volumes kept for the volume-ratio baseline.
    pub volume_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            roc_period: 5,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            rsi_period: 14,
            volume_window: 10,
        }
    }
}

/// Latest indicator values for a single series.
///
/// Indicators without enough history hold their default (0, or `{0,0,0}` for
/// MACD), never a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub roc: f64,
    pub macd: MacdValue,
    pub atr: f64,
    pub rsi: f64,
    pub last_close: f64,
    pub prev_close: Option<f64>,
    /// Trailing volumes, oldest first, ending with the latest bar.
    pub volume_window: Vec<f64>,
}

impl IndicatorSnapshot {
    /// Run every indicator over `series`.  An empty series yields an all-zero
    /// snapshot.
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Self {
        let closes = series.closes();
        let volumes = series.volumes();

        let window_start = volumes.len().saturating_sub(params.volume_window);

        Self {
            roc: roc::latest_roc(&closes, params.roc_period),
            macd: macd::latest_macd(
                &closes,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            ),
            atr: atr::latest_atr(series.bars(), params.atr_period),
            rsi: rsi::latest_rsi(&closes, params.rsi_period),
            last_close: series.last().map_or(0.0, |b| b.close),
            prev_close: closes.len().checked_sub(2).map(|i| closes[i]),
            volume_window: volumes[window_start..].to_vec(),
        }
    }
}
