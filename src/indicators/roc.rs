// =============================================================================
// Rate of Change (ROC) — Momentum Indicator
// =============================================================================
//
//   ROC_i = (close_i - close_{i-n}) / close_{i-n}
//
// Reported as a fraction (0.02 == +2 %), not a percentage: the scorer adds it
// directly to the MACD histogram when building the momentum component.

/// Calculate the ROC series for `closes` over `period` bars.
///
/// One value per close starting at index `period`; empty when there are not
/// at least `period + 1` closes.
pub fn calculate_roc(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    closes
        .windows(period + 1)
        .map(|w| {
            let base = w[0];
            if base == 0.0 {
                0.0
            } else {
                (w[period] - base) / base
            }
        })
        .collect()
}

/// Most recent ROC value, or 0.0 when the history is too short.
pub fn latest_roc(closes: &[f64], period: usize) -> f64 {
    calculate_roc(closes, period)
        .last()
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
