// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the smoothed average of TR:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// The first bar has no previous close, so `period + 1` bars are needed.
// =============================================================================

use crate::types::PriceBar;

/// True range of every bar after the first.  A non-finite input yields a
/// NaN true range (`f64::max` alone would drop it).
pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, bar) = (&w[0], &w[1]);
            if ![bar.high, bar.low, prev.close].iter().all(|v| v.is_finite()) {
                return f64::NAN;
            }
            let hl = bar.high - bar.low;
            let hc = (bar.high - prev.close).abs();
            let lc = (bar.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Compute the most recent ATR value.
///
/// Returns `None` when `period` is zero, fewer than `period + 1` bars are
/// supplied, or any intermediate value is non-finite.
pub fn calculate_atr(bars: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let trs = true_ranges(bars);
    if trs.iter().any(|tr| !tr.is_finite()) {
        return None;
    }

    let period_f = period as f64;
    let seed = trs[..period].iter().sum::<f64>() / period_f;

    let atr = trs[period..]
        .iter()
        .fold(seed, |atr, &tr| (atr * (period_f - 1.0) + tr) / period_f);

    atr.is_finite().then_some(atr)
}

/// ATR for the scorer: 0.0 whenever [`calculate_atr`] has no value.
pub fn latest_atr(bars: &[PriceBar], period: usize) -> f64 {
    calculate_atr(bars, period).unwrap_or(0.0)
}
