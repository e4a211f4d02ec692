// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line  = EMA(fast) - EMA(slow)
//   Signal     = EMA(signal) of the MACD line
//   Histogram  = MACD line - Signal
//
// Both the oscillator and the signal line use exponential averages.  The first
// complete triple needs `slow + signal - 1` closes (34 for 12/26/9).
// =============================================================================


use super::ema::calculate_ema;

/// One MACD reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the full MACD series.
///
/// Output index 0 corresponds to close index `slow + signal - 2`.  Returns an
/// empty `Vec` when any period is zero, `fast > slow`, or the input is too
/// short.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdValue> {
    if fast == 0 || slow == 0 || signal == 0 || fast > slow {
        return Vec::new();
    }
    if closes.len() + 1 < slow + signal {
        return Vec::new();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    // fast_ema starts `slow - fast` closes earlier than slow_ema.
    let offset = slow - fast;
    let len = slow_ema.len().min(fast_ema.len().saturating_sub(offset));
    let line: Vec<f64> = (0..len).map(|i| fast_ema[i + offset] - slow_ema[i]).collect();

    let signal_line = calculate_ema(&line, signal);

    signal_line
        .iter()
        .enumerate()
        .map(|(j, &sig)| {
            let macd = line[j + signal - 1];
            MacdValue {
                macd,
                signal: sig,
                histogram: macd - sig,
            }
        })
        .collect()
}

/// Most recent MACD triple, or `{0, 0, 0}` when the history is too short.
pub fn latest_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdValue {
    calculate_macd(closes, fast, slow, signal)
        .last()
        .copied()
        .filter(|m| m.macd.is_finite() && m.signal.is_finite() && m.histogram.is_finite())
        .unwrap_or_default()
}
