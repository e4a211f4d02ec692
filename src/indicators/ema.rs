// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is seeded with the SMA of the first `period` values, so
// output index 0 lines up with input index `period - 1`.  MACD builds both its
// oscillator and its signal line on top of this.
// =============================================================================

/// Compute the EMA series of `values` for the look-back `period`.
///
/// Returns an empty `Vec` when `period` is zero or the input is shorter than
/// `period`.  A non-finite intermediate value truncates the series at that
/// point.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(seed);

    let mut prev = seed;
    for &value in &values[period..] {
        let ema = value * multiplier + prev * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        series.push(ema);
        prev = ema;
    }

    series
}
