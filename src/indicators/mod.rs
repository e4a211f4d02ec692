// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the four indicators feeding the
// move score.  Each module exposes the full series plus a `latest_*` helper
// that falls back to the indicator's default when history is too short.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod snapshot;

pub use macd::MacdValue;
pub use snapshot::{IndicatorParams, IndicatorSnapshot};
