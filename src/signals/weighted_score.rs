// =============================================================================
// Weighted Move Scorer — indicator snapshot to probability + direction
// =============================================================================
//
// Four component scores, each saturated into [0, 1]:
//   volatility = ATR / (price * 1 %)
//   momentum   = (|ROC| + |MACD histogram|) / 2
//   volume     = volume ratio / 1.5
//   gap        = |price - prev close| / prev close / 0.5 %
//
// base = min(90, 40*volatility + 30*momentum + 20*volume + 10*gap)
//
// Direction comes only from the signs of ROC and the MACD histogram.  When
// both point up the probability gets a +5 bonus capped at 95.
// =============================================================================

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::types::Direction;

/// Weights, saturation points and caps of the move score.  Missing fields in
/// a config file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub volatility: f64,
    pub momentum: f64,
    pub volume: f64,
    pub gap: f64,
    /// ATR equal to this fraction of price saturates the volatility score.
    pub volatility_unit: f64,
    /// Volume ratio that saturates the volume score.
    pub volume_ratio_full: f64,
    /// Gap fraction that saturates the gap score.
    pub gap_full: f64,
    /// Cap on the weighted sum.
    pub base_cap: f64,
    /// Bonus when ROC and histogram agree on an up move.
    pub agreement_bonus: f64,
    /// Cap after the bonus.
    pub bonus_cap: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volatility: 40.0,
            momentum: 30.0,
            volume: 20.0,
            gap: 10.0,
            volatility_unit: 0.01,
            volume_ratio_full: 1.5,
            gap_full: 0.005,
            base_cap: 90.0,
            agreement_bonus: 5.0,
            bonus_cap: 95.0,
        }
    }
}

/// Unrounded component scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub volatility: f64,
    pub momentum: f64,
    pub volume: f64,
    pub gap: f64,
}

/// Indicator values shown next to a score, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedIndicators {
    pub roc: f64,
    /// MACD histogram.
    pub macd: f64,
    pub atr: f64,
    pub rsi: f64,
    pub volume_ratio: f64,
}

/// Scored record for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub price: f64,
    /// Percent change against the previous close.
    pub change: f64,
    /// ATR as a percent of price.
    pub volatility: f64,
    pub probability: u8,
    pub direction: Direction,
    pub indicators: ReportedIndicators,
}

/// Clamp into [0, 1]; NaN collapses to 0.
fn saturate(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Latest volume over the mean of the trailing window (which includes it).
/// Zero when there is no usable baseline.
pub fn volume_ratio(window: &[f64]) -> f64 {
    let Some(&last) = window.last() else {
        return 0.0;
    };
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean > 0.0 {
        last / mean
    } else {
        0.0
    }
}

/// Absolute gap between last and previous close as a fraction of the
/// previous close.
pub fn gap_fraction(last: f64, prev: Option<f64>) -> f64 {
    match prev {
        Some(prev) if prev != 0.0 => (last - prev).abs() / prev,
        _ => 0.0,
    }
}

/// Direction rule table.  Returns the direction and whether the agreement
/// bonus applies.  Branch order matters.
pub fn resolve_direction(roc: f64, histogram: f64) -> (Direction, bool) {
    if roc > 0.0 && histogram > 0.0 {
        (Direction::Buy, true)
    } else if roc < 0.0 && histogram < 0.0 {
        (Direction::Sell, false)
    } else if roc > 0.0 {
        (Direction::Buy, false)
    } else if roc < 0.0 {
        (Direction::Sell, false)
    } else {
        (Direction::Neutral, false)
    }
}

/// Turns indicator snapshots into [`ScoreResult`]s.
#[derive(Debug, Clone, Default)]
pub struct MoveScorer {
    weights: ScoreWeights,
}

impl ScoreWeights {
    /// Reject weights that could push a probability outside 0..=100.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("volatility", self.volatility),
            ("momentum", self.momentum),
            ("volume", self.volume),
            ("gap", self.gap),
            ("agreement_bonus", self.agreement_bonus),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                bail!("score weight {name} must be a non-negative number, got {value}");
            }
        }
        let units = [
            ("volatility_unit", self.volatility_unit),
            ("volume_ratio_full", self.volume_ratio_full),
            ("gap_full", self.gap_full),
        ];
        for (name, value) in units {
            if !value.is_finite() || value <= 0.0 {
                bail!("score saturation point {name} must be positive, got {value}");
            }
        }
        for (name, cap) in [("base_cap", self.base_cap), ("bonus_cap", self.bonus_cap)] {
            if !(0.0..=100.0).contains(&cap) {
                bail!("score {name} must be within 0..=100, got {cap}");
            }
        }
        Ok(())
    }
}

impl MoveScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn components(&self, snap: &IndicatorSnapshot) -> ScoreComponents {
        let w = &self.weights;
        let price = snap.last_close;
        ScoreComponents {
            volatility: saturate(snap.atr / (price * w.volatility_unit)),
            momentum: saturate((snap.roc.abs() + snap.macd.histogram.abs()) / 2.0),
            volume: saturate(volume_ratio(&snap.volume_window) / w.volume_ratio_full),
            gap: saturate(gap_fraction(price, snap.prev_close) / w.gap_full),
        }
    }

    /// Weighted sum of the components, capped at `base_cap`.
    pub fn base_probability(&self, c: &ScoreComponents) -> f64 {
        let w = &self.weights;
        let sum = c.volatility * w.volatility
            + c.momentum * w.momentum
            + c.volume * w.volume
            + c.gap * w.gap;
        sum.min(w.base_cap)
    }

    /// Score one symbol's snapshot.
    ///
    /// Fails only for a malformed snapshot (non-positive or non-finite last
    /// price); insufficient history is already absorbed by indicator defaults.
    pub fn score(&self, symbol: &str, snap: &IndicatorSnapshot) -> Result<ScoreResult> {
        let price = snap.last_close;
        if !price.is_finite() || price <= 0.0 {
            bail!("{symbol}: malformed snapshot, last price {price}");
        }

        let components = self.components(snap);
        let base = self.base_probability(&components);

        let (direction, bonus) = resolve_direction(snap.roc, snap.macd.histogram);
        let probability = if bonus {
            (base + self.weights.agreement_bonus).min(self.weights.bonus_cap)
        } else {
            base
        };

        let change = match snap.prev_close {
            Some(prev) if prev != 0.0 => (price - prev) / prev * 100.0,
            _ => 0.0,
        };

        Ok(ScoreResult {
            symbol: symbol.to_string(),
            price,
            change: round_to(change, 2),
            volatility: round_to(snap.atr / price * 100.0, 2),
            probability: probability.round().clamp(0.0, 100.0) as u8,
            direction,
            indicators: ReportedIndicators {
                roc: round_to(snap.roc, 2),
                macd: round_to(snap.macd.histogram, 2),
                atr: round_to(snap.atr, 2),
                rsi: round_to(snap.rsi, 1),
                volume_ratio: round_to(volume_ratio(&snap.volume_window), 2),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::MacdValue;

    fn snapshot(roc: f64, histogram: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            roc,
            macd: MacdValue {
                macd: histogram,
                signal: 0.0,
                histogram,
            },
            atr: 0.5,
            rsi: 55.0,
            last_close: 100.0,
            prev_close: Some(99.9),
            volume_window: vec![1000.0; 10],
        }
    }

    #[test]
    fn direction_rule_table() {
        assert_eq!(resolve_direction(0.1, 0.2), (Direction::Buy, true));
        assert_eq!(resolve_direction(-0.1, -0.2), (Direction::Sell, false));
        assert_eq!(resolve_direction(0.1, -0.2), (Direction::Buy, false));
        assert_eq!(resolve_direction(0.1, 0.0), (Direction::Buy, false));
        assert_eq!(resolve_direction(-0.1, 0.2), (Direction::Sell, false));
        assert_eq!(resolve_direction(-0.1, 0.0), (Direction::Sell, false));
        assert_eq!(resolve_direction(0.0, 0.5), (Direction::Neutral, false));
        assert_eq!(resolve_direction(0.0, -0.5), (Direction::Neutral, false));
        assert_eq!(resolve_direction(0.0, 0.0), (Direction::Neutral, false));
    }

    #[test]
    fn six_bar_example_scores_sell() {
        let snap = IndicatorSnapshot {
            roc: -0.02,
            macd: MacdValue::default(),
            atr: 0.0,
            rsi: 0.0,
            last_close: 98.0,
            prev_close: Some(103.0),
            volume_window: vec![1000.0, 1000.0, 1000.0, 1000.0, 1000.0, 3000.0],
        };
        let scorer = MoveScorer::default();
        let c = scorer.components(&snap);
        assert_eq!(c.volume, 1.0);
        assert_eq!(c.gap, 1.0);
        assert_eq!(c.volatility, 0.0);
        assert!((c.momentum - 0.01).abs() < 1e-12);

        let result = scorer.score("TEST", &snap).unwrap();
        // 0.01*30 + 20 + 10 = 30.3
        assert_eq!(result.probability, 30);
        assert_eq!(result.direction, Direction::Sell);
        assert_eq!(result.indicators.volume_ratio, 2.25);
        assert_eq!(result.indicators.roc, -0.02);
        assert_eq!(result.change, -4.85);
    }

    #[test]
    fn agreement_bonus_is_capped() {
        let mut snap = snapshot(1.0, 1.0);
        snap.atr = 10.0;
        snap.prev_close = Some(90.0);
        snap.volume_window = vec![100.0, 100.0, 900.0];
        let scorer = MoveScorer::default();
        let base = scorer.base_probability(&scorer.components(&snap));
        assert_eq!(base, 90.0);
        assert_eq!(scorer.score("X", &snap).unwrap().probability, 95);
    }

    #[test]
    fn bonus_applies_only_on_agreement() {
        let scorer = MoveScorer::default();
        let up = snapshot(0.02, 0.03);
        let base = scorer.base_probability(&scorer.components(&up));
        let scored = scorer.score("X", &up).unwrap();
        assert!(f64::from(scored.probability) >= base.round());
        assert_eq!(f64::from(scored.probability), (base + 5.0).round());

        let mixed = snapshot(0.02, -0.03);
        let base = scorer.base_probability(&scorer.components(&mixed));
        assert_eq!(f64::from(scorer.score("X", &mixed).unwrap().probability), base.round());
    }

    #[test]
    fn direction_ignores_atr_rsi_and_volume() {
        let scorer = MoveScorer::default();
        for (roc, hist) in [(0.01, 0.01), (-0.01, -0.01), (0.01, -0.01), (0.0, 0.01)] {
            let reference = scorer.score("X", &snapshot(roc, hist)).unwrap().direction;
            for atr in [0.0, 0.3, 50.0] {
                for rsi in [0.0, 30.0, 100.0] {
                    for window in [vec![], vec![1.0], vec![1.0, 1.0, 50.0]] {
                        let mut snap = snapshot(roc, hist);
                        snap.atr = atr;
                        snap.rsi = rsi;
                        snap.volume_window = window;
                        assert_eq!(scorer.score("X", &snap).unwrap().direction, reference);
                    }
                }
            }
        }
    }

    #[test]
    fn probability_stays_within_bounds() {
        let scorer = MoveScorer::default();
        for roc in [-5.0, -0.01, 0.0, 0.01, 5.0] {
            for hist in [-3.0, 0.0, 3.0] {
                for atr in [0.0, 1.0, 1e6] {
                    let mut snap = snapshot(roc, hist);
                    snap.atr = atr;
                    snap.volume_window = vec![1.0, 1.0, 1e9];
                    let p = scorer.score("X", &snap).unwrap().probability;
                    assert!(p <= 95, "probability {p}");
                }
            }
        }
    }

    #[test]
    fn caps_are_tunable() {
        let scorer = MoveScorer::new(ScoreWeights {
            base_cap: 50.0,
            bonus_cap: 52.0,
            ..ScoreWeights::default()
        });
        let mut snap = snapshot(1.0, 1.0);
        snap.atr = 10.0;
        assert_eq!(scorer.score("X", &snap).unwrap().probability, 52);
    }

    #[test]
    fn weights_deserialise_over_defaults() {
        let w: ScoreWeights =
            serde_json::from_str(r#"{ "base_cap": 70, "bonus_cap": 80 }"#).unwrap();
        assert_eq!(w.base_cap, 70.0);
        assert_eq!(w.bonus_cap, 80.0);
        assert_eq!(w.volatility, 40.0);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn weights_validation_rejects_out_of_range_caps() {
        assert!(ScoreWeights::default().validate().is_ok());
        let w = ScoreWeights {
            bonus_cap: 120.0,
            ..ScoreWeights::default()
        };
        assert!(w.validate().is_err());
        let w = ScoreWeights {
            gap_full: 0.0,
            ..ScoreWeights::default()
        };
        assert!(w.validate().is_err());
        let w = ScoreWeights {
            momentum: f64::NAN,
            ..ScoreWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn empty_volume_window_gives_zero_ratio() {
        assert_eq!(volume_ratio(&[]), 0.0);
        assert_eq!(volume_ratio(&[0.0, 0.0]), 0.0);
        assert!((volume_ratio(&[1.0, 3.0]) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn gap_without_previous_close_is_zero() {
        assert_eq!(gap_fraction(100.0, None), 0.0);
        assert_eq!(gap_fraction(100.0, Some(0.0)), 0.0);
        assert!((gap_fraction(99.0, Some(100.0)) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn presentation_rounding_does_not_feed_back() {
        // Histogram 0.004 rounds to 0.00 for display but still counts as
        // positive for direction and bonus.
        let scorer = MoveScorer::default();
        let result = scorer.score("X", &snapshot(0.001, 0.004)).unwrap();
        assert_eq!(result.indicators.macd, 0.0);
        assert_eq!(result.indicators.roc, 0.0);
        assert_eq!(result.direction, Direction::Buy);
    }

    #[test]
    fn rsi_reported_to_one_decimal() {
        let mut snap = snapshot(0.01, 0.01);
        snap.rsi = 63.4567;
        snap.atr = 1.23456;
        let r = MoveScorer::default().score("X", &snap).unwrap();
        assert_eq!(r.indicators.rsi, 63.5);
        assert_eq!(r.indicators.atr, 1.23);
        assert_eq!(r.volatility, 1.23);
    }

    #[test]
    fn scoring_is_idempotent() {
        let scorer = MoveScorer::default();
        let snap = snapshot(-0.013, 0.2);
        let a = scorer.score("X", &snap).unwrap();
        let b = scorer.score("X", &snap).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        let mut snap = snapshot(0.01, 0.01);
        snap.last_close = 0.0;
        assert!(MoveScorer::default().score("X", &snap).is_err());
        snap.last_close = f64::NAN;
        assert!(MoveScorer::default().score("X", &snap).is_err());
    }

    #[test]
    fn serialises_to_wire_shape() {
        let r = MoveScorer::default().score("AAPL", &snapshot(0.01, 0.01)).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["direction"], "buy");
        assert!(json["indicators"]["volumeRatio"].is_number());
        assert!(json["indicators"]["macd"].is_number());
        assert!(json["probability"].is_u64());
    }
}
