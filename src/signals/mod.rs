// =============================================================================
// Signals Module
// =============================================================================
//
// Maps an indicator snapshot to a bounded move probability and a direction.

pub mod weighted_score;

pub use weighted_score::{MoveScorer, ScoreResult, ScoreWeights};
