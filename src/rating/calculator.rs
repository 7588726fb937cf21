//! Rating engine trait and the result of a single head-to-head update

use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// New ratings for both sides of one vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub winner_rating: Rating,
    pub loser_rating: Rating,
    /// Unrounded change applied to the winner
    pub winner_delta: f64,
    /// Unrounded change applied to the loser (always non-positive)
    pub loser_delta: f64,
    /// Probability the winner was expected to win before the vote
    pub winner_expected: f64,
}

impl RatingUpdate {
    /// Integer change actually applied to the winner
    pub fn winner_change(&self, old_rating: Rating) -> Rating {
        self.winner_rating - old_rating
    }

    /// Integer change actually applied to the loser
    pub fn loser_change(&self, old_rating: Rating) -> Rating {
        self.loser_rating - old_rating
    }

    /// Whether the lower-rated side won
    pub fn is_upset(&self) -> bool {
        self.winner_expected < 0.5
    }
}

/// Pure computation of post-vote ratings
///
/// Implementations must be deterministic: the same inputs always produce the
/// same update, and nothing outside the return value is touched.
pub trait RatingEngine: Send + Sync {
    /// Compute new ratings after `winner_rating` beat `loser_rating`
    fn compute_update(&self, winner_rating: Rating, loser_rating: Rating) -> RatingUpdate;

    /// Rating assigned to entities that have never been voted on
    fn baseline_rating(&self) -> Rating;

    /// Current configuration as JSON
    fn config(&self) -> serde_json::Value;
}
