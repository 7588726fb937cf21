//! Elo rating engine
//!
//! Wraps the `elo` function from the skillratings crate. The expected score
//! for X against Y is `1 / (1 + 10^((Ry - Rx) / 400))`, and each side moves by
//! `K * (outcome - expected)`. Ratings are stored as integers: the new value
//! is rounded to the nearest integer with ties rounded away from zero
//! (`f64::round`).

use crate::error::{ArenaError, Result};
use crate::rating::calculator::{RatingEngine, RatingUpdate};
use crate::types::{Rating, BASELINE_RATING};
use serde::{Deserialize, Serialize};
use skillratings::elo::{elo, expected_score, EloConfig, EloRating};
use skillratings::Outcomes;

/// Default K-factor
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Configuration for the Elo engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloEngineConfig {
    /// Maximum rating change per vote
    pub k_factor: f64,
    /// Rating for entities that have never been voted on
    pub baseline_rating: Rating,
}

impl Default for EloEngineConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            baseline_rating: BASELINE_RATING,
        }
    }
}

impl EloEngineConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(ArenaError::ConfigurationError {
                message: "K-factor must be a positive finite number".to_string(),
            });
        }

        if self.baseline_rating < 0 {
            return Err(ArenaError::ConfigurationError {
                message: "Baseline rating must be non-negative".to_string(),
            });
        }

        Ok(())
    }
}

/// Elo rating engine
#[derive(Debug, Clone)]
pub struct EloRatingEngine {
    config: EloEngineConfig,
}

impl EloRatingEngine {
    /// Create a new Elo engine
    pub fn new(config: EloEngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Expected score of `rating` against `opponent`
    pub fn expected(&self, rating: Rating, opponent: Rating) -> f64 {
        let (expected, _) = expected_score(&to_elo(rating), &to_elo(opponent));
        expected
    }

    fn skill_config(&self) -> EloConfig {
        EloConfig {
            k: self.config.k_factor,
        }
    }
}

impl Default for EloRatingEngine {
    fn default() -> Self {
        Self {
            config: EloEngineConfig::default(),
        }
    }
}

impl RatingEngine for EloRatingEngine {
    fn compute_update(&self, winner_rating: Rating, loser_rating: Rating) -> RatingUpdate {
        let winner = to_elo(winner_rating);
        let loser = to_elo(loser_rating);

        let (winner_expected, _) = expected_score(&winner, &loser);
        let (new_winner, new_loser) = elo(&winner, &loser, &Outcomes::WIN, &self.skill_config());

        RatingUpdate {
            winner_rating: new_winner.rating.round() as Rating,
            loser_rating: new_loser.rating.round() as Rating,
            winner_delta: new_winner.rating - winner.rating,
            loser_delta: new_loser.rating - loser.rating,
            winner_expected,
        }
    }

    fn baseline_rating(&self) -> Rating {
        self.config.baseline_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "elo",
            "k_factor": self.config.k_factor,
            "baseline_rating": self.config.baseline_rating,
        })
    }
}

fn to_elo(rating: Rating) -> EloRating {
    EloRating {
        rating: rating as f64,
    }
}
