//! Rating system integration using the Elo algorithm
//!
//! This module provides the pure rating-update computation used after every
//! vote, backed by the skillratings crate.

pub mod calculator;
pub mod elo;

// Re-export commonly used types
pub use calculator::{RatingEngine, RatingUpdate};
pub use elo::{EloEngineConfig, EloRatingEngine, DEFAULT_K_FACTOR};
