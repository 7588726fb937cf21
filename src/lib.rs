//! Showdown - pairwise fan-voting service
//!
//! Visitors are shown two entities from the same category and pick one. Each
//! vote is recorded in an append-only ledger and moves both Elo ratings,
//! which drive per-category leaderboards.

pub mod arena;
pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod limiter;
pub mod metrics;
pub mod pairing;
pub mod rating;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use arena::{Arena, ArenaBuilder, ArenaStats};
pub use ledger::VoteLedger;
pub use limiter::RateLimiter;
pub use pairing::MatchSampler;
pub use rating::{EloRatingEngine, RatingEngine};
pub use store::{EntityStore, InMemoryEntityStore, InMemoryVoteStore, VoteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
