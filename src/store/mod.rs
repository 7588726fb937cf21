//! Storage collaborators for entities and votes
//!
//! The durable engine lives outside this crate; these traits are the
//! read/write contract it has to satisfy. In-memory implementations back the
//! service and the tests.

pub mod entity;
pub mod schema;
pub mod vote;

// Re-export commonly used types
pub use entity::{EntityStore, InMemoryEntityStore, RatingMutation};
pub use schema::{load_roster, parse_roster, EntityRow};
pub use vote::{InMemoryVoteStore, VoteStore};
