//! The voting arena: pairing, voting and leaderboards in one place

pub mod manager;

pub use manager::{Arena, ArenaBuilder, ArenaStats};
