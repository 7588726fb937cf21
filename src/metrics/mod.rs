//! Metrics and monitoring for the voting service

pub mod collector;

pub use collector::{ArenaMetrics, MetricsCollector, VoteMetrics};
