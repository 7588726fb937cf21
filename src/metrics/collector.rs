//! Metrics collection using Prometheus
//!
//! Every collector owns its own registry, so several arenas (or tests) can
//! run in one process without clashing on metric names.

use crate::arena::ArenaStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the voting service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Vote ingestion metrics
    vote_metrics: VoteMetrics,

    /// Pair sampling and leaderboard metrics
    arena_metrics: ArenaMetrics,
}

/// Vote ingestion metrics
#[derive(Clone)]
pub struct VoteMetrics {
    /// Votes recorded in the ledger
    pub votes_recorded_total: IntCounter,

    /// Votes rejected, by error kind
    pub votes_rejected_total: IntCounterVec,

    /// Admission checks that failed open because the ledger was unreadable
    pub rate_limit_fail_open_total: IntCounter,

    /// End-to-end vote handling time
    pub vote_duration_seconds: Histogram,

    /// Rating points transferred per vote
    pub rating_delta: Histogram,
}

/// Pair sampling and leaderboard metrics
#[derive(Clone)]
pub struct ArenaMetrics {
    /// Pairs served, by category
    pub pairs_served_total: IntCounterVec,

    /// Pairs that kept the previous winner
    pub streak_pairs_total: IntCounter,

    /// Number of rated entities
    pub entities: IntGauge,

    /// Number of votes in the ledger
    pub ledger_size: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let vote_metrics = VoteMetrics::new(&registry)?;
        let arena_metrics = ArenaMetrics::new(&registry)?;

        Ok(Self {
            registry,
            vote_metrics,
            arena_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get vote metrics
    pub fn votes(&self) -> &VoteMetrics {
        &self.vote_metrics
    }

    /// Get arena metrics
    pub fn arena(&self) -> &ArenaMetrics {
        &self.arena_metrics
    }

    /// Record a vote that made it into the ledger
    pub fn record_vote(&self, winner_gain: i64, duration: Duration) {
        self.vote_metrics.votes_recorded_total.inc();
        self.vote_metrics
            .vote_duration_seconds
            .observe(duration.as_secs_f64());
        self.vote_metrics.rating_delta.observe(winner_gain as f64);
    }

    /// Record a rejected vote
    pub fn record_vote_rejected(&self, kind: &str, duration: Duration) {
        self.vote_metrics
            .votes_rejected_total
            .with_label_values(&[kind])
            .inc();
        self.vote_metrics
            .vote_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record an admission check that failed open
    pub fn record_fail_open(&self) {
        self.vote_metrics.rate_limit_fail_open_total.inc();
    }

    /// Record a pair being served
    pub fn record_pair_served(&self, category: &str, retained: bool) {
        self.arena_metrics
            .pairs_served_total
            .with_label_values(&[category])
            .inc();
        if retained {
            self.arena_metrics.streak_pairs_total.inc();
        }
    }

    /// Update gauges from arena statistics
    pub fn update_from_stats(&self, stats: &ArenaStats) {
        self.arena_metrics.entities.set(stats.entities as i64);
        self.arena_metrics.ledger_size.set(stats.votes_in_ledger as i64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

impl VoteMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let votes_recorded_total = IntCounter::with_opts(Opts::new(
            "showdown_votes_recorded_total",
            "Votes recorded in the ledger",
        ))?;
        registry.register(Box::new(votes_recorded_total.clone()))?;

        let votes_rejected_total = IntCounterVec::new(
            Opts::new("showdown_votes_rejected_total", "Votes rejected by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(votes_rejected_total.clone()))?;

        let rate_limit_fail_open_total = IntCounter::with_opts(Opts::new(
            "showdown_rate_limit_fail_open_total",
            "Admission checks admitted because the ledger was unreadable",
        ))?;
        registry.register(Box::new(rate_limit_fail_open_total.clone()))?;

        let vote_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "showdown_vote_duration_seconds",
                "Time spent handling a vote submission",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(vote_duration_seconds.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new(
                "showdown_rating_delta",
                "Rating points gained by the winner of a vote",
            )
            .buckets(vec![2.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        Ok(Self {
            votes_recorded_total,
            votes_rejected_total,
            rate_limit_fail_open_total,
            vote_duration_seconds,
            rating_delta,
        })
    }
}

impl ArenaMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let pairs_served_total = IntCounterVec::new(
            Opts::new("showdown_pairs_served_total", "Pairs served by category"),
            &["category"],
        )?;
        registry.register(Box::new(pairs_served_total.clone()))?;

        let streak_pairs_total = IntCounter::with_opts(Opts::new(
            "showdown_streak_pairs_total",
            "Pairs that kept the previous winner",
        ))?;
        registry.register(Box::new(streak_pairs_total.clone()))?;

        let entities = IntGauge::with_opts(Opts::new("showdown_entities", "Rated entities"))?;
        registry.register(Box::new(entities.clone()))?;

        let ledger_size = IntGauge::with_opts(Opts::new(
            "showdown_ledger_votes",
            "Votes held in the ledger",
        ))?;
        registry.register(Box::new(ledger_size.clone()))?;

        Ok(Self {
            pairs_served_total,
            streak_pairs_total,
            entities,
            ledger_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_are_independent() {
        let first = MetricsCollector::new().unwrap();
        let second = MetricsCollector::new().unwrap();

        first.record_vote(16, Duration::from_millis(2));
        assert_eq!(first.votes().votes_recorded_total.get(), 1);
        assert_eq!(second.votes().votes_recorded_total.get(), 0);
    }

    #[test]
    fn test_rejections_by_reason() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_vote_rejected("rate_limited", Duration::from_millis(1));
        collector.record_vote_rejected("rate_limited", Duration::from_millis(1));
        collector.record_vote_rejected("invalid_vote", Duration::from_millis(1));

        let rejected = &collector.votes().votes_rejected_total;
        assert_eq!(rejected.with_label_values(&["rate_limited"]).get(), 2);
        assert_eq!(rejected.with_label_values(&["invalid_vote"]).get(), 1);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_pair_served("female", true);
        collector.record_fail_open();

        let text = collector.render().unwrap();
        assert!(text.contains("showdown_pairs_served_total"));
        assert!(text.contains("showdown_streak_pairs_total 1"));
        assert!(text.contains("showdown_rate_limit_fail_open_total 1"));
    }
}
