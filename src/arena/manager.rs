//! Arena: the voting core behind every transport
//!
//! Wires the entity store, sampler, ledger and limiter together and exposes
//! the three client operations: fetch a pair, cast a vote, read the rankings.

use crate::error::{ArenaError, Result};
use crate::ledger::{RecordedVote, VoteLedger};
use crate::limiter::{AdmissionDecision, LimitConfig, RateLimiter};
use crate::metrics::MetricsCollector;
use crate::pairing::{MatchSampler, SamplerConfig};
use crate::rating::{EloRatingEngine, RatingEngine};
use crate::store::{EntityStore, VoteStore};
use crate::types::{Admission, PairView, RankedEntity, Vote, VoteReceipt};
use crate::utils::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Statistics about arena operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaStats {
    /// Pairs handed out since start
    pub pairs_served: u64,
    /// Votes accepted since start
    pub votes_accepted: u64,
    /// Votes rejected since start (any reason)
    pub votes_rejected: u64,
    /// Votes rejected by the limiter since start
    pub votes_rate_limited: u64,
    /// Admission checks that failed open since start
    pub admissions_failed_open: u64,
    /// Current number of rated entities
    pub entities: usize,
    /// Current number of votes in the ledger
    pub votes_in_ledger: usize,
}

/// Builder for [`Arena`]
pub struct ArenaBuilder {
    entities: Arc<dyn EntityStore>,
    votes: Arc<dyn VoteStore>,
    engine: Arc<dyn RatingEngine>,
    sampler: Option<MatchSampler>,
    limits: LimitConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ArenaBuilder {
    pub fn new(entities: Arc<dyn EntityStore>, votes: Arc<dyn VoteStore>) -> Self {
        Self {
            entities,
            votes,
            engine: Arc::new(EloRatingEngine::default()),
            sampler: None,
            limits: LimitConfig::default(),
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    pub fn engine(mut self, engine: Arc<dyn RatingEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn sampler(mut self, sampler: MatchSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn sampler_config(self, config: &SamplerConfig) -> Self {
        self.sampler(MatchSampler::new(config))
    }

    pub fn limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Arena {
        let ledger = Arc::new(VoteLedger::with_clock(
            self.entities.clone(),
            self.votes,
            self.engine,
            self.clock,
        ));
        let limiter = RateLimiter::new(ledger.clone(), self.limits);

        Arena {
            entities: self.entities,
            ledger,
            limiter,
            sampler: self.sampler.unwrap_or_default(),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(MetricsCollector::default())),
            stats: RwLock::new(ArenaStats::default()),
        }
    }
}

/// The voting core
pub struct Arena {
    entities: Arc<dyn EntityStore>,
    ledger: Arc<VoteLedger>,
    limiter: RateLimiter,
    sampler: MatchSampler,
    metrics: Arc<MetricsCollector>,
    stats: RwLock<ArenaStats>,
}

impl Arena {
    pub fn builder(entities: Arc<dyn EntityStore>, votes: Arc<dyn VoteStore>) -> ArenaBuilder {
        ArenaBuilder::new(entities, votes)
    }

    /// Draw a pair from `category`, keeping `retain` on one side when it is
    /// part of the category
    pub async fn pair(&self, category: &str, retain: Option<&str>) -> Result<PairView> {
        let pool = self.entities.query(Some(category)).await?;

        let pair = self
            .sampler
            .next_pair(&pool, retain)
            .map_err(|e| match e {
                ArenaError::InsufficientPool { available, .. } => ArenaError::InsufficientPool {
                    category: category.to_string(),
                    available,
                },
                other => other,
            })?;

        let retained = retain.is_some_and(|id| pair.anchor_id == id);
        debug!(
            "Serving pair '{}' vs '{}' in '{}' (retained: {})",
            pair.left.id, pair.right.id, category, retained
        );

        self.metrics.record_pair_served(category, retained);
        self.bump(|stats| stats.pairs_served += 1);

        Ok(PairView {
            left: pair.left.into(),
            right: pair.right.into(),
            retained,
        })
    }

    /// Cast a vote for `winner_id` over `loser_id` on behalf of `actor_id`
    pub async fn vote(
        &self,
        winner_id: &str,
        loser_id: &str,
        actor_id: &str,
    ) -> Result<VoteReceipt> {
        let start = Instant::now();

        let result = self.admit_and_record(winner_id, loser_id, actor_id).await;

        match &result {
            Ok(recorded) => {
                let gain = recorded.update.winner_delta.round() as i64;
                self.metrics.record_vote(gain, start.elapsed());
                self.bump(|stats| stats.votes_accepted += 1);
            }
            Err(e) => {
                debug!(
                    "Vote by '{}' for '{}' over '{}' rejected: {}",
                    actor_id, winner_id, loser_id, e
                );
                self.metrics.record_vote_rejected(e.kind(), start.elapsed());
                let rate_limited = matches!(e, ArenaError::RateLimited { .. });
                self.bump(|stats| {
                    stats.votes_rejected += 1;
                    if rate_limited {
                        stats.votes_rate_limited += 1;
                    }
                });
            }
        }

        result.map(|recorded| VoteReceipt {
            vote: recorded.vote,
            winner: recorded.winner.into(),
            loser: recorded.loser.into(),
        })
    }

    async fn admit_and_record(
        &self,
        winner_id: &str,
        loser_id: &str,
        actor_id: &str,
    ) -> Result<RecordedVote> {
        match self.limiter.evaluate(actor_id).await {
            AdmissionDecision::Denied { retry_after, .. } => {
                return Err(ArenaError::RateLimited { retry_after });
            }
            AdmissionDecision::FailedOpen { .. } => {
                self.metrics.record_fail_open();
                self.bump(|stats| stats.admissions_failed_open += 1);
            }
            AdmissionDecision::Allowed { .. } | AdmissionDecision::Disabled => {}
        }

        let recorded = self.ledger.record(winner_id, loser_id, actor_id).await?;
        debug!(
            "Actor '{}' voted '{}' ({}) over '{}' ({})",
            actor_id,
            recorded.winner.id,
            recorded.winner.rating,
            recorded.loser.id,
            recorded.loser.rating
        );

        Ok(recorded)
    }

    /// Entities sorted by rating, highest first
    ///
    /// Ties keep insertion order.
    pub async fn rankings(&self, category: Option<&str>) -> Result<Vec<RankedEntity>> {
        let mut entities = self.entities.query(category).await?;
        // Stable sort: equal ratings stay in insertion order
        entities.sort_by(|a, b| b.rating.cmp(&a.rating));

        Ok(entities
            .into_iter()
            .enumerate()
            .map(|(idx, entity)| RankedEntity {
                rank: idx + 1,
                entity: entity.into(),
            })
            .collect())
    }

    /// May `actor_id` vote now?
    pub async fn admission(&self, actor_id: &str) -> Admission {
        self.limiter.check_admission(actor_id).await
    }

    /// Known categories in first-seen order
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.entities.categories().await
    }

    /// Every vote that names `entity_id`
    pub async fn history(&self, entity_id: &str) -> Result<Vec<Vote>> {
        self.ledger.history_for(entity_id).await
    }

    /// Current statistics, including store totals
    pub async fn stats(&self) -> Result<ArenaStats> {
        let mut stats = self
            .stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

        stats.entities = self.entities.len().await?;
        stats.votes_in_ledger = self.ledger.total_votes().await?;
        self.metrics.update_from_stats(&stats);

        Ok(stats)
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn limits(&self) -> &LimitConfig {
        self.limiter.config()
    }

    pub fn ledger(&self) -> Arc<VoteLedger> {
        self.ledger.clone()
    }

    fn bump(&self, update: impl FnOnce(&mut ArenaStats)) {
        match self.stats.write() {
            Ok(mut stats) => update(&mut stats),
            Err(_) => warn!("Arena stats lock poisoned, dropping update"),
        }
    }
}
