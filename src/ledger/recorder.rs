//! Vote ledger: the only path that mutates ratings
//!
//! Recording a vote validates it, takes the lock scope for both entities,
//! computes the new ratings from a fresh read, applies them with a
//! version-checked write and then appends the vote. If the append fails the
//! rating write is reverted before the lock scope is released, so a vote in
//! the log always has its rating effect and vice versa.

use crate::error::{ArenaError, Result};
use crate::ledger::locks::EntityLocks;
use crate::rating::{RatingEngine, RatingUpdate};
use crate::store::{EntityStore, RatingMutation, VoteStore};
use crate::types::{Entity, Vote};
use crate::utils::{generate_vote_id, Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Attempts at the version-checked write before giving up
pub const MAX_WRITE_ATTEMPTS: u32 = 8;

/// A recorded vote and the entity state it produced
#[derive(Debug, Clone)]
pub struct RecordedVote {
    pub vote: Vote,
    pub winner: Entity,
    pub loser: Entity,
    pub update: RatingUpdate,
}

/// Append-only vote ledger driving entity rating updates
pub struct VoteLedger {
    entities: Arc<dyn EntityStore>,
    votes: Arc<dyn VoteStore>,
    engine: Arc<dyn RatingEngine>,
    clock: Arc<dyn Clock>,
    locks: EntityLocks,
}

impl VoteLedger {
    /// Create a ledger on the wall clock
    pub fn new(
        entities: Arc<dyn EntityStore>,
        votes: Arc<dyn VoteStore>,
        engine: Arc<dyn RatingEngine>,
    ) -> Self {
        Self::with_clock(entities, votes, engine, Arc::new(SystemClock))
    }

    /// Create a ledger with an explicit clock
    pub fn with_clock(
        entities: Arc<dyn EntityStore>,
        votes: Arc<dyn VoteStore>,
        engine: Arc<dyn RatingEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entities,
            votes,
            engine,
            clock,
            locks: EntityLocks::new(),
        }
    }

    /// Record that `winner_id` beat `loser_id` in the eyes of `actor_id`
    pub async fn record(
        &self,
        winner_id: &str,
        loser_id: &str,
        actor_id: &str,
    ) -> Result<RecordedVote> {
        if winner_id == loser_id {
            return Err(ArenaError::invalid_vote("an entity cannot beat itself"));
        }
        if actor_id.trim().is_empty() {
            return Err(ArenaError::invalid_vote("actor id must not be empty"));
        }

        // Only known entities get a lock entry
        let winner = self.resolve(winner_id).await?;
        let loser = self.resolve(loser_id).await?;
        if winner.category != loser.category {
            return Err(ArenaError::invalid_vote(format!(
                "'{}' ({}) and '{}' ({}) are in different categories",
                winner.id, winner.category, loser.id, loser.category
            )));
        }

        let _scope = self
            .locks
            .acquire(&[winner.id.as_str(), loser.id.as_str()])
            .await;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let winner = self.resolve(winner_id).await?;
            let loser = self.resolve(loser_id).await?;

            let update = self.engine.compute_update(winner.rating, loser.rating);
            let mutation = RatingMutation::from_snapshot(
                &winner,
                &loser,
                update.winner_rating,
                update.loser_rating,
            );

            match self.entities.apply_atomic(&mutation).await {
                Ok(()) => {}
                Err(ArenaError::ConcurrentModification { entity_id }) => {
                    debug!(
                        "Entity '{}' changed underneath vote (attempt {}/{}), re-reading",
                        entity_id, attempt, MAX_WRITE_ATTEMPTS
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }

            let vote = Vote {
                id: generate_vote_id(),
                winner_id: winner.id.clone(),
                loser_id: loser.id.clone(),
                actor_id: actor_id.to_string(),
                timestamp: self.clock.now(),
            };

            if let Err(e) = self.votes.append(vote.clone()).await {
                warn!(
                    "Vote append failed for '{}' over '{}', reverting ratings: {}",
                    winner.id, loser.id, e
                );
                return Err(match self.entities.revert_atomic(&mutation).await {
                    Ok(()) => e,
                    Err(revert_err) => {
                        error!(
                            "Failed to revert ratings for '{}'/'{}' after append failure: {}",
                            winner.id, loser.id, revert_err
                        );
                        ArenaError::store(format!(
                            "vote append failed ({}) and rating revert failed ({}); ratings of '{}' and '{}' may not match the ledger",
                            e, revert_err, winner.id, loser.id
                        ))
                    }
                });
            }

            info!(
                "Vote {} recorded - actor: '{}', winner: '{}' {} -> {}, loser: '{}' {} -> {}",
                vote.id,
                actor_id,
                winner.id,
                winner.rating,
                update.winner_rating,
                loser.id,
                loser.rating,
                update.loser_rating
            );

            let winner = Entity {
                rating: update.winner_rating,
                wins: winner.wins + 1,
                version: winner.version + 1,
                ..winner
            };
            let loser = Entity {
                rating: update.loser_rating,
                losses: loser.losses + 1,
                version: loser.version + 1,
                ..loser
            };

            return Ok(RecordedVote {
                vote,
                winner,
                loser,
                update,
            });
        }

        Err(ArenaError::store(format!(
            "gave up on vote '{}' over '{}' after {} concurrent modifications",
            winner_id, loser_id, MAX_WRITE_ATTEMPTS
        )))
    }

    /// Number of votes cast by `actor_id` strictly after `since`
    pub async fn count_since(&self, actor_id: &str, since: DateTime<Utc>) -> Result<usize> {
        self.votes.count_since(actor_id, since).await
    }

    /// Timestamp of the oldest vote cast by `actor_id` strictly after `since`
    pub async fn oldest_since(
        &self,
        actor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        self.votes.oldest_since(actor_id, since).await
    }

    /// Every vote naming `entity_id`, oldest first
    pub async fn history_for(&self, entity_id: &str) -> Result<Vec<Vote>> {
        self.votes.list_by_entity(entity_id).await
    }

    /// Total number of recorded votes
    pub async fn total_votes(&self) -> Result<usize> {
        self.votes.len().await
    }

    /// Clock the ledger stamps votes with
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    async fn resolve(&self, id: &str) -> Result<Entity> {
        self.entities
            .get(id)
            .await?
            .ok_or_else(|| ArenaError::invalid_vote(format!("unknown entity '{}'", id)))
    }
}
