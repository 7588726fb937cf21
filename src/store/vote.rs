//! Vote storage interface and in-memory implementation
//!
//! The vote log is append-only: rows are never edited or removed.

use crate::error::{ArenaError, Result};
use crate::types::{ActorId, Vote, VoteId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Trait for vote persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Append a vote. Fails on a duplicate vote id.
    async fn append(&self, vote: Vote) -> Result<()>;

    /// Number of votes cast by `actor_id` strictly after `since`
    async fn count_since(&self, actor_id: &str, since: DateTime<Utc>) -> Result<usize>;

    /// Timestamp of the oldest vote cast by `actor_id` strictly after `since`
    async fn oldest_since(
        &self,
        actor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>>;

    /// All votes naming `entity_id` as winner or loser, oldest first
    async fn list_by_entity(&self, entity_id: &str) -> Result<Vec<Vote>>;

    /// Total number of recorded votes
    async fn len(&self) -> Result<usize>;
}

#[derive(Debug, Default)]
struct VoteLog {
    votes: Vec<Vote>,
    ids: HashSet<VoteId>,
    by_actor: HashMap<ActorId, Vec<usize>>,
}

impl VoteLog {
    fn actor_votes<'a>(&'a self, actor_id: &str) -> impl Iterator<Item = &'a Vote> + 'a {
        self.by_actor
            .get(actor_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.votes[idx])
    }
}

/// In-memory vote log
#[derive(Debug, Default)]
pub struct InMemoryVoteStore {
    log: RwLock<VoteLog>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded vote in append order
    pub fn all_votes(&self) -> Result<Vec<Vote>> {
        Ok(self.read_log()?.votes.clone())
    }

    fn read_log(&self) -> Result<std::sync::RwLockReadGuard<'_, VoteLog>> {
        self.log
            .read()
            .map_err(|_| ArenaError::store("Failed to acquire vote log read lock"))
    }
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn append(&self, vote: Vote) -> Result<()> {
        let mut log = self
            .log
            .write()
            .map_err(|_| ArenaError::store("Failed to acquire vote log write lock"))?;

        if !log.ids.insert(vote.id) {
            return Err(ArenaError::invalid_record(format!(
                "duplicate vote id {}",
                vote.id
            )));
        }

        let idx = log.votes.len();
        log.by_actor
            .entry(vote.actor_id.clone())
            .or_default()
            .push(idx);
        log.votes.push(vote);

        Ok(())
    }

    async fn count_since(&self, actor_id: &str, since: DateTime<Utc>) -> Result<usize> {
        let log = self.read_log()?;
        Ok(log
            .actor_votes(actor_id)
            .filter(|vote| vote.timestamp > since)
            .count())
    }

    async fn oldest_since(
        &self,
        actor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let log = self.read_log()?;
        Ok(log
            .actor_votes(actor_id)
            .map(|vote| vote.timestamp)
            .filter(|ts| *ts > since)
            .min())
    }

    async fn list_by_entity(&self, entity_id: &str) -> Result<Vec<Vote>> {
        let log = self.read_log()?;
        Ok(log
            .votes
            .iter()
            .filter(|vote| vote.winner_id == entity_id || vote.loser_id == entity_id)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read_log()?.votes.len())
    }
}
