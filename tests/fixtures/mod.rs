//! Test fixtures and failure-injecting store implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use showdown::error::{ArenaError, Result};
use showdown::store::{
    parse_roster, EntityStore, InMemoryEntityStore, InMemoryVoteStore, RatingMutation, VoteStore,
};
use showdown::types::{Entity, Vote, BASELINE_RATING};
use showdown::utils::ManualClock;
use showdown::Arena;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn unavailable(message: &str) -> ArenaError {
    ArenaError::StoreUnavailable {
        message: message.to_string(),
    }
}

/// `per_category` entities in each of "female" and "male", all at baseline
pub fn test_roster(per_category: usize) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(per_category * 2);
    for (prefix, category) in [("f", "female"), ("m", "male")] {
        for i in 1..=per_category {
            entities.push(Entity::new(
                format!("{}{}", prefix, i),
                format!("{} {}", category, i),
                category,
            ));
        }
    }
    entities
}

/// The bundled demo roster
pub fn demo_roster() -> Vec<Entity> {
    let json = include_str!("../../data/roster.json");
    parse_roster(json, BASELINE_RATING).expect("bundled roster is valid")
}

/// Arena over in-memory stores with a manual clock and a fixed sampling seed
pub fn create_test_arena(entities: Vec<Entity>) -> (Arena, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let store = InMemoryEntityStore::with_entities(entities).expect("unique ids");
    let arena = Arena::builder(Arc::new(store), Arc::new(InMemoryVoteStore::new()))
        .sampler(showdown::MatchSampler::seeded(42))
        .clock(clock.clone())
        .build();
    (arena, clock)
}

/// Vote store wrapper that can be told to fail appends or reads
#[derive(Default)]
pub struct FaultyVoteStore {
    inner: InMemoryVoteStore,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
    append_attempts: AtomicUsize,
}

impl FaultyVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn append_attempts(&self) -> usize {
        self.append_attempts.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("vote store read timed out"));
        }
        Ok(())
    }
}

#[async_trait]
impl VoteStore for FaultyVoteStore {
    async fn append(&self, vote: Vote) -> Result<()> {
        self.append_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(unavailable("vote store write failed"));
        }
        self.inner.append(vote).await
    }

    async fn count_since(&self, actor_id: &str, since: DateTime<Utc>) -> Result<usize> {
        self.check_reads()?;
        self.inner.count_since(actor_id, since).await
    }

    async fn oldest_since(
        &self,
        actor_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        self.check_reads()?;
        self.inner.oldest_since(actor_id, since).await
    }

    async fn list_by_entity(&self, entity_id: &str) -> Result<Vec<Vote>> {
        self.check_reads()?;
        self.inner.list_by_entity(entity_id).await
    }

    async fn len(&self) -> Result<usize> {
        self.check_reads()?;
        self.inner.len().await
    }
}

/// Entity store wrapper that simulates writers outside this process
///
/// The first `conflicts` calls to `apply_atomic` fail their version check as
/// if another writer had updated the winner first.
pub struct ContendedEntityStore {
    inner: InMemoryEntityStore,
    conflicts: AtomicUsize,
    applied: Mutex<Vec<RatingMutation>>,
}

impl ContendedEntityStore {
    pub fn new(entities: Vec<Entity>, conflicts: usize) -> Self {
        Self {
            inner: InMemoryEntityStore::with_entities(entities).expect("unique ids"),
            conflicts: AtomicUsize::new(conflicts),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Mutations that went through
    pub fn applied(&self) -> Vec<RatingMutation> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EntityStore for ContendedEntityStore {
    async fn query(&self, category: Option<&str>) -> Result<Vec<Entity>> {
        self.inner.query(category).await
    }

    async fn get(&self, id: &str) -> Result<Option<Entity>> {
        self.inner.get(id).await
    }

    async fn insert(&self, entity: Entity) -> Result<()> {
        self.inner.insert(entity).await
    }

    async fn apply_atomic(&self, mutation: &RatingMutation) -> Result<()> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(ArenaError::ConcurrentModification {
                entity_id: mutation.winner_id.clone(),
            });
        }

        self.inner.apply_atomic(mutation).await?;
        if let Ok(mut applied) = self.applied.lock() {
            applied.push(mutation.clone());
        }
        Ok(())
    }

    async fn revert_atomic(&self, mutation: &RatingMutation) -> Result<()> {
        self.inner.revert_atomic(mutation).await
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }
}
