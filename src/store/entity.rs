//! Entity storage interface and in-memory implementation
//!
//! The store owns the current rating and win/loss record of every entity.
//! Rating writes go through [`EntityStore::apply_atomic`], which checks the
//! version each rating was read at and updates both sides of a vote in one
//! step, or not at all.

use crate::error::{ArenaError, Result};
use crate::types::{Entity, EntityId, Rating};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// A version-stamped rating change for both sides of one vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingMutation {
    pub winner_id: EntityId,
    pub loser_id: EntityId,
    /// Version of the winner row the new rating was computed from
    pub winner_version: u64,
    /// Version of the loser row the new rating was computed from
    pub loser_version: u64,
    pub winner_before: Rating,
    pub winner_after: Rating,
    pub loser_before: Rating,
    pub loser_after: Rating,
}

impl RatingMutation {
    /// Build a mutation from the two rows the ratings were read from
    pub fn from_snapshot(
        winner: &Entity,
        loser: &Entity,
        winner_after: Rating,
        loser_after: Rating,
    ) -> Self {
        Self {
            winner_id: winner.id.clone(),
            loser_id: loser.id.clone(),
            winner_version: winner.version,
            loser_version: loser.version,
            winner_before: winner.rating,
            winner_after,
            loser_before: loser.rating,
            loser_after,
        }
    }
}

/// Trait for entity persistence
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Snapshot of all entities, optionally restricted to one category,
    /// in insertion order
    async fn query(&self, category: Option<&str>) -> Result<Vec<Entity>>;

    /// Look up a single entity
    async fn get(&self, id: &str) -> Result<Option<Entity>>;

    /// Add a new entity (seeding). Fails on a duplicate id.
    async fn insert(&self, entity: Entity) -> Result<()>;

    /// Apply new ratings and bump the winner's wins and the loser's losses
    ///
    /// Fails with `ConcurrentModification` when either row has moved past the
    /// version recorded in the mutation; nothing is written in that case.
    async fn apply_atomic(&self, mutation: &RatingMutation) -> Result<()>;

    /// Undo a previously applied mutation
    ///
    /// Only valid while both rows are still at the version `apply_atomic`
    /// left them at.
    async fn revert_atomic(&self, mutation: &RatingMutation) -> Result<()>;

    /// Number of stored entities
    async fn len(&self) -> Result<usize>;

    /// Distinct categories in first-seen order
    async fn categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = Vec::new();
        for entity in self.query(None).await? {
            if !categories.contains(&entity.category) {
                categories.push(entity.category);
            }
        }
        Ok(categories)
    }
}

#[derive(Debug, Default)]
struct EntityTable {
    rows: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl EntityTable {
    fn pair_indices(&self, winner_id: &str, loser_id: &str) -> Result<(usize, usize)> {
        if winner_id == loser_id {
            return Err(ArenaError::invalid_vote("winner and loser must differ"));
        }

        let winner = *self
            .index
            .get(winner_id)
            .ok_or_else(|| ArenaError::invalid_vote(format!("unknown entity '{}'", winner_id)))?;
        let loser = *self
            .index
            .get(loser_id)
            .ok_or_else(|| ArenaError::invalid_vote(format!("unknown entity '{}'", loser_id)))?;

        Ok((winner, loser))
    }

    fn check_version(&self, idx: usize, expected_version: u64, expected_rating: Rating) -> Result<()> {
        let row = &self.rows[idx];
        if row.version != expected_version || row.rating != expected_rating {
            return Err(ArenaError::ConcurrentModification {
                entity_id: row.id.clone(),
            });
        }
        Ok(())
    }
}

/// In-memory entity store
///
/// A single reader-writer lock guards the table. Reads share the lock and
/// always see both sides of a vote applied together.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    table: RwLock<EntityTable>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given entities
    pub fn with_entities(entities: Vec<Entity>) -> Result<Self> {
        let store = Self::new();
        {
            let mut table = store.write_table()?;
            for entity in entities {
                insert_row(&mut table, entity)?;
            }
        }
        Ok(store)
    }

    fn read_table(&self) -> Result<std::sync::RwLockReadGuard<'_, EntityTable>> {
        self.table
            .read()
            .map_err(|_| ArenaError::store("Failed to acquire entity read lock"))
    }

    fn write_table(&self) -> Result<std::sync::RwLockWriteGuard<'_, EntityTable>> {
        self.table
            .write()
            .map_err(|_| ArenaError::store("Failed to acquire entity write lock"))
    }
}

fn insert_row(table: &mut EntityTable, entity: Entity) -> Result<()> {
    if table.index.contains_key(&entity.id) {
        return Err(ArenaError::invalid_record(format!(
            "duplicate entity id '{}'",
            entity.id
        )));
    }

    table.index.insert(entity.id.clone(), table.rows.len());
    table.rows.push(entity);
    Ok(())
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn query(&self, category: Option<&str>) -> Result<Vec<Entity>> {
        let table = self.read_table()?;

        Ok(table
            .rows
            .iter()
            .filter(|entity| category.map_or(true, |c| entity.category == c))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Entity>> {
        let table = self.read_table()?;
        Ok(table.index.get(id).map(|&idx| table.rows[idx].clone()))
    }

    async fn insert(&self, entity: Entity) -> Result<()> {
        let mut table = self.write_table()?;
        insert_row(&mut table, entity)
    }

    async fn apply_atomic(&self, mutation: &RatingMutation) -> Result<()> {
        let mut table = self.write_table()?;
        let (winner, loser) = table.pair_indices(&mutation.winner_id, &mutation.loser_id)?;

        // Validate both rows before touching either
        table.check_version(winner, mutation.winner_version, mutation.winner_before)?;
        table.check_version(loser, mutation.loser_version, mutation.loser_before)?;

        let row = &mut table.rows[winner];
        row.rating = mutation.winner_after;
        row.wins += 1;
        row.version += 1;

        let row = &mut table.rows[loser];
        row.rating = mutation.loser_after;
        row.losses += 1;
        row.version += 1;

        Ok(())
    }

    async fn revert_atomic(&self, mutation: &RatingMutation) -> Result<()> {
        let mut table = self.write_table()?;
        let (winner, loser) = table.pair_indices(&mutation.winner_id, &mutation.loser_id)?;

        table.check_version(winner, mutation.winner_version + 1, mutation.winner_after)?;
        table.check_version(loser, mutation.loser_version + 1, mutation.loser_after)?;

        if table.rows[winner].wins == 0 || table.rows[loser].losses == 0 {
            return Err(ArenaError::store("revert would underflow win/loss counters"));
        }

        // Versions keep moving forward so stale readers still notice the change
        let row = &mut table.rows[winner];
        row.rating = mutation.winner_before;
        row.wins -= 1;
        row.version += 1;

        let row = &mut table.rows[loser];
        row.rating = mutation.loser_before;
        row.losses -= 1;
        row.version += 1;

        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read_table()?.rows.len())
    }
}
