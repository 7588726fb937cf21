//! Common types used throughout the voting service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Unique, immutable identifier of a rated entity
pub type EntityId = String;

/// Stable identifier of a voter, supplied by the identity layer
pub type ActorId = String;

/// Unique identifier of a recorded vote
pub type VoteId = Uuid;

/// Integer Elo rating
pub type Rating = i64;

/// Rating every entity starts from
pub const BASELINE_RATING: Rating = 1500;

/// A rated entity and its win/loss record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Category the entity competes in; pairs never cross categories
    pub category: String,
    pub series: Option<String>,
    pub image_ref: String,
    pub rating: Rating,
    pub wins: u64,
    pub losses: u64,
    /// Bumped on every rating mutation; used for compare-and-swap writes
    pub version: u64,
}

impl Entity {
    /// Create a fresh entity at the baseline rating
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let image_ref = placeholder_image(&id);
        Self {
            id,
            name: name.into(),
            category: category.into(),
            series: None,
            image_ref,
            rating: BASELINE_RATING,
            wins: 0,
            losses: 0,
            version: 0,
        }
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = rating;
        self
    }

    /// Total number of votes this entity took part in
    pub fn matches_played(&self) -> u64 {
        self.wins + self.losses
    }
}

/// Deterministic placeholder artwork for entities seeded without an image
pub fn placeholder_image(id: &str) -> String {
    format!("https://picsum.photos/seed/{}/400/500", id)
}

/// An immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub winner_id: EntityId,
    pub loser_id: EntityId,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
}

/// Public view of an entity as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub name: String,
    pub series: Option<String>,
    pub category: String,
    pub rating: Rating,
    pub image_ref: String,
    pub wins: u64,
    pub losses: u64,
}

impl From<&Entity> for EntitySummary {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            series: entity.series.clone(),
            category: entity.category.clone(),
            rating: entity.rating,
            image_ref: entity.image_ref.clone(),
            wins: entity.wins,
            losses: entity.losses,
        }
    }
}

impl From<Entity> for EntitySummary {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            series: entity.series,
            category: entity.category,
            rating: entity.rating,
            image_ref: entity.image_ref,
            wins: entity.wins,
            losses: entity.losses,
        }
    }
}

/// Two distinct entities in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub left: Entity,
    pub right: Entity,
    /// The side that was selected first (the retained entity on a streak)
    pub anchor_id: EntityId,
}

impl MatchPair {
    pub fn ids(&self) -> (&str, &str) {
        (&self.left.id, &self.right.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.left.id == id || self.right.id == id
    }
}

/// Pair as returned to a voting client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairView {
    pub left: EntitySummary,
    pub right: EntitySummary,
    /// True when the retained entity from the previous round was kept
    pub retained: bool,
}

/// One row of a leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntity {
    /// 1-based position
    pub rank: usize,
    #[serde(flatten)]
    pub entity: EntitySummary,
}

/// Answer to "may this actor vote now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub retry_after: Option<Duration>,
}

impl Admission {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: None,
        }
    }

    pub fn denied(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }
}

/// Outcome of a successful vote submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub winner: EntitySummary,
    pub loser: EntitySummary,
}
