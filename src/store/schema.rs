//! Row schema for seeded or persisted entities
//!
//! Raw rows are deserialized into [`EntityRow`] and must pass
//! [`EntityRow::validate`] before they become an [`Entity`]. Malformed rows
//! are rejected rather than patched up.

use crate::error::{ArenaError, Result};
use crate::types::{placeholder_image, Entity, Rating};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Highest rating accepted from a row
pub const MAX_RATING: Rating = 10_000;

/// Raw entity row as found in a roster file or store export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRow {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub losses: i64,
}

impl EntityRow {
    /// Validate the row and convert it into an entity
    pub fn validate(self, baseline: Rating) -> Result<Entity> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ArenaError::invalid_record("entity id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(ArenaError::invalid_record(format!(
                "entity '{}' has an empty name",
                id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(ArenaError::invalid_record(format!(
                "entity '{}' has an empty category",
                id
            )));
        }
        if self.wins < 0 || self.losses < 0 {
            return Err(ArenaError::invalid_record(format!(
                "entity '{}' has negative win/loss counters",
                id
            )));
        }

        let rating = self.rating.unwrap_or(baseline);
        if !(0..=MAX_RATING).contains(&rating) {
            return Err(ArenaError::invalid_record(format!(
                "entity '{}' has out-of-range rating {}",
                id, rating
            )));
        }

        let image_ref = match self.image_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => placeholder_image(id),
        };

        Ok(Entity {
            id: id.to_string(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            series: self.series.filter(|s| !s.trim().is_empty()),
            image_ref,
            rating,
            wins: self.wins as u64,
            losses: self.losses as u64,
            version: 0,
        })
    }
}

/// Parse and validate a JSON roster (an array of entity rows)
pub fn parse_roster(json: &str, baseline: Rating) -> Result<Vec<Entity>> {
    let rows: Vec<EntityRow> = serde_json::from_str(json)
        .map_err(|e| ArenaError::invalid_record(format!("malformed roster: {}", e)))?;

    let mut seen = HashSet::new();
    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        let entity = row.validate(baseline)?;
        if !seen.insert(entity.id.clone()) {
            return Err(ArenaError::invalid_record(format!(
                "duplicate entity id '{}' in roster",
                entity.id
            )));
        }
        entities.push(entity);
    }

    Ok(entities)
}

/// Read a JSON roster from disk
pub fn load_roster(path: &Path, baseline: Rating) -> Result<Vec<Entity>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ArenaError::invalid_record(format!("cannot read roster {}: {}", path.display(), e))
    })?;
    parse_roster(&json, baseline)
}
