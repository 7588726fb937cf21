//! Random pair selection
//!
//! Draws two distinct entities from a pool. The first side is either the
//! retained entity from the previous round (a winning streak) or a uniform
//! draw; the second side is a uniform draw excluding the first, with a
//! bounded number of attempts and a deterministic fallback. The display order
//! of the final pair is a separate coin flip.

use crate::error::{ArenaError, Result};
use crate::types::{Entity, MatchPair};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Default cap on redraws for the second side
pub const DEFAULT_MAX_DRAW_ATTEMPTS: u32 = 50;

/// Configuration for pair sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Redraws allowed before falling back to the first distinct entity
    pub max_draw_attempts: u32,
    /// Fixed seed for reproducible sampling; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_draw_attempts: DEFAULT_MAX_DRAW_ATTEMPTS,
            seed: None,
        }
    }
}

/// Pair sampler over an injected random source
#[derive(Debug)]
pub struct MatchSampler<R = StdRng> {
    rng: Mutex<R>,
    max_draw_attempts: u32,
}

impl MatchSampler<StdRng> {
    /// Create a sampler seeded from the configuration (or from entropy)
    pub fn new(config: &SamplerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, config.max_draw_attempts)
    }

    /// Create a sampler with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), DEFAULT_MAX_DRAW_ATTEMPTS)
    }
}

impl Default for MatchSampler<StdRng> {
    fn default() -> Self {
        Self::new(&SamplerConfig::default())
    }
}

impl<R: RngCore + Send> MatchSampler<R> {
    /// Create a sampler over any random source
    pub fn with_rng(rng: R, max_draw_attempts: u32) -> Self {
        Self {
            rng: Mutex::new(rng),
            max_draw_attempts,
        }
    }

    /// Select two distinct entities from `pool`
    ///
    /// When `retain_id` names an entity in the pool it is always one side of
    /// the returned pair. Fails with `InsufficientPool` when the pool has
    /// fewer than two distinct entities.
    pub fn next_pair(&self, pool: &[Entity], retain_id: Option<&str>) -> Result<MatchPair> {
        if pool.len() < 2 {
            return Err(insufficient(pool, pool.len()));
        }

        // The RNG carries no invariants, so a poisoned lock is still usable
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let retained = retain_id.and_then(|id| pool.iter().position(|e| e.id == id));
        let first = match retained {
            Some(idx) => idx,
            None => rng.gen_range(0..pool.len()),
        };
        let anchor = &pool[first];

        let mut second = None;
        for attempt in 0..self.max_draw_attempts {
            let candidate = rng.gen_range(0..pool.len());
            if pool[candidate].id != anchor.id {
                debug!("Drew opponent for '{}' on attempt {}", anchor.id, attempt + 1);
                second = Some(candidate);
                break;
            }
        }

        let second = match second {
            Some(idx) => idx,
            None => {
                debug!(
                    "Draw cap of {} exhausted for '{}', using first distinct entity",
                    self.max_draw_attempts, anchor.id
                );
                pool.iter()
                    .position(|e| e.id != anchor.id)
                    .ok_or_else(|| insufficient(pool, 1))?
            }
        };

        let (left, right) = if rng.gen_bool(0.5) {
            (first, second)
        } else {
            (second, first)
        };

        Ok(MatchPair {
            left: pool[left].clone(),
            right: pool[right].clone(),
            anchor_id: anchor.id.clone(),
        })
    }
}

fn insufficient(pool: &[Entity], available: usize) -> ArenaError {
    ArenaError::InsufficientPool {
        category: pool
            .first()
            .map(|e| e.category.clone())
            .unwrap_or_default(),
        available,
    }
}
