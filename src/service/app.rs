//! Main application state and service coordination
//!
//! Builds the arena from configuration, seeds the entity store and runs the
//! HTTP API with graceful shutdown.

use crate::arena::Arena;
use crate::config::AppConfig;
use crate::http::{ApiServer, ApiState};
use crate::metrics::MetricsCollector;
use crate::pairing::MatchSampler;
use crate::rating::{EloRatingEngine, RatingEngine};
use crate::store::{load_roster, InMemoryEntityStore, InMemoryVoteStore};
use crate::types::Entity;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Roster error: {message}")]
    Roster { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// The voting core
    arena: Arc<Arena>,

    /// HTTP API server
    server: Arc<ApiServer>,

    /// Server task handle
    server_task: Option<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing showdown voting service");
        info!(
            "Configuration: service={}, k_factor={}, vote_limit={}/{}h (enabled: {})",
            config.service.name,
            config.rating.k_factor,
            config.limits.max_votes,
            config.limits.window_hours,
            config.limits.enabled
        );

        let arena = Arc::new(Self::initialize_arena(&config).await?);

        let addr = config
            .http_addr()
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?;
        let is_running = Arc::new(RwLock::new(false));
        let api_state = ApiState {
            arena: arena.clone(),
            service_name: config.service.name.clone(),
            running: is_running.clone(),
        };
        let server = Arc::new(ApiServer::new(addr, api_state));

        Ok(Self {
            config,
            arena,
            server,
            server_task: None,
            is_running,
        })
    }

    /// Build the arena and seed its entity store
    pub async fn initialize_arena(config: &AppConfig) -> Result<Arena, ServiceError> {
        let engine = EloRatingEngine::new(config.engine_config()).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to initialize rating engine: {}", e),
            }
        })?;

        let roster = Self::load_entities(config, engine.baseline_rating())?;
        let categories = {
            let mut seen: Vec<&str> = Vec::new();
            for entity in &roster {
                if !seen.contains(&entity.category.as_str()) {
                    seen.push(&entity.category);
                }
            }
            seen.join(", ")
        };
        info!(
            "Seeding {} entities (categories: {})",
            roster.len(),
            categories
        );

        let entities = InMemoryEntityStore::with_entities(roster).map_err(|e| {
            ServiceError::Roster {
                message: e.to_string(),
            }
        })?;

        let metrics = MetricsCollector::new().map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create metrics collector: {}", e),
        })?;

        let arena = Arena::builder(Arc::new(entities), Arc::new(InMemoryVoteStore::new()))
            .engine(Arc::new(engine))
            .sampler(MatchSampler::new(&config.sampler_config()))
            .limits(config.limit_config())
            .metrics(Arc::new(metrics))
            .build();

        Ok(arena)
    }

    fn load_entities(config: &AppConfig, baseline: i64) -> Result<Vec<Entity>, ServiceError> {
        match &config.storage.roster_path {
            Some(path) => {
                info!("Loading roster from {}", path.display());
                load_roster(path, baseline).map_err(|e| ServiceError::Roster {
                    message: format!("{}: {}", path.display(), e),
                })
            }
            None => {
                warn!("No roster configured, starting with an empty entity store");
                Ok(Vec::new())
            }
        }
    }

    /// Start serving requests
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting showdown voting service");

        *self.is_running.write().await = true;

        let server = self.server.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("HTTP server failed: {}", e);
            } else {
                debug!("HTTP server task completed");
            }
        });
        self.server_task = Some(handle);

        // Give the server a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!(
            "✅ Showdown voting service started on port {}",
            self.config.service.http_port
        );
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of showdown service");

        *self.is_running.write().await = false;

        self.server.stop();
        if let Some(handle) = self.server_task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout(), handle).await {
                Ok(Ok(())) => info!("✅ HTTP server stopped"),
                Ok(Err(e)) => warn!("HTTP server task ended abnormally: {}", e),
                Err(_) => warn!(
                    "HTTP server did not stop within {}s",
                    self.config.service.shutdown_timeout_seconds
                ),
            }
        }

        let final_stats =
            self.arena
                .stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Showdown service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the voting core
    pub fn arena(&self) -> Arc<Arena> {
        self.arena.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_initialize_without_roster() {
        let state = AppState::new(AppConfig::default()).await.unwrap();
        assert!(!state.is_running().await);
        assert_eq!(state.arena().stats().await.unwrap().entities, 0);
    }

    #[tokio::test]
    async fn test_initialize_with_roster() {
        let path = std::env::temp_dir().join(format!("showdown-roster-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[
                {{"id": "f1", "name": "Asuna", "category": "female", "wins": 0, "losses": 0}},
                {{"id": "m1", "name": "Levi", "category": "male", "wins": 0, "losses": 0}}
            ]"#
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.storage.roster_path = Some(path.clone());

        let arena = AppState::initialize_arena(&config).await.unwrap();
        assert_eq!(arena.categories().await.unwrap(), vec!["female", "male"]);

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_roster_file_fails() {
        let mut config = AppConfig::default();
        config.storage.roster_path = Some("/nonexistent/roster.json".into());

        let result = AppState::initialize_arena(&config).await;
        assert!(matches!(result, Err(ServiceError::Roster { .. })));
    }
}
