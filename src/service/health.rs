//! Health checks for the voting service
//!
//! Liveness is "the service is running"; readiness additionally requires the
//! entity store and the vote ledger to answer.

use crate::arena::{Arena, ArenaStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Worse of the two
    fn combine(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Arena statistics, when the stores answered
    pub stats: Option<ArenaStats>,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl HealthCheck {
    /// Perform a full health check
    pub async fn check(arena: &Arena, service: &str, running: bool) -> Self {
        let mut checks = Vec::new();

        checks.push(Self::check_service_running(running));
        checks.push(Self::check_entity_store(arena).await);
        checks.push(Self::check_vote_ledger(arena).await);

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |acc, check| acc.combine(check.status));

        let stats = match arena.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                debug!("Failed to get arena stats for health check: {}", e);
                None
            }
        };

        HealthCheck {
            status,
            service: service.to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        }
    }

    /// Readiness: running, and both stores answer
    pub async fn readiness_check(arena: &Arena, running: bool) -> HealthStatus {
        if !running {
            return HealthStatus::Unhealthy;
        }
        Self::check_entity_store(arena)
            .await
            .status
            .combine(Self::check_vote_ledger(arena).await.status)
    }

    fn check_service_running(running: bool) -> ComponentCheck {
        let (status, message) = if running {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: 0,
        }
    }

    async fn check_entity_store(arena: &Arena) -> ComponentCheck {
        let start = Instant::now();

        // An empty roster can never serve a pair
        let (status, message) = match arena.rankings(None).await {
            Ok(entities) if entities.len() >= 2 => (HealthStatus::Healthy, None),
            Ok(entities) => (
                HealthStatus::Degraded,
                Some(format!("Only {} entities loaded", entities.len())),
            ),
            Err(e) => {
                error!("Entity store health check failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()))
            }
        };

        ComponentCheck {
            name: "entity_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_vote_ledger(arena: &Arena) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match arena.ledger().total_votes().await {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Vote ledger health check failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()))
            }
        };

        ComponentCheck {
            name: "vote_ledger".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
