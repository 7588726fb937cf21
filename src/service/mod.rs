//! Service layer for the showdown voting service
//!
//! This module contains the application state, startup and shutdown
//! coordination, and health reporting.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
