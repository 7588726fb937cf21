//! Main application configuration
//!
//! Defaults, environment variable overrides, optional TOML file loading and
//! validation for the voting service.

use crate::limiter::LimitConfig;
use crate::pairing::{SamplerConfig, DEFAULT_MAX_DRAW_ATTEMPTS};
use crate::rating::{EloEngineConfig, DEFAULT_K_FACTOR};
use crate::store::schema::MAX_RATING;
use crate::types::{Rating, BASELINE_RATING};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted vote window, one year
pub const MAX_WINDOW_HOURS: u64 = 24 * 365;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingSettings,
    pub pairing: PairingSettings,
    pub limits: LimitSettings,
    pub storage: StorageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP API binds to
    pub http_host: String,
    /// Port for the HTTP API (health and metrics included)
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Elo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Maximum points moved by a single vote
    pub k_factor: f64,
    /// Rating for entities with no recorded rating
    pub baseline_rating: Rating,
}

/// Pair sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingSettings {
    /// Redraws before falling back to a linear scan
    pub max_draw_attempts: u32,
    /// Fixed seed for reproducible pairs
    pub seed: Option<u64>,
}

/// Vote limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Votes allowed per actor per window
    pub max_votes: usize,
    /// Window length in hours
    pub window_hours: u64,
    /// Enable vote limiting
    pub enabled: bool,
    /// Report time until the oldest in-window vote expires
    pub precise_retry_after: bool,
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON roster used to seed the entity store
    pub roster_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "showdown".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            baseline_rating: BASELINE_RATING,
        }
    }
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            max_draw_attempts: DEFAULT_MAX_DRAW_ATTEMPTS,
            seed: None,
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        let limits = LimitConfig::default();
        Self {
            max_votes: limits.max_votes,
            window_hours: limits.window.as_secs() / 3600,
            enabled: limits.enabled,
            precise_retry_after: limits.precise_retry_after,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Rating settings
        if let Ok(k) = env::var("RATING_K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_K_FACTOR value: {}", k))?;
        }
        if let Ok(baseline) = env::var("RATING_BASELINE") {
            self.rating.baseline_rating = baseline
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_BASELINE value: {}", baseline))?;
        }

        // Pairing settings
        if let Ok(attempts) = env::var("PAIRING_MAX_DRAW_ATTEMPTS") {
            self.pairing.max_draw_attempts = attempts
                .parse()
                .map_err(|_| anyhow!("Invalid PAIRING_MAX_DRAW_ATTEMPTS value: {}", attempts))?;
        }
        if let Ok(seed) = env::var("PAIRING_SEED") {
            self.pairing.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("Invalid PAIRING_SEED value: {}", seed))?,
            );
        }

        // Limit settings
        if let Ok(limit) = env::var("VOTE_LIMIT") {
            self.limits.max_votes = limit
                .parse()
                .map_err(|_| anyhow!("Invalid VOTE_LIMIT value: {}", limit))?;
        }
        if let Ok(hours) = env::var("VOTE_WINDOW_HOURS") {
            self.limits.window_hours = hours
                .parse()
                .map_err(|_| anyhow!("Invalid VOTE_WINDOW_HOURS value: {}", hours))?;
        }
        if let Ok(enabled) = env::var("VOTE_LIMIT_ENABLED") {
            self.limits.enabled = enabled
                .parse()
                .map_err(|_| anyhow!("Invalid VOTE_LIMIT_ENABLED value: {}", enabled))?;
        }

        // Storage settings
        if let Ok(path) = env::var("ROSTER_PATH") {
            self.storage.roster_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Socket address for the HTTP API
    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.service.http_host, self.service.http_port)
            .parse()
            .map_err(|_| {
                anyhow!(
                    "Invalid HTTP address: {}:{}",
                    self.service.http_host,
                    self.service.http_port
                )
            })
    }

    pub fn engine_config(&self) -> EloEngineConfig {
        EloEngineConfig {
            k_factor: self.rating.k_factor,
            baseline_rating: self.rating.baseline_rating,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            max_draw_attempts: self.pairing.max_draw_attempts,
            seed: self.pairing.seed,
        }
    }

    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            max_votes: self.limits.max_votes,
            window: self
                .limits
                .window_hours
                .checked_mul(3600)
                .map(Duration::from_secs)
                .unwrap_or(Duration::MAX),
            enabled: self.limits.enabled,
            precise_retry_after: self.limits.precise_retry_after,
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if !config.rating.k_factor.is_finite() || config.rating.k_factor <= 0.0 {
        return Err(anyhow!(
            "K-factor must be a positive number, got {}",
            config.rating.k_factor
        ));
    }
    if !(0..=MAX_RATING).contains(&config.rating.baseline_rating) {
        return Err(anyhow!(
            "Baseline rating must be within 0..={}, got {}",
            MAX_RATING,
            config.rating.baseline_rating
        ));
    }

    if config.pairing.max_draw_attempts == 0 {
        return Err(anyhow!("Max draw attempts must be greater than 0"));
    }

    if config.limits.max_votes == 0 {
        return Err(anyhow!("Vote limit must be greater than 0"));
    }
    if config.limits.window_hours == 0 {
        return Err(anyhow!("Vote window must be at least one hour"));
    }
    if config.limits.window_hours > MAX_WINDOW_HOURS {
        return Err(anyhow!(
            "Vote window must be at most {} hours, got {}",
            MAX_WINDOW_HOURS,
            config.limits.window_hours
        ));
    }

    Ok(())
}
