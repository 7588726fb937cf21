//! Configuration management for the voting service
//!
//! Loads configuration from defaults, an optional TOML file and environment
//! variables, then validates it.

pub mod app;

pub use app::{
    validate_config, AppConfig, LimitSettings, PairingSettings, RatingSettings, ServiceSettings,
    StorageSettings,
};
