//! Showdown binary: load configuration, seed the roster, serve the voting API

use anyhow::{Context, Result};
use clap::Parser;
use showdown::config::{validate_config, AppConfig};
use showdown::service::{AppState, HealthCheck};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Head-to-head fan voting with per-category Elo leaderboards
#[derive(Parser)]
#[command(name = "showdown", version)]
struct Args {
    /// TOML configuration file; environment variables are used when absent
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// JSON roster used to seed entities
    #[arg(long, value_name = "FILE")]
    roster: Option<PathBuf>,

    /// Fixed sampling seed for reproducible pairs
    #[arg(long)]
    seed: Option<u64>,

    /// Admit every vote regardless of the per-actor limit
    #[arg(long)]
    no_rate_limit: bool,

    /// Shorthand for `--log-level debug`
    #[arg(short, long)]
    debug: bool,

    /// Build the arena from config and roster, then exit
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::from_env()?,
        };

        if let Some(level) = self.log_level {
            config.service.log_level = level;
        }
        if self.debug {
            config.service.log_level = "debug".to_string();
        }
        if let Some(port) = self.http_port {
            config.service.http_port = port;
        }
        if let Some(roster) = self.roster {
            config.storage.roster_path = Some(roster);
        }
        if let Some(seed) = self.seed {
            config.pairing.seed = Some(seed);
        }
        if self.no_rate_limit {
            config.limits.enabled = false;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to initialize logging")
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Log a health summary every minute
async fn health_check_task(app_state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let service = app_state.config().service.name.clone();

    while app_state.is_running().await {
        interval.tick().await;

        let health = HealthCheck::check(&app_state.arena(), &service, true).await;
        match &health.stats {
            Some(stats) => info!(
                "Health: {} ({} entities, {} votes, {} pairs served)",
                health.status, stats.entities, stats.votes_in_ledger, stats.pairs_served
            ),
            None => warn!("Health: {} (stats unavailable)", health.status),
        }
    }
}

async fn run(config: AppConfig, dry_run: bool) -> Result<()> {
    info!(
        "{} v{} on {}:{} (K={}, {} votes per {}h, limiter enabled: {})",
        config.service.name,
        showdown::VERSION,
        config.service.http_host,
        config.service.http_port,
        config.rating.k_factor,
        config.limits.max_votes,
        config.limits.window_hours,
        config.limits.enabled
    );

    if dry_run {
        let arena = AppState::initialize_arena(&config).await?;
        let categories = arena.categories().await?;
        info!(
            "Dry run ok: {} categories ({})",
            categories.len(),
            categories.join(", ")
        );
        return Ok(());
    }

    let mut app_state = AppState::new(config).await?;
    app_state.start().await?;
    let app_state = Arc::new(app_state);

    let health_task = tokio::spawn(health_check_task(app_state.clone()));

    shutdown_signal().await;

    health_task.abort();
    let _ = health_task.await;

    match Arc::try_unwrap(app_state) {
        Ok(mut app_state) => app_state.shutdown().await?,
        Err(_) => warn!("Service state still shared, skipping graceful shutdown"),
    }

    info!("Stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let dry_run = args.dry_run;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config, dry_run).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
