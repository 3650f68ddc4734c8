//! Standalone migration runner.
//!
//! Applies pending migrations from a directory without starting the
//! HTTP server. Useful for deploy scripts and CI.

use std::process::ExitCode;

use clap::Parser;
use plinth_db::{create_pool, Db, DbRuntimeSettings};
use plinth_migrate::{upgrade, MigrationSet, UpgradeOptions, DEFAULT_TRACKER_TABLE};
use plinth_server::config;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "migrate", about = "Apply pending database migrations")]
struct Cli {
    /// Path to the server config file.
    #[arg(long)]
    config: Option<String>,

    /// Migration directory override.
    #[arg(long)]
    path: Option<String>,

    /// Record failing statements and continue instead of aborting.
    #[arg(long)]
    force: bool,

    /// Name of the tracker table.
    #[arg(long, default_value = DEFAULT_TRACKER_TABLE)]
    tracker: String,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match config::load_config(cli.config.as_deref().or(Some("config.toml"))) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let migrations_path = cli.path.unwrap_or(config.migrations.path);

    let pool = match create_pool(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    ) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, path = config.database.path, "failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let set = match MigrationSet::from_dir(&migrations_path) {
        Ok(set) => set,
        Err(e) => {
            tracing::error!(error = %e, path = migrations_path, "failed to load migration files");
            return ExitCode::FAILURE;
        }
    };

    if set.is_empty() {
        tracing::info!(path = migrations_path, "no migration files found");
        return ExitCode::SUCCESS;
    }

    let db = Db::new(pool);
    let options = UpgradeOptions {
        force: cli.force,
        tracker_table: cli.tracker,
    };

    match upgrade(&db, &set, &options) {
        Ok(report) => {
            tracing::info!(
                applied = report.applied,
                failed = report.statements_failed,
                "migration run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "migration run aborted");
            ExitCode::FAILURE
        }
    }
}
