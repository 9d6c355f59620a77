//! Reposync CLI - scheduler and operator commands for the repository sync engine.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "reposync")]
#[command(version)]
#[command(about = "Keep stored project records in step with GitHub")]
#[command(
    long_about = "Reposync refreshes locally stored project records from the GitHub API. \
Each pass checks the remaining request budget, picks the least recently synced \
records, and writes repository metadata, contributor counts and README content back \
to the database."
)]
#[command(after_long_help = r#"EXAMPLES
    Track a repository and sync it right away:
        $ reposync add https://github.com/serde-rs/serde

    Run one pass over the stalest records:
        $ reposync sync

    Keep syncing every 30 minutes until Ctrl+C:
        $ reposync watch

    Check the request budget:
        $ reposync limits --output json

CONFIGURATION
    Reposync reads configuration from:
      1. ~/.config/reposync/config.toml (or $XDG_CONFIG_HOME/reposync/config.toml)
      2. ./reposync.toml
      3. Environment variables (REPOSYNC_* prefix, e.g., REPOSYNC_GITHUB__KEY)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOSYNC_DATABASE__URL    Database connection string (default: ~/.local/state/reposync/reposync.db)
    REPOSYNC_GITHUB__USER     GitHub username for Basic authentication
    REPOSYNC_GITHUB__KEY      GitHub personal access token
    RUST_LOG                  Log filter (default: reposync=info,reposync_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass now
    Sync {
        /// Sync only this record, skipping the budget check and batch cap
        #[arg(short, long)]
        record: Option<Uuid>,
    },
    /// Run a sync pass on a fixed interval until Ctrl+C
    Watch {
        /// Minutes between passes (default from config or 30)
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
    /// Show the current rate limit budget
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Track a new repository
    Add {
        /// Repository page URL, e.g. https://github.com/owner/name
        url: String,

        /// Record title (defaults to the repository name)
        #[arg(short, long)]
        title: Option<String>,

        /// Only store the record; leave the first sync to the next pass
        #[arg(long)]
        no_sync: bool,
    },
    /// List records, most recently updated first
    List {
        /// Maximum records to show
        #[arg(short = 'n', long, default_value_t = 30)]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    shutdown::setup_shutdown_handler();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("reposync=info,reposync_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Rate limits come straight from the API; no database needed.
    if let Commands::Limits { output } = &cli.command {
        commands::limits::handle_limits(*output, &config).await?;
        return Ok(());
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set REPOSYNC_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Sync { record } => {
            commands::sync::handle_sync(record, &config, &database_url).await?;
        }
        Commands::Watch { interval_minutes } => {
            commands::sync::handle_watch(interval_minutes, &config, &database_url).await?;
        }
        Commands::Add {
            url,
            title,
            no_sync,
        } => {
            commands::records::handle_add(&url, title, no_sync, &config, &database_url).await?;
        }
        Commands::List { limit, output } => {
            commands::records::handle_list(limit, output, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Limits { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_accepts_a_record_id() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["reposync", "sync", "--record", &id.to_string()]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { record: Some(r) } if r == id));
    }

    #[test]
    fn list_defaults_to_thirty_rows() {
        let cli = Cli::try_parse_from(["reposync", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { limit: 30, .. }));
    }
}
