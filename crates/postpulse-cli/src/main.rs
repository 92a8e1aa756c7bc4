mod snapshots;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "postpulse-cli")]
#[command(about = "Post performance snapshot command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Generate, inspect, and preview performance snapshots.
    Snapshots {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity.
    Ping,
    /// Apply pending migrations.
    Migrate,
}

#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    /// Recompute and replace a user's snapshot set.
    Regenerate {
        #[arg(long)]
        user: String,
        /// Trailing window in days (defaults to `POSTPULSE_SNAPSHOT_WINDOW_DAYS`).
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print stored snapshots, newest first.
    List {
        #[arg(long)]
        user: String,
        /// `gold`, `negative`, or `normal`.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Score a JSON export offline without touching the database.
    Preview {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("postpulse-cli: try `postpulse-cli --help`");
        return Ok(());
    };

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let (_, pool) = connect().await?;
            postpulse_db::ping(&pool).await?;
            println!("database reachable");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let (_, pool) = connect().await?;
            let applied = postpulse_db::run_migrations(&pool).await?;
            println!("migrations up to date ({applied} applied)");
        }
        Commands::Snapshots {
            command:
                SnapshotCommands::Regenerate {
                    user,
                    days,
                    dry_run,
                },
        } => {
            let (config, pool) = connect().await?;
            snapshots::run_regenerate(pool, &config, &user, days, dry_run).await?;
        }
        Commands::Snapshots {
            command: SnapshotCommands::List {
                user,
                status,
                limit,
            },
        } => {
            let (_, pool) = connect().await?;
            snapshots::run_list(pool, &user, status.as_deref(), limit).await?;
        }
        Commands::Snapshots {
            command: SnapshotCommands::Preview { input, days },
        } => snapshots::run_preview(&input, days).await?,
    }

    Ok(())
}

/// Load config and open the pool. Preview never calls this.
async fn connect() -> anyhow::Result<(postpulse_core::AppConfig, sqlx::PgPool)> {
    let config = postpulse_core::load_app_config()?;
    let pool = postpulse_db::connect_pool(
        &config.database_url,
        postpulse_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    Ok((config, pool))
}

#[cfg(test)]
mod tests;
