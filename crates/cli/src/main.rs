//! SimpleQ CLI - push messages, run workers, inspect stats

mod echo;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use echo::EchoTask;
use serde_json::json;
use simpleq_core::application::queue::constants::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT, DEFAULT_WORKERS,
};
use simpleq_core::application::StatsSummary;
use simpleq_core::{Message, Queue, QueueConfig, QueueError, QueueServices, StatsService};
use simpleq_infra_sqlite::{create_pool, run_migrations, SqliteDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::{info, warn};

const DEFAULT_DB_PATH: &str = "~/.simpleq/queue.db";

#[derive(Parser)]
#[command(name = "simpleq")]
#[command(about = "SimpleQ at-least-once work queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, env = "SIMPLEQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Log format: pretty or json
    #[arg(long, env = "SIMPLEQ_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Also write daily-rotated JSON logs into this directory
    #[arg(long, env = "SIMPLEQ_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a JSON payload onto a queue
    Push {
        /// Queue name
        #[arg(short, long, default_value = "default")]
        queue: String,

        /// Payload as JSON string
        #[arg(long)]
        payload: String,

        /// How many times the message may be requeued
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,
    },

    /// Show processed/failed counters of every registered queue
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Poll a queue with the echo task until Ctrl+C
    Work {
        /// Queue name
        #[arg(short, long, default_value = "default")]
        queue: String,

        /// Number of concurrent poll loops
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Delay between poll-cycles, in milliseconds
        #[arg(long, env = "SIMPLEQ_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
        poll_interval_ms: u64,

        /// How long to wait for in-flight messages on shutdown, in seconds
        #[arg(long, env = "SIMPLEQ_STOP_TIMEOUT_SECS", default_value_t = DEFAULT_STOP_TIMEOUT.as_secs())]
        stop_timeout_secs: u64,
    },
}

#[derive(Tabled)]
struct StatRow {
    queue: String,
    processed: i64,
    failed: usize,
    failed_ids: String,
}

async fn open_driver(db_path: &str) -> Result<Arc<SqliteDriver>> {
    let db_path = shellexpand::tilde(db_path).into_owned();

    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    info!(db_path = %db_path, "Opening database");

    let pool = create_pool(&db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    Ok(Arc::new(SqliteDriver::new(pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_format, cli.log_dir.as_deref())?;

    let driver = open_driver(&cli.db_path).await?;

    match cli.command {
        Commands::Push {
            queue,
            payload,
            max_attempts,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("Invalid JSON payload")?;

            let queue = Queue::register(
                QueueConfig::new(queue, DEFAULT_WORKERS),
                QueueServices::with_driver(driver),
            )
            .await
            .context("Failed to register queue")?;

            let mut message = Message::from_json(&payload, max_attempts)?;
            let id = queue.push(&mut message).await.context("Push failed")?;

            println!("{}", id);
        }

        Commands::Stats { json } => {
            let stats = StatsService::new(driver)
                .collect()
                .await
                .context("Failed to read stats")?;

            if json {
                let summary = StatsSummary::from_stats(&stats);
                let out = json!({ "queues": stats, "summary": summary });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if stats.is_empty() {
                println!("{}", "No queues registered".yellow());
            } else {
                let rows: Vec<StatRow> = stats
                    .into_iter()
                    .map(|(queue, stat)| StatRow {
                        queue,
                        processed: stat.processed,
                        failed: stat.failed,
                        failed_ids: stat.failed_ids.join(", "),
                    })
                    .collect();

                println!("{}", "Queue Stats".cyan().bold());
                println!();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Work {
            queue,
            workers,
            poll_interval_ms,
            stop_timeout_secs,
        } => {
            let config = QueueConfig::new(queue, workers)
                .with_poll_interval(Duration::from_millis(poll_interval_ms));

            let queue = Queue::register(config, QueueServices::with_driver(driver))
                .await
                .context("Failed to register queue")?;

            queue.start_polling(Arc::new(EchoTask::new(queue.clone())))?;

            println!(
                "{} {} ({} worker(s))",
                "Polling".green().bold(),
                queue.name(),
                queue.workers()
            );
            println!("Press Ctrl+C to stop");

            tokio::signal::ctrl_c().await?;

            info!("Shutdown signal received, stopping queue...");

            match queue.stop(Duration::from_secs(stop_timeout_secs)).await {
                Ok(()) => {}
                Err(QueueError::StopTimeout(waited)) => {
                    warn!(?waited, "Poll loops still busy, exiting anyway");
                }
                Err(e) => return Err(e.into()),
            }

            if queue.poisoned_count() > 0 {
                warn!(
                    dropped = queue.poisoned_count(),
                    "Undecodable messages were dropped"
                );
            }

            info!("Shutdown complete.");
        }
    }

    Ok(())
}
