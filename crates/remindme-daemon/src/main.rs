use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use remindme_core::config::RemindmeConfig;
use remindme_schedule::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

/// RemindMe: class schedule sync with evening reminders and pre-class alarms.
#[derive(Parser)]
#[command(name = "remindme", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the schedule ids the service publishes.
    Ids,

    /// Select a section schedule and the group within it.
    Select {
        /// Schedule id, e.g. UNIV-CS-3-A.
        id: String,

        #[arg(short, long, default_value = "Group 1")]
        group: String,
    },

    /// Re-fetch the selected schedule and the holiday list.
    Sync,

    /// Show today's classes.
    Today,

    /// Show every day of the current week.
    Week,

    /// Show the selection, notification settings and upcoming notifications.
    Status,

    /// Turn evening reminders or pre-class alarms on or off.
    Toggle {
        #[arg(value_enum)]
        category: Category,

        #[arg(value_enum)]
        state: Switch,
    },

    /// Keep notifications scheduled until interrupted.
    Run,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    Notifications,
    Alarms,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("remindme_daemon=info,remindme_notify=info,remindme_schedule=info")
        }))
        .init();

    let cli = Cli::parse();

    // config: --config > REMINDME_CONFIG env > ~/.remindme/remindme.toml
    let config_path = cli
        .config
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("REMINDME_CONFIG").ok());
    let config = RemindmeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        RemindmeConfig::default()
    });

    let kv = open_store(&config);
    let app = commands::App::new(config, kv)?;

    match cli.command {
        Command::Ids => app.list_ids().await,
        Command::Select { id, group } => app.select(&id, &group).await,
        Command::Sync => app.sync().await,
        Command::Today => app.today(),
        Command::Week => app.week(),
        Command::Status => app.status(),
        Command::Toggle { category, state } => {
            let enabled = matches!(state, Switch::On);
            match category {
                Category::Notifications => app.toggle_notifications(enabled).await,
                Category::Alarms => app.toggle_alarms(enabled).await,
            }
        }
        Command::Run => app.run().await,
    }
}

/// SQLite at the configured path, or a process-local store if the file
/// cannot be opened.
fn open_store(config: &RemindmeConfig) -> Arc<dyn KeyValueStore> {
    let path = &config.database.path;
    match SqliteKeyValueStore::open(path) {
        Ok(store) => {
            info!(%path, "opened schedule database");
            Arc::new(store)
        }
        Err(e) => {
            warn!(%path, error = %e, "database unavailable, state will not persist");
            Arc::new(InMemoryKeyValueStore::new())
        }
    }
}
