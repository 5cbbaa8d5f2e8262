// Command-line client for inspecting and driving a user's local store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use healss_sync::local_db::LocalDatabase;
use healss_sync::remote::RestRemote;
use healss_sync::shared::{
    BackendConfig, ConfigError, EntityType, OperationKind, Record, StorageError, SyncConfig,
};
use healss_sync::storage::UnifiedStorage;
use healss_sync::sync::{Connectivity, NetworkMonitor, PassOutcome};

#[derive(Parser)]
#[command(name = "healss-sync")]
#[command(about = "Local-first workout storage with background sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sync settings (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Work from the local store only
    #[arg(long, global = true)]
    offline: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a record locally and queue it for sync
    Save {
        /// Entity type (activity, ongoing, template, goals, sleep)
        entity: EntityType,

        /// Record as a JSON object
        json: String,

        /// Operation kind
        #[arg(long, default_value = "create")]
        op: OperationKind,
    },

    /// Print the records of an entity type
    Load {
        /// Entity type (activity, ongoing, template, goals, sleep)
        entity: EntityType,
    },

    /// Show queue and connectivity status
    Status,

    /// Run a sync pass now
    Sync,

    /// Drop operations that exhausted their retries
    ClearFailed,
}

#[tokio::main]
async fn main() -> Result<(), StorageError> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "healss_sync=debug"
    } else {
        "healss_sync=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let sync_config = match &cli.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
            SyncConfig::from_toml_str(&source)?
        }
        None => SyncConfig::default(),
    };
    let backend = BackendConfig::from_env()?;

    let db = LocalDatabase::open(&backend.db_path).await?;
    let connectivity = if cli.offline {
        Connectivity::Offline
    } else {
        Connectivity::Online
    };

    let storage = UnifiedStorage::open(
        backend.user_id.clone(),
        sync_config,
        Arc::new(db),
        Arc::new(RestRemote::from_config(&backend)),
        NetworkMonitor::fixed(connectivity),
    )
    .await?;

    match cli.command {
        Commands::Save { entity, json, op } => {
            let record = Record::from_value(serde_json::from_str(&json)?)?;
            let operation_id = storage.save(entity, record, op).await?;
            println!("{}", operation_id);
            report(sync_until_idle(&storage).await);
        }
        Commands::Load { entity } => {
            let records = storage.load(entity).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Status => {
            let status = storage.sync_status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Sync => {
            report(sync_until_idle(&storage).await);
        }
        Commands::ClearFailed => {
            let removed = storage.clear_failed().await?;
            println!("Cleared {} failed operations", removed);
        }
    }

    storage.dispose();
    Ok(())
}

/// Run a pass, waiting out one already started by `save`
async fn sync_until_idle(storage: &UnifiedStorage) -> PassOutcome {
    loop {
        match storage.force_sync_all().await {
            PassOutcome::AlreadyRunning => tokio::time::sleep(Duration::from_millis(100)).await,
            outcome => return outcome,
        }
    }
}

fn report(outcome: PassOutcome) {
    match outcome {
        PassOutcome::Completed(report) => eprintln!(
            "Sync: {} attempted, {} synced, {} failed",
            report.attempted, report.synced, report.failed
        ),
        PassOutcome::Offline => eprintln!("Offline, operations stay queued"),
        PassOutcome::AlreadyRunning | PassOutcome::Disposed => {}
    }
}
