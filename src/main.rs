use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repopulse::progress::SyncProgress;
use repopulse::record::SyncStatus;
use repopulse::{Config, RepositoryStore};

#[derive(Parser)]
#[command(name = "repopulse")]
#[command(about = "Repository sync lifecycle client for the contributor health service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a sync for a repository (owner/name)
    Sync {
        /// Repository in owner/name form
        repo: String,

        /// Follow progress until the sync reaches a terminal state
        #[arg(long)]
        watch: bool,
    },

    /// List tracked repositories and their sync state
    List {
        /// Show progress counters and timestamps
        #[arg(long)]
        details: bool,
    },

    /// Stop tracking a repository
    Remove {
        /// Backend-assigned repository id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting repopulse v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    let store = RepositoryStore::new(&config)?;

    let result = match cli.command {
        Commands::Sync { repo, watch } => cmd_sync(&store, &repo, watch).await,
        Commands::List { details } => cmd_list(&store, details).await,
        Commands::Remove { id } => cmd_remove(&store, id).await,
    };

    store.shutdown();
    result
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Request a sync and optionally follow its progress
async fn cmd_sync(store: &RepositoryStore, repo: &str, watch: bool) -> Result<()> {
    let (owner, name) = repo
        .split_once('/')
        .ok_or_else(|| anyhow!("Repository must be in owner/name form, got {:?}", repo))?;

    let record = store.request_sync(owner, name).await?;
    println!(
        "✅ Sync {} for {}",
        record.sync_status.as_str(),
        record.full_name
    );

    if !watch {
        return Ok(());
    }

    let mut updates = store.subscribe_selected();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped watching; the backend sync continues");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }

                let Some(current) = updates.borrow_and_update().clone() else {
                    continue;
                };

                match current.sync_status {
                    SyncStatus::Queued => println!("   {} queued", current.full_name),
                    SyncStatus::Syncing => {
                        let progress = SyncProgress::for_record(&current, Utc::now());
                        println!(
                            "   {} {}% — {}",
                            current.full_name,
                            progress.percent,
                            progress.remaining
                        );
                    }
                    SyncStatus::Synced => {
                        println!("✅ {} synced", current.full_name);
                        break;
                    }
                    SyncStatus::Error => {
                        println!(
                            "❌ {} failed: {}",
                            current.full_name,
                            current.last_error.as_deref().unwrap_or("unknown error")
                        );
                        break;
                    }
                    SyncStatus::Idle => {}
                }
            }
        }
    }

    Ok(())
}

/// Fetch and print the repository snapshot
async fn cmd_list(store: &RepositoryStore, details: bool) -> Result<()> {
    store.refresh(false).await?;

    let repositories = store.list_repositories();
    if repositories.is_empty() {
        println!("No repositories tracked yet. Run 'repopulse sync owner/name' first.");
        return Ok(());
    }

    println!("Tracked repositories ({}):", repositories.len());
    for repo in repositories {
        if details {
            let synced = repo
                .last_synced_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "   [{}] {} — {} ({}/{} items, last synced {})",
                repo.id,
                repo.full_name,
                repo.sync_status.as_str(),
                repo.sync_item_count,
                repo.sync_total_items,
                synced
            );
        } else {
            println!(
                "   [{}] {} — {}",
                repo.id,
                repo.full_name,
                repo.sync_status.as_str()
            );
        }
    }

    Ok(())
}

/// Remove a tracked repository
async fn cmd_remove(store: &RepositoryStore, id: i64) -> Result<()> {
    store.remove_repository(id).await?;
    println!("✅ Repository {} removed", id);
    Ok(())
}
