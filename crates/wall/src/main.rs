//! `wall` - turns emailed posts into a shared wall.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wall::{AcceptAll, AppState, WallConfig};
use wall_core::schedule::block_title;
use wall_core::{FsMediaStore, Ingestor, SqliteStore, Store};

/// Webhook server for emailed posts.
#[derive(Parser, Debug)]
#[command(name = "wall", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "wall.toml")]
    config: PathBuf,

    /// Override the bind address.
    #[arg(long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
    /// Register a user allowed to post by email.
    AddUser {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Address the user sends from.
        #[arg(long)]
        email: String,
    },
    /// Create the first block. Ingestion refuses to run without one.
    SeedBlock {
        /// Block start as RFC 3339; defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Block title; defaults to the start date.
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wall=info,wall_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = WallConfig::load(&cli.config)?;
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }

    let store = open_store(&config.database.resolved_path()).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, store).await,
        Commands::Migrate => {
            // Opening the store already migrated it.
            info!("Database is up to date");
            Ok(())
        }
        Commands::AddUser { name, email } => {
            let id = store.add_user(&name, &email).await?;
            info!(user_id = %id, %name, %email, "Added user");
            Ok(())
        }
        Commands::SeedBlock { at, title } => {
            let at = at.unwrap_or_else(Utc::now);
            let title = title.unwrap_or_else(|| block_title(at));
            let id = store.create_block(&title, at).await?;
            info!(block_id = %id, %title, created_at = %at, "Seeded block");
            Ok(())
        }
    }
}

async fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    info!(path = %path.display(), "Opening database");
    let store = SqliteStore::open(&path.to_string_lossy())
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(store)
}

async fn serve(config: WallConfig, store: SqliteStore) -> anyhow::Result<()> {
    let schedule = config.schedule.to_schedule()?;
    let media = FsMediaStore::new(&config.media.dir);
    let ingestor = Ingestor::new(Arc::new(store), Arc::new(media), schedule);

    let state = AppState::new(ingestor, Arc::new(AcceptAll), config.server.max_body_bytes);
    let app = wall::router(state, &config.media.dir);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.addr))?;
    info!(
        address = %config.server.addr,
        frequency = %schedule.frequency(),
        release_offset = %schedule.release_offset(),
        "wall listening"
    );

    wall::serve(listener, app, config.server.shutdown_file).await?;

    info!("wall shut down");
    Ok(())
}
