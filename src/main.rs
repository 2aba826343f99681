use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use popotte::config::{self, AppConfig, StoreBackend};
use popotte::events::{self, EventSender};
use popotte::store::{self, fixtures, DatabaseStore, LocalStore};
use popotte::{db, handlers, AppState};

#[derive(Parser)]
#[command(name = "popotte", about = "Popotte ordering and debt ledger", version)]
struct Cli {
    /// Directory holding default.toml and the per-environment files
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Load the fixture catalog into an empty store and exit
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config_from(&cli.config_dir).context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cfg).await,
        Commands::Migrate => migrate(&cfg).await,
        Commands::Seed => seed(&cfg).await,
    }
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    handlers::health::init_start_time();

    let store = store::open_store(&cfg).await.context("opening store")?;

    let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));

    let addr: SocketAddr = cfg
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.bind_address()))?;
    let state = AppState::new(store, cfg, Some(Arc::new(event_sender)));
    let app = handlers::app_router(state);

    info!("popotte listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn migrate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.backend != StoreBackend::Database {
        warn!(backend = %cfg.backend, "Migrations only apply to the database backend");
        return Ok(());
    }
    let pool = db::establish_connection_from_app_config(cfg).await?;
    db::run_migrations(&pool).await?;
    Ok(())
}

async fn seed(cfg: &AppConfig) -> anyhow::Result<()> {
    match cfg.backend {
        StoreBackend::Database => {
            let pool = db::establish_connection_from_app_config(cfg).await?;
            db::run_migrations(&pool).await?;
            let seeded = DatabaseStore::new(pool)
                .seed_if_empty(&fixtures::dataset())
                .await?;
            if !seeded {
                warn!("Database already holds data; nothing seeded");
            }
        }
        StoreBackend::Local => {
            // A missing file is created from the fixtures; an existing one is kept.
            LocalStore::open(&cfg.local_store_path, fixtures::dataset).await?;
            info!(path = %cfg.local_store_path.display(), "Local store ready");
        }
        StoreBackend::Memory => {
            warn!("The memory backend is seeded at startup; nothing to do");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
