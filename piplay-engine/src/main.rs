//! piplay - search and playback service
//!
//! Serves catalog search, result selection and playlist playback over HTTP,
//! driving a single external player process.

use anyhow::{Context, Result};
use clap::Parser;
use piplay_common::config::load_config;
use piplay_common::db::init_database;
use piplay_engine::{build_router, AppState, Engine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "piplay")]
#[command(about = "Music search and playback service")]
#[command(version)]
struct Args {
    /// Address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// HTTP port, overrides the config file
    #[arg(short, long, env = "PIPLAY_PORT")]
    port: Option<u16>,

    /// Config file (TOML)
    #[arg(short, long, env = "PIPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Playlist database file, overrides the config file
    #[arg(short, long, env = "PIPLAY_DB")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "piplay_engine=info,piplay_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting piplay v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = Some(database);
    }

    let db_path = config.database.resolved_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open playlist database")?;

    info!(
        "Catalog: {} (limit {}), player: {} {:?}",
        config.catalog.base_url,
        config.catalog.search_limit,
        config.player.program,
        config.player.args
    );

    let engine = Arc::new(Engine::from_config(&config, pool).context("Failed to build engine")?);
    let app = build_router(AppState::new(Arc::clone(&engine)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("piplay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Leave no player running behind us
    if let Err(e) = engine.stop_playback().await {
        warn!("Failed to stop playback on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
