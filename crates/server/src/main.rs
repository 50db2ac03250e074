use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfword_core::{load_config_or_default, validate_config, SofficeTranscoder, Transcoder};
use pdfword_server::api::create_router;
use pdfword_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PDFWORD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Upload directory: {:?}", config.storage.upload_dir);
    info!("Output directory: {:?}", config.storage.output_dir);
    for dir in [&config.storage.upload_dir, &config.storage.output_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let transcoder: Arc<dyn Transcoder> =
        Arc::new(SofficeTranscoder::new(config.transcoder.clone()));

    // Check the converter without delaying startup
    let checker = Arc::clone(&transcoder);
    tokio::spawn(async move {
        match checker.validate().await {
            Ok(()) => info!("Transcoder {} is available", checker.name()),
            Err(e) => warn!("Transcoder not available, conversions will fail: {}", e),
        }
    });

    let state = Arc::new(AppState::new(config.clone(), transcoder));

    // Background housekeeping
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let housekeeping_handle = if config.storage.cleanup_interval_secs > 0 {
        Some(state.housekeeper().spawn_periodic(
            Duration::from_secs(config.storage.cleanup_interval_secs),
            shutdown_tx.subscribe(),
        ))
    } else {
        info!("Periodic cleanup disabled");
        None
    };

    let orchestrator = state.orchestrator();
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    orchestrator.stop().await;
    info!("Orchestrator stopped");

    let _ = shutdown_tx.send(());
    if let Some(handle) = housekeeping_handle {
        let _ = handle.await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
