//! ProdRec Engine
//!
//! Serves similar-product recommendations from flat-file artifacts.
//!
//! # Startup
//!
//! - Load configuration from the environment (`.env` honoured)
//! - Load products, customers, reviews and the similarity matrix
//! - Load the mock account list
//! - Serve the REST API until SIGTERM or SIGINT

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prodrec::api::{self, AppState};
use prodrec::{Catalog, Config, Error, Recommender, Result, SessionStore, StaticCredentials};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  🛍️  ProdRec Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    let config = Config::from_env()?;
    info!("✅ Configuration loaded and validated");

    // File I/O and parsing are blocking; keep them off the async workers.
    let data_config = config.data.clone();
    let catalog = tokio::task::spawn_blocking(move || Catalog::load(&data_config))
        .await
        .map_err(Error::internal)??;
    info!(
        "✅ Catalog ready: {} products, {}x{} similarity matrix",
        catalog.products().len(),
        catalog.matrix().dim(),
        catalog.matrix().dim()
    );

    let authenticator = StaticCredentials::load(&config.auth.credentials_file)?;
    info!("✅ Mock authenticator ready");

    let recommender = Recommender::new(Arc::new(catalog))
        .with_slow_query_threshold(config.recommendation.slow_query_threshold);

    let state = Arc::new(AppState {
        recommender,
        sessions: SessionStore::new(config.auth.session_ttl)?,
        authenticator: Arc::new(authenticator),
        settings: config.recommendation.clone(),
    });

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let purger = spawn_session_purger(state.clone(), config.auth.session_ttl, &shutdown_tx);

    let mut server_shutdown = shutdown_tx.subscribe();
    let api_config = config.api.clone();
    let server_state = state.clone();
    let server = tokio::spawn(async move {
        let shutdown = async move {
            let _ = server_shutdown.recv().await;
        };
        if let Err(e) = api::start_server(server_state, &api_config, shutdown).await {
            error!("API server error: {:?}", e);
        }
    });

    info!("═══════════════════════════════════════════════════════════════");
    info!("  📡 API: http://{}:{}", config.api.host, config.api.port);
    info!(
        "  🔗 Health: http://{}:{}/health",
        config.api.host, config.api.port
    );
    info!("═══════════════════════════════════════════════════════════════");

    tokio::select! {
        _ = shutdown_signal() => {
            info!("📴 Shutdown signal received");
        }
        _ = wait_for_exit(&server) => {
            warn!("⚠️ API server stopped unexpectedly, initiating shutdown");
        }
    }

    info!("🛑 Initiating graceful shutdown...");
    let _ = shutdown_tx.send(());

    let shutdown_timeout = Duration::from_secs(30);
    if tokio::time::timeout(shutdown_timeout, async {
        let _ = server.await;
        let _ = purger.await;
    })
    .await
    .is_err()
    {
        warn!("⚠️ Shutdown timeout exceeded, forcing exit");
    }

    info!("👋 ProdRec Engine stopped gracefully");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prodrec=debug,prodrec_engine=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .init();
}

/// Periodically drop expired login sessions
fn spawn_session_purger(
    state: Arc<AppState>,
    session_ttl: Duration,
    shutdown: &broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let mut shutdown_rx = shutdown.subscribe();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(session_ttl.max(Duration::from_secs(60)));
        // Skip first tick (runs immediately otherwise)
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = state.sessions.purge_expired().await;
                    if purged > 0 {
                        info!("🧹 Purged {} expired sessions", purged);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Session purger shutting down");
                    break;
                }
            }
        }
    })
}

/// Resolve once the task has finished
async fn wait_for_exit(handle: &tokio::task::JoinHandle<()>) {
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
