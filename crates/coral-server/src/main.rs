//! # Coral Server
//!
//! Main entry point for the Coral application: loads configuration,
//! selects the cache backend, wires the session store and middleware, and
//! serves the HTTP API until shutdown.

use coral_cache::{BlockingPool, Memoizer};
use coral_config::ConfigLoader;
use coral_core::{CoralError, CoralResult};
use coral_rest::middleware::SessionLayerState;
use coral_rest::{create_router, AppState};
use coral_session::SessionStore;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod di;
mod startup;

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting Coral Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> CoralResult<()> {
    // Load configuration
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    info!("Environment: {}", config.app.environment);
    info!("Cache backend: {}", config.cache.backend);

    startup::print_banner();

    // Build the process-wide cache backend, selected once at startup
    let cache = di::build_cache(&config)?;

    // Memoizer shares the backend with everything else
    let blocking_pool = BlockingPool::new(config.worker.blocking_pool_size);
    let memoizer = Memoizer::new(cache.clone(), blocking_pool);
    let app_state = AppState::new(cache.clone(), memoizer);

    // Session store rides on the same backend, namespaced by cookie name
    let session_state = config.session.enabled.then(|| {
        SessionLayerState::new(
            SessionStore::new(cache.clone(), config.session.cookie_name.clone()),
            Arc::new(config.session.clone()),
        )
    });

    let router = create_router(app_state, session_state, &config.server);

    let addr = config.server.addr();
    info!("Starting HTTP server on http://{}", addr);
    startup::print_startup_info(config.server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CoralError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoralError::internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coral=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
