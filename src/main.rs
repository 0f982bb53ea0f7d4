use std::sync::Arc;

use ambulance_dispatch::api;
use ambulance_dispatch::config::Config;
use ambulance_dispatch::engine::poller::run_dispatch_board;
use ambulance_dispatch::error::AppError;
use ambulance_dispatch::notify::LogNotifier;
use ambulance_dispatch::state::AppState;
use ambulance_dispatch::store::storage::{FileStorage, MemoryStorage, Storage};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    let storage: Arc<dyn Storage> = match &config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "using file storage");
            Arc::new(FileStorage::open(dir).await?)
        }
        None => {
            tracing::warn!("DATA_DIR not set; bookings and users are kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    let (app_state, store_actor) = AppState::new(
        storage,
        Arc::new(LogNotifier),
        config.store_queue_size,
        config.sos_search_limit,
    );
    let shared_state = Arc::new(app_state);

    tokio::spawn(store_actor.run());
    tokio::spawn(run_dispatch_board(
        shared_state.bookings.clone(),
        shared_state.metrics.clone(),
        config.poll_interval,
    ));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
