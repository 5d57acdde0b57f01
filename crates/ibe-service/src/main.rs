//! IBE Service - HTTP API for the hotel booking engine
//!
//! This is the main entry point for the ibe service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ibe_service::state::purge_webhook_events;
use ibe_service::{create_router, AppState, ServiceConfig};
use ibe_store::Store;

/// How often expired webhook events are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ibe=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting IBE Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        payment_provider = %config.payment_provider,
        currency = %config.currency,
        apaleo_configured = %config.apaleo.client_id.is_some(),
        email_configured = %config.email.resend_api_key.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    // Purge expired webhook events in the background
    let purge_store = Arc::clone(&store);
    let retention_hours = config.webhook_event_retention_hours;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = purge_webhook_events(purge_store.as_ref(), retention_hours) {
                tracing::warn!(error = %e, "Failed to purge webhook events");
            }
        }
    });

    // Build app state
    let state = AppState::new(config.clone(), store);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(ibe_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
#[allow(clippy::unnecessary_wraps)]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::warn!(
        data_dir = %config.data_dir,
        "Built without rocksdb-backend, using in-memory store"
    );
    Ok(Arc::new(ibe_store::MemoryStore::new()))
}
