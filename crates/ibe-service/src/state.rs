//! Application state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ibe_store::{Store, StoreError};

use crate::booking::BookingOrchestrator;
use crate::config::ServiceConfig;
use crate::email::{Mailer, ResendMailer};
use crate::payment::PaymentService;
use crate::pms::{ApaleoClient, InventorySource, ReservationSystem};
use crate::providers::build_http_client;
use crate::registry::ProviderRegistry;

/// Application state shared across handlers.
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Payment facade over the provider registry.
    pub payments: Arc<PaymentService>,

    /// Confirm-booking flow.
    pub orchestrator: BookingOrchestrator,

    /// Availability and offers lookup.
    pub inventory: Arc<dyn InventorySource>,
}

impl AppState {
    /// Create the production state: real provider adapters, Apaleo and Resend.
    #[must_use]
    pub fn new(config: ServiceConfig, store: Arc<dyn Store>) -> Self {
        let client = build_http_client().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        });

        let registry = Arc::new(ProviderRegistry::new(config.clone(), client.clone()));
        let apaleo = Arc::new(ApaleoClient::new(config.apaleo.clone(), client.clone()));
        let mailer = Arc::new(ResendMailer::new(config.email.clone(), client));

        Self::with_components(config, store, registry, apaleo.clone(), apaleo, mailer)
    }

    /// Assemble state from explicit collaborators.
    #[must_use]
    pub fn with_components(
        config: ServiceConfig,
        store: Arc<dyn Store>,
        registry: Arc<ProviderRegistry>,
        pms: Arc<dyn ReservationSystem>,
        inventory: Arc<dyn InventorySource>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let payments = Arc::new(PaymentService::new(registry, config.currency.clone()));

        if config.sumup_trust_client_status {
            tracing::warn!(
                "SUMUP_TRUST_CLIENT_STATUS enabled - SumUp bookings skip server-side verification"
            );
        }

        let orchestrator = BookingOrchestrator::new(
            Arc::clone(&payments),
            pms,
            mailer,
            Arc::clone(&store),
            config.hotel.clone(),
            config.sumup_trust_client_status,
        );

        Self {
            config,
            store,
            payments,
            orchestrator,
            inventory,
        }
    }
}

/// Drop processed webhook events older than `retention_hours`.
///
/// Returns the number of events removed.
pub fn purge_webhook_events(store: &dyn Store, retention_hours: i64) -> Result<usize, StoreError> {
    let cutoff = Utc::now() - Duration::hours(retention_hours);
    let purged = store.purge_webhook_events(cutoff)?;
    if purged > 0 {
        tracing::info!(purged, retention_hours, "Purged expired webhook events");
    }
    Ok(purged)
}
