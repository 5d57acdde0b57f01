//! Payment provider report.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use ibe_core::{Capabilities, ProviderName};

use crate::state::AppState;

/// One provider's entry in the report.
#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    /// Provider name.
    pub name: ProviderName,
    /// Whether its credentials are present.
    pub configured: bool,
    /// Feature flags.
    pub capabilities: Capabilities,
    /// Payment methods it accepts.
    pub payment_methods: Vec<&'static str>,
}

/// Provider report.
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    /// Provider used when a request names none.
    pub active: ProviderName,
    /// Every provider the service can talk to.
    pub supported: Vec<ProviderName>,
    /// Per-provider details.
    pub providers: Vec<ProviderInfo>,
}

/// Report the active provider and what each provider can do.
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let registry = state.payments.registry();

    let providers = ProviderName::ALL
        .iter()
        .map(|&name| {
            let adapter = registry.provider(name);
            ProviderInfo {
                name,
                configured: adapter.is_configured(),
                capabilities: name.capabilities(),
                payment_methods: adapter.supported_methods().to_vec(),
            }
        })
        .collect();

    Json(ProvidersResponse {
        active: registry.active(),
        supported: ProviderName::ALL.to_vec(),
        providers,
    })
}
