//! Admin handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ibe_core::{from_minor_units, ProviderName};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Reconciliation list query parameters.
#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    /// Maximum number of items to return (default: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// A captured payment without a reservation.
#[derive(Debug, Serialize)]
pub struct ReconciliationEntry {
    /// Captured payment.
    pub payment_id: String,
    /// Provider holding the money.
    pub provider: ProviderName,
    /// Amount in currency units.
    pub amount: f64,
    /// ISO currency.
    pub currency: String,
    /// Guest email, when the cart had one.
    pub guest_email: Option<String>,
    /// Why the reservation failed.
    pub error: String,
    /// When it failed.
    pub created_at: String,
}

/// Reconciliation list response.
#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    /// Items, newest first.
    pub items: Vec<ReconciliationEntry>,
    /// Number of items returned.
    pub count: usize,
}

/// List captured payments whose reservation failed.
pub async fn list_reconciliation(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
    Query(query): Query<ReconciliationQuery>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let limit = query.limit.clamp(1, 1000);

    let items: Vec<ReconciliationEntry> = state
        .store
        .list_reconciliation(limit)?
        .into_iter()
        .map(|item| ReconciliationEntry {
            payment_id: item.payment_id,
            provider: item.provider,
            amount: from_minor_units(item.amount_minor),
            currency: item.currency,
            guest_email: item.guest_email,
            error: item.error,
            created_at: item.created_at.to_rfc3339(),
        })
        .collect();

    tracing::info!(admin_id = %auth.admin_id, count = items.len(), "Listed reconciliation queue");

    Ok(Json(ReconciliationResponse {
        count: items.len(),
        items,
    }))
}
