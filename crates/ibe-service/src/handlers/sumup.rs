//! `SumUp` hosted-checkout return handler.
//!
//! `SumUp` sends the guest back here after the hosted payment page. The
//! checkout is re-read server-side so the confirmation page receives the
//! status `SumUp` reports, not whatever the query string claims.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use reqwest::Url;
use serde::Deserialize;

use crate::state::AppState;

/// Query parameters on the return redirect.
#[derive(Debug, Deserialize)]
pub struct SumUpReturnQuery {
    /// Checkout id.
    pub checkout_id: Option<String>,
    /// Checkout id, as some redirects name it.
    pub id: Option<String>,
}

/// Redirect the guest to the confirmation page with the verified status.
pub async fn sumup_return(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SumUpReturnQuery>,
) -> Redirect {
    let site = state.config.public_site_url.trim_end_matches('/');

    let Some(checkout_id) = query
        .checkout_id
        .or(query.id)
        .filter(|id| !id.trim().is_empty())
    else {
        tracing::warn!("SumUp return without checkout id");
        return redirect(site, "booking-failed", &[("error", "missing_checkout_id")]);
    };

    match state
        .payments
        .get_payment_status(&checkout_id, Some("sumup"))
        .await
    {
        Ok(status) => {
            tracing::info!(
                checkout_id = %checkout_id,
                status = %status.status,
                "SumUp guest returned"
            );
            redirect(
                site,
                "booking-confirmation",
                &[
                    ("payment_provider", "sumup"),
                    ("status", status.status.as_str()),
                    ("checkout_id", checkout_id.as_str()),
                ],
            )
        }
        Err(e) => {
            tracing::error!(checkout_id = %checkout_id, error = %e, "SumUp checkout lookup failed");
            redirect(site, "booking-failed", &[("error", "verification_failed")])
        }
    }
}

fn redirect(site: &str, page: &str, params: &[(&str, &str)]) -> Redirect {
    let target = format!("{site}/{page}");
    match Url::parse(&target) {
        Ok(mut url) => {
            url.query_pairs_mut().extend_pairs(params);
            Redirect::to(url.as_str())
        }
        Err(e) => {
            tracing::error!(url = %target, error = %e, "Invalid PUBLIC_SITE_URL");
            Redirect::to(&format!("/{page}"))
        }
    }
}
