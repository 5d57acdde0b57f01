//! Availability and offer lookups against the PMS.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::pms::{DailyAvailability, OfferQuery};
use crate::state::AppState;

/// Longest range one availability query may span.
const MAX_AVAILABILITY_DAYS: i64 = 366;

/// Availability query parameters.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// First night.
    pub from: NaiveDate,
    /// Last night.
    pub to: NaiveDate,
}

/// Availability response.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Sellable units per night.
    pub availability: Vec<DailyAvailability>,
}

/// Sellable units per night.
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if query.to < query.from {
        return Err(ApiError::BadRequest("`to` must not be before `from`".into()));
    }
    if (query.to - query.from).num_days() > MAX_AVAILABILITY_DAYS {
        return Err(ApiError::BadRequest(format!(
            "range must not exceed {MAX_AVAILABILITY_DAYS} days"
        )));
    }

    let availability = state.inventory.availability(query.from, query.to).await?;
    Ok(Json(AvailabilityResponse { availability }))
}

/// Offers response.
#[derive(Debug, Serialize)]
pub struct OffersResponse {
    /// Offers as returned by the PMS.
    pub offers: Vec<serde_json::Value>,
}

/// Bookable offers for a stay. Any failure answers an empty list.
pub async fn get_offers(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OfferQuery>, QueryRejection>,
) -> Json<OffersResponse> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            tracing::warn!(error = %e.body_text(), "Invalid offers query");
            return Json(OffersResponse { offers: Vec::new() });
        }
    };

    if query.departure <= query.arrival || query.adults == 0 {
        tracing::warn!(
            arrival = %query.arrival,
            departure = %query.departure,
            adults = query.adults,
            "Offers query without a bookable stay"
        );
        return Json(OffersResponse { offers: Vec::new() });
    }

    match state.inventory.offers(&query).await {
        Ok(offers) => Json(OffersResponse { offers }),
        Err(e) => {
            tracing::error!(error = %e, "Offers lookup failed");
            Json(OffersResponse { offers: Vec::new() })
        }
    }
}
