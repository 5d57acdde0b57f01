//! Apaleo API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;

use ibe_core::BookingResult;

use super::types::{
    booking_payload, AvailabilityResponse, AvailabilitySlice, BookingCreated, TokenResponse,
    CHANNEL_CODE,
};
use super::{
    DailyAvailability, InventorySource, OfferQuery, PmsError, ReservationRequest,
    ReservationSystem,
};
use crate::config::ApaleoConfig;

/// Refresh the token this long before Apaleo says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Apaleo client for bookings, availability and offers.
pub struct ApaleoClient {
    client: Client,
    config: ApaleoConfig,
    token: RwLock<Option<CachedToken>>,
}

impl ApaleoClient {
    /// Create a new Apaleo client.
    #[must_use]
    pub fn new(config: ApaleoConfig, client: Client) -> Self {
        if config.client_id.is_none() || config.client_secret.is_none() {
            tracing::warn!("Apaleo credentials not configured - bookings will fail");
        }
        Self {
            client,
            config,
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn property_id(&self) -> Result<&str, PmsError> {
        self.config
            .property_id
            .as_deref()
            .ok_or_else(|| PmsError::NotConfigured("APALEO_PROPERTY_ID is not set".into()))
    }

    /// Get a bearer token, reusing the cached one until shortly before expiry.
    async fn access_token(&self) -> Result<String, PmsError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let (Some(client_id), Some(client_secret)) = (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) else {
            return Err(PmsError::NotConfigured(
                "APALEO_CLIENT_ID / APALEO_CLIENT_SECRET are not set".into(),
            ));
        };

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!(endpoint = %self.config.token_endpoint, "Fetching Apaleo token");

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Apaleo token request failed");
            return Err(PmsError::Auth(format!("{status} {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PmsError::Auth(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    /// Turn a non-success response into `PmsError::Api`.
    async fn api_error(response: reqwest::Response) -> PmsError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("messages")
                    .and_then(|m| m.as_array())
                    .map(|m| {
                        m.iter()
                            .filter_map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join("; ")
                    })
                    .or_else(|| v.get("message").and_then(|m| m.as_str()).map(String::from))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));

        PmsError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ReservationSystem for ApaleoClient {
    async fn create_booking(
        &self,
        request: &ReservationRequest,
    ) -> Result<BookingResult, PmsError> {
        let payload = booking_payload(request)?;
        let token = self.access_token().await?;

        tracing::info!(
            payment_id = %request.payment_id,
            nights = payload.reservations[0].time_slices.len(),
            "Creating Apaleo booking"
        );

        let response = self
            .client
            .post(self.url("booking/v1/bookings"))
            .bearer_auth(token)
            .header("Idempotency-Key", &request.payment_id)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::api_error(response).await;
            tracing::error!(payment_id = %request.payment_id, error = %err, "Apaleo booking failed");
            return Err(err);
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PmsError::InvalidResponse(e.to_string()))?;
        let created: BookingCreated = serde_json::from_value(raw.clone())
            .map_err(|e| PmsError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            payment_id = %request.payment_id,
            booking_id = %created.id,
            "Apaleo booking created"
        );

        Ok(BookingResult {
            reservation_number: created.reservation_number(),
            booking_id: created.id,
            raw,
        })
    }
}

#[async_trait]
impl InventorySource for ApaleoClient {
    async fn availability(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAvailability>, PmsError> {
        let property_id = self.property_id()?;
        let token = self.access_token().await?;

        let response = self
            .client
            .get(self.url("availability/v1/unit-groups"))
            .bearer_auth(token)
            .query(&[
                ("propertyId", property_id.to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| PmsError::InvalidResponse(e.to_string()))?;

        body.time_slices
            .iter()
            .map(AvailabilitySlice::summarize)
            .collect()
    }

    async fn offers(&self, query: &OfferQuery) -> Result<Vec<serde_json::Value>, PmsError> {
        let property_id = self.property_id()?;
        let token = self.access_token().await?;

        let mut params = vec![
            ("propertyId", property_id.to_string()),
            ("arrival", query.arrival.to_string()),
            ("departure", query.departure.to_string()),
            ("adults", query.adults.to_string()),
            ("channelCode", CHANNEL_CODE.to_string()),
        ];
        if !query.children_ages.is_empty() {
            let ages: Vec<String> = query.children_ages.iter().map(ToString::to_string).collect();
            params.push(("childrenAges", ages.join(",")));
        }

        let response = self
            .client
            .get(self.url("booking/v1/offers"))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        // Apaleo answers 204 when nothing is bookable
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PmsError::InvalidResponse(e.to_string()))?;

        Ok(body
            .get("offers")
            .and_then(|o| o.as_array())
            .cloned()
            .unwrap_or_default())
    }
}
