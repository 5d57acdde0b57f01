//! PMS request and response types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ibe_core::{from_minor_units, Cart, PersonalData};

use super::PmsError;

/// Channel code the engine books under.
pub const CHANNEL_CODE: &str = "Ibe";

/// Everything needed to create one reservation.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    /// Guest cart.
    pub cart: Cart,
    /// Verified payment; doubles as idempotency key and payment account number.
    pub payment_id: String,
    /// Amount the provider authorised, in minor units.
    pub prepayment_minor: i64,
    /// Currency of the authorised amount.
    pub currency: String,
}

/// Sellable units for one night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAvailability {
    /// The night.
    pub date: NaiveDate,
    /// Sum over all unit groups.
    pub total_sellable_count: i64,
    /// Per room category.
    pub unit_groups: Vec<UnitGroupAvailability>,
}

/// Sellable units of one room category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitGroupAvailability {
    /// Unit group code.
    pub code: String,
    /// Units still sellable.
    pub sellable_count: i64,
}

/// Stay to price.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferQuery {
    /// Arrival date.
    pub arrival: NaiveDate,
    /// Departure date.
    pub departure: NaiveDate,
    /// Number of adults.
    pub adults: u32,
    /// Children's ages, comma separated on the wire.
    #[serde(default, deserialize_with = "comma_list")]
    pub children_ages: Vec<u8>,
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .collect()
}

// ============================================================================
// Apaleo wire types
// ============================================================================

/// OAuth token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

const fn default_expires_in() -> u64 {
    3600
}

/// Money as Apaleo expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Money {
    /// Decimal amount.
    pub amount: f64,
    /// ISO currency.
    pub currency: String,
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street line.
    pub address_line1: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
    /// ISO country code.
    pub country_code: String,
}

/// Booker or primary guest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Postal address.
    pub address: Address,
}

/// Additional guest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestName {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
}

/// Payment account the reservation is guaranteed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccount {
    /// Provider payment id.
    pub account_number: String,
    /// Guest name.
    pub account_holder: String,
    /// Guest email.
    pub payer_email: String,
    /// Always `card`.
    pub payment_method: String,
    /// Always `false`.
    pub is_virtual: bool,
}

/// One night of the stay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlice {
    /// Rate plan id.
    pub rate_plan_id: String,
    /// Gross price of the night.
    pub total_amount: Money,
}

/// Extra service booked with the stay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    /// PMS service code.
    pub service_id: String,
    /// Day the service is delivered.
    pub service_date: NaiveDate,
    /// Gross price.
    pub amount: Money,
}

/// One reservation inside a booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Arrival date.
    pub arrival: NaiveDate,
    /// Departure date.
    pub departure: NaiveDate,
    /// Adults.
    pub adults: u32,
    /// Children's ages.
    pub children_ages: Vec<u8>,
    /// Sales channel.
    pub channel_code: String,
    /// Main guest.
    pub primary_guest: Person,
    /// Fellow travellers.
    pub additional_guests: Vec<GuestName>,
    /// Amount already collected by the payment provider.
    pub pre_payment_amount: Money,
    /// Always `CreditCard`.
    pub guarantee_type: String,
    /// Per-night prices.
    pub time_slices: Vec<TimeSlice>,
    /// Selected extras.
    pub services: Vec<ServiceItem>,
    /// Free text for the front desk.
    pub guest_comment: String,
}

/// Body of `POST /booking/v1/bookings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    /// Payment account.
    pub payment_account: PaymentAccount,
    /// Person making the booking.
    pub booker: Person,
    /// Reservations, always exactly one.
    pub reservations: Vec<Reservation>,
}

/// Response of `POST /booking/v1/bookings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookingCreated {
    pub id: String,
    #[serde(default)]
    pub reservation_ids: Vec<ReservationId>,
    #[serde(default)]
    pub reservation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReservationId {
    pub id: String,
}

impl BookingCreated {
    /// Reservation number shown to the guest.
    pub fn reservation_number(&self) -> String {
        self.reservation_ids
            .first()
            .map(|r| r.id.clone())
            .or_else(|| self.reservation_id.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Response of `GET /availability/v1/unit-groups`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailabilityResponse {
    #[serde(default)]
    pub time_slices: Vec<AvailabilitySlice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailabilitySlice {
    pub from: String,
    #[serde(default)]
    pub unit_groups: Vec<UnitGroupSlice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnitGroupSlice {
    pub unit_group: UnitGroupRef,
    #[serde(default)]
    pub sellable_count: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnitGroupRef {
    pub code: String,
}

impl AvailabilitySlice {
    /// Aggregate one slice into a per-night summary.
    pub fn summarize(&self) -> Result<DailyAvailability, PmsError> {
        let date = self
            .from
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| PmsError::InvalidResponse(format!("bad slice date: {}", self.from)))?;

        let unit_groups: Vec<UnitGroupAvailability> = self
            .unit_groups
            .iter()
            .map(|g| UnitGroupAvailability {
                code: g.unit_group.code.clone(),
                sellable_count: g.sellable_count,
            })
            .collect();

        Ok(DailyAvailability {
            date,
            total_sellable_count: unit_groups.iter().map(|g| g.sellable_count).sum(),
            unit_groups,
        })
    }
}

// ============================================================================
// Payload construction
// ============================================================================

fn address(personal: &PersonalData) -> Address {
    Address {
        address_line1: personal.street.clone(),
        postal_code: personal.zip_code.clone(),
        city: personal.city.clone().unwrap_or_default(),
        country_code: personal.country_code().to_string(),
    }
}

fn person(personal: &PersonalData) -> Person {
    Person {
        first_name: personal.first_name.clone(),
        last_name: personal.last_name.clone(),
        email: personal.email.clone(),
        address: address(personal),
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Front-desk comment listing the offer, extras and guest remarks.
#[must_use]
pub fn guest_comment(cart: &Cart) -> String {
    let mut comment = String::from("Online booking via IBE\n");

    if let Some(offer) = &cart.offer {
        comment.push_str(&format!("Selected offer: {}\n", offer.title));
    }

    let services: Vec<_> = cart.selected_services().collect();
    if !services.is_empty() {
        comment.push_str("\nSelected additional services:\n");
        for service in services {
            comment.push_str(&format!(
                "- {} ({:.2}€, {}% MwSt)\n",
                service.name, service.price, service.vat
            ));
        }
    }

    if let Some(remarks) = cart
        .personal_data
        .as_ref()
        .and_then(|p| p.comments.as_deref())
        .filter(|c| !c.trim().is_empty())
    {
        comment.push_str("\nGuest comments:\n");
        comment.push_str(remarks);
    }

    comment
}

/// Build the Apaleo booking body for a verified payment.
///
/// # Errors
///
/// Returns `PmsError::InvalidRequest` if the cart lacks guest, stay or rate
/// plan data.
#[allow(clippy::cast_precision_loss)]
pub fn booking_payload(request: &ReservationRequest) -> Result<BookingPayload, PmsError> {
    let cart = &request.cart;
    let personal = cart
        .personal()
        .map_err(|e| PmsError::InvalidRequest(e.to_string()))?;
    let search = cart
        .search()
        .map_err(|e| PmsError::InvalidRequest(e.to_string()))?;
    let rate_plan = cart
        .rate_plan
        .as_ref()
        .ok_or_else(|| PmsError::InvalidRequest("rate plan is required".into()))?;

    let nights = search.nights();
    if nights < 1 {
        return Err(PmsError::InvalidRequest(
            "departure must be after arrival".into(),
        ));
    }

    let money = |amount: f64| Money {
        amount: round_cents(amount),
        currency: request.currency.clone(),
    };

    let per_night = cart.calculated_amounts.total.gross / nights as f64;
    let time_slices = (0..nights)
        .map(|_| TimeSlice {
            rate_plan_id: rate_plan.long_rate_plan.clone(),
            total_amount: money(per_night),
        })
        .collect();

    let services = cart
        .selected_services()
        .map(|s| ServiceItem {
            service_id: s.code.clone(),
            service_date: search.start_date,
            amount: money(s.price),
        })
        .collect();

    let reservation = Reservation {
        arrival: search.start_date,
        departure: search.end_date,
        adults: search.adults,
        children_ages: search.children_ages.clone(),
        channel_code: CHANNEL_CODE.into(),
        primary_guest: person(personal),
        additional_guests: personal
            .additional_guests
            .iter()
            .map(|g| GuestName {
                first_name: g.first_name.clone(),
                last_name: g.last_name.clone(),
            })
            .collect(),
        pre_payment_amount: money(from_minor_units(request.prepayment_minor)),
        guarantee_type: "CreditCard".into(),
        time_slices,
        services,
        guest_comment: guest_comment(cart),
    };

    Ok(BookingPayload {
        payment_account: PaymentAccount {
            account_number: request.payment_id.clone(),
            account_holder: personal.full_name(),
            payer_email: personal.email.clone(),
            payment_method: "card".into(),
            is_virtual: false,
        },
        booker: person(personal),
        reservations: vec![reservation],
    })
}
