//! The guest's cart as assembled by the booking wizard.
//!
//! The cart is client-held and arrives unverified. Field names follow the
//! wizard's JSON (camelCase, plus the CMS's German labels for offer data).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::BookingError;
use crate::payment::to_minor_units;

/// Cart handed to checkout and to confirm-booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Guest identity and address.
    pub personal_data: Option<PersonalData>,
    /// Stay dates and occupancy.
    pub search_data: Option<SearchData>,
    /// Price summary computed client-side.
    #[serde(default)]
    pub calculated_amounts: CalculatedAmounts,
    /// Selected rate plan.
    #[serde(default)]
    pub rate_plan: Option<RatePlan>,
    /// Selected offer/bundle.
    #[serde(default)]
    pub offer: Option<Offer>,
}

/// Guest identity and address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalData {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email for the confirmation.
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Street and number.
    #[serde(default)]
    pub street: String,
    /// Postal code.
    #[serde(default)]
    pub zip_code: String,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// ISO country code.
    #[serde(default)]
    pub country: Option<String>,
    /// Free-text guest comments.
    #[serde(default)]
    pub comments: Option<String>,
    /// Fellow travellers.
    #[serde(default)]
    pub additional_guests: Vec<Guest>,
}

impl PersonalData {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Country code, defaulting to Germany.
    #[must_use]
    pub fn country_code(&self) -> &str {
        self.country
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("DE")
    }
}

/// Additional guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Whether the guest is a child.
    #[serde(default)]
    pub is_child: bool,
    /// Age, for children.
    #[serde(default)]
    pub age: Option<u8>,
}

/// Stay dates and occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    /// Arrival date.
    pub start_date: NaiveDate,
    /// Departure date.
    pub end_date: NaiveDate,
    /// Number of adults.
    pub adults: u32,
    /// Ages of travelling children.
    #[serde(default)]
    pub children_ages: Vec<u8>,
}

impl SearchData {
    /// Number of nights between arrival and departure.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Client-computed price summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatedAmounts {
    /// Total price of the stay.
    #[serde(default)]
    pub total: GrossAmount,
    /// Deposit charged at booking time.
    #[serde(default, rename = "deposit", alias = "Anzahlung")]
    pub deposit: GrossAmount,
}

/// A gross amount in currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrossAmount {
    /// Gross value.
    #[serde(default, deserialize_with = "number_or_string")]
    pub gross: f64,
}

/// Selected rate plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePlan {
    /// Fully-qualified PMS rate plan id.
    pub long_rate_plan: String,
}

/// Offer/bundle as published by the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Display title.
    #[serde(rename = "Title", alias = "title")]
    pub title: String,
    /// Bookable extras.
    #[serde(default, rename = "Services", alias = "services")]
    pub services: Vec<OfferService>,
}

/// Bookable extra attached to an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferService {
    /// Display name.
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    /// PMS service code.
    #[serde(rename = "Apaleo_Code", alias = "code")]
    pub code: String,
    /// Standard price in currency units.
    #[serde(
        rename = "Standardpreis",
        alias = "price",
        deserialize_with = "number_or_string"
    )]
    pub price: f64,
    /// VAT rate in percent.
    #[serde(
        default,
        rename = "Steuer",
        alias = "vat",
        deserialize_with = "number_or_string"
    )]
    pub vat: f64,
    /// Whether the guest selected it.
    #[serde(default)]
    pub selected: bool,
}

impl Cart {
    /// Guest data, or an `InvalidCart` error.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidCart` when personal data is absent.
    pub fn personal(&self) -> Result<&PersonalData, BookingError> {
        self.personal_data
            .as_ref()
            .ok_or_else(|| BookingError::InvalidCart("personal data is required".into()))
    }

    /// Stay data, or an `InvalidCart` error.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidCart` when search data is absent.
    pub fn search(&self) -> Result<&SearchData, BookingError> {
        self.search_data
            .as_ref()
            .ok_or_else(|| BookingError::InvalidCart("search data is required".into()))
    }

    /// Services the guest ticked.
    pub fn selected_services(&self) -> impl Iterator<Item = &OfferService> {
        self.offer
            .iter()
            .flat_map(|o| o.services.iter())
            .filter(|s| s.selected)
    }

    /// Check that the cart carries everything a reservation needs.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidCart` describing the first problem found.
    pub fn validate(&self) -> Result<(), BookingError> {
        let personal = self.personal()?;
        let search = self.search()?;

        if personal.email.trim().is_empty() {
            return Err(BookingError::InvalidCart("guest email is required".into()));
        }
        if search.nights() < 1 {
            return Err(BookingError::InvalidCart(
                "departure must be after arrival".into(),
            ));
        }
        if search.adults == 0 {
            return Err(BookingError::InvalidCart("at least one adult is required".into()));
        }
        if self.rate_plan.is_none() {
            return Err(BookingError::InvalidCart("rate plan is required".into()));
        }
        if self.calculated_amounts.total.gross < self.calculated_amounts.deposit.gross {
            return Err(BookingError::InvalidCart(
                "deposit exceeds total price".into(),
            ));
        }
        Ok(())
    }

    /// Deposit in minor units, `None` when the cart declares no deposit.
    #[must_use]
    pub fn deposit_minor(&self) -> Option<i64> {
        to_minor_units(self.calculated_amounts.deposit.gross).ok()
    }

    /// Total price in minor units, `None` when the cart carries no total.
    #[must_use]
    pub fn total_minor(&self) -> Option<i64> {
        to_minor_units(self.calculated_amounts.total.gross).ok()
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(serde::de::Error::custom),
    }
}
