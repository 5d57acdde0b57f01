//! Payment provider identifiers and capability descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A payment provider the booking engine can route payments through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// Stripe `PaymentIntents`.
    Stripe,
    /// `SumUp` hosted checkouts.
    #[serde(rename = "sumup")]
    SumUp,
    /// Adyen Checkout sessions.
    Adyen,
}

impl ProviderName {
    /// Provider used when configuration names an unsupported provider.
    pub const DEFAULT: Self = Self::Stripe;

    /// Every supported provider, in a stable order.
    pub const ALL: [Self; 3] = [Self::Stripe, Self::SumUp, Self::Adyen];

    /// Lower-case wire name (`"stripe"`, `"sumup"`, `"adyen"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::SumUp => "sumup",
            Self::Adyen => "adyen",
        }
    }

    /// Payment method identifiers the provider accepts, in preference order.
    #[must_use]
    pub const fn supported_methods(self) -> &'static [&'static str] {
        match self {
            Self::Stripe => &[
                "card",
                "ideal",
                "sofort",
                "giropay",
                "sepa_debit",
                "bancontact",
                "eps",
                "p24",
            ],
            Self::SumUp => &["card"],
            Self::Adyen => &[
                "scheme",
                "ideal",
                "sofort",
                "giropay",
                "sepadirectdebit",
                "bancontact",
                "eps",
                "p24",
            ],
        }
    }

    /// Capabilities the provider offers through this integration.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Stripe => Capabilities {
                card_payments: true,
                bank_transfers: true,
                recurring: true,
                refunds: true,
                partial_capture: true,
                webhooks: true,
                manual_capture: true,
                customer_saving: true,
            },
            Self::SumUp => Capabilities {
                card_payments: true,
                refunds: true,
                webhooks: true,
                ..Capabilities::NONE
            },
            Self::Adyen => Capabilities {
                card_payments: true,
                bank_transfers: true,
                recurring: true,
                refunds: true,
                webhooks: true,
                manual_capture: true,
                ..Capabilities::NONE
            },
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported payment provider: {0}")]
pub struct UnsupportedProvider(pub String);

impl FromStr for ProviderName {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "sumup" => Ok(Self::SumUp),
            "adyen" => Ok(Self::Adyen),
            _ => Err(UnsupportedProvider(s.to_string())),
        }
    }
}

/// Feature flags describing what a provider supports.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// Card payments.
    pub card_payments: bool,
    /// Bank transfers and local payment methods.
    pub bank_transfers: bool,
    /// Recurring charges.
    pub recurring: bool,
    /// Refunds.
    pub refunds: bool,
    /// Partial capture of an authorisation.
    pub partial_capture: bool,
    /// Asynchronous notifications.
    pub webhooks: bool,
    /// Separate authorisation and capture.
    pub manual_capture: bool,
    /// Stored customer payment methods.
    pub customer_saving: bool,
}

impl Capabilities {
    /// No capabilities at all.
    pub const NONE: Self = Self {
        card_payments: false,
        bank_transfers: false,
        recurring: false,
        refunds: false,
        partial_capture: false,
        webhooks: false,
        manual_capture: false,
        customer_saving: false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Stripe".parse::<ProviderName>(), Ok(ProviderName::Stripe));
        assert_eq!(" SUMUP ".parse::<ProviderName>(), Ok(ProviderName::SumUp));
        assert_eq!("adyen".parse::<ProviderName>(), Ok(ProviderName::Adyen));
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "unsupported-x".parse::<ProviderName>().unwrap_err();
        assert_eq!(err.0, "unsupported-x");
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ProviderName::SumUp).unwrap();
        assert_eq!(json, "\"sumup\"");
        let parsed: ProviderName = serde_json::from_str("\"adyen\"").unwrap();
        assert_eq!(parsed, ProviderName::Adyen);
    }

    #[test]
    fn sumup_has_no_bank_transfers() {
        let caps = ProviderName::SumUp.capabilities();
        assert!(caps.card_payments);
        assert!(!caps.bank_transfers);
        assert!(!caps.manual_capture);
    }
}
