//! Payment service: the single entry point for payment operations.

use std::sync::Arc;

use ibe_core::{
    to_minor_units, Metadata, PaymentConfirmation, PaymentError, PaymentIntent, PaymentRequest,
    PaymentStatus, ProviderName, WebhookOutcome,
};

use crate::providers::PaymentProvider;
use crate::registry::ProviderRegistry;

/// Facade over the provider registry.
///
/// Every call resolves an adapter (the active one, or the one named by the
/// caller) and delegates to it.
pub struct PaymentService {
    registry: Arc<ProviderRegistry>,
    currency: String,
}

impl PaymentService {
    /// Create a payment service charging in `currency`.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, currency: impl Into<String>) -> Self {
        Self {
            registry,
            currency: currency.into(),
        }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Currency every payment is opened in.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    fn adapter(&self, provider: Option<&str>) -> Arc<dyn PaymentProvider> {
        match provider {
            Some(name) => self.registry.get_provider_by_name(name),
            None => self.registry.get_provider(),
        }
    }

    /// Open a payment for `amount` currency units.
    ///
    /// The resolved provider name and a `created_at` timestamp are added to
    /// the metadata sent to the provider.
    pub async fn create_payment_intent(
        &self,
        amount: f64,
        payment_methods: Vec<String>,
        mut metadata: Metadata,
        provider: Option<&str>,
    ) -> Result<(ProviderName, PaymentIntent), PaymentError> {
        let amount_minor = to_minor_units(amount)?;
        let adapter = self.adapter(provider);
        let name = adapter.name();

        metadata.insert("provider".into(), name.as_str().into());
        metadata.insert(
            "created_at".into(),
            chrono::Utc::now().to_rfc3339().into(),
        );

        let request = PaymentRequest {
            amount_minor,
            currency: self.currency.clone(),
            payment_methods,
            metadata,
        };

        let intent = adapter.create_payment_intent(&request).await?;
        Ok((name, intent))
    }

    /// Run the provider's confirmation step for a payment.
    pub async fn confirm_payment(
        &self,
        payment_id: &str,
        provider: Option<&str>,
    ) -> Result<PaymentConfirmation, PaymentError> {
        self.adapter(provider).confirm_payment(payment_id).await
    }

    /// Read a payment's status from its provider.
    pub async fn get_payment_status(
        &self,
        payment_id: &str,
        provider: Option<&str>,
    ) -> Result<PaymentStatus, PaymentError> {
        self.adapter(provider).get_payment_status(payment_id).await
    }

    /// Verify and interpret a provider notification.
    pub async fn handle_webhook(
        &self,
        payload: &str,
        signature: Option<&str>,
        provider: Option<&str>,
    ) -> Result<(ProviderName, WebhookOutcome), PaymentError> {
        let adapter = self.adapter(provider);
        let outcome = adapter.handle_webhook(payload, signature).await?;
        Ok((adapter.name(), outcome))
    }
}
