//! Provider registry.
//!
//! Resolves provider names to adapters and keeps one adapter per provider for
//! the life of the process. Owned by [`AppState`](crate::state::AppState), so
//! tests can build their own registry and swap adapters in.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ibe_core::ProviderName;

use crate::config::ServiceConfig;
use crate::providers::{AdyenProvider, PaymentProvider, StripeProvider, SumUpProvider};

/// Cache of provider adapters keyed by provider name.
pub struct ProviderRegistry {
    active: ProviderName,
    config: ServiceConfig,
    client: reqwest::Client,
    cache: RwLock<HashMap<ProviderName, Arc<dyn PaymentProvider>>>,
}

impl ProviderRegistry {
    /// Create a registry for the configured active provider.
    ///
    /// An unsupported `PAYMENT_PROVIDER` falls back to Stripe with a warning.
    #[must_use]
    pub fn new(config: ServiceConfig, client: reqwest::Client) -> Self {
        let active = resolve(&config.payment_provider);
        tracing::info!(provider = %active, "Active payment provider");

        Self {
            active,
            config,
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The provider used when a request names none.
    #[must_use]
    pub const fn active(&self) -> ProviderName {
        self.active
    }

    /// Adapter for the active provider.
    #[must_use]
    pub fn get_provider(&self) -> Arc<dyn PaymentProvider> {
        self.provider(self.active)
    }

    /// Adapter for an explicitly named provider.
    ///
    /// Never fails: unknown names resolve to the default provider.
    #[must_use]
    pub fn get_provider_by_name(&self, name: &str) -> Arc<dyn PaymentProvider> {
        self.provider(resolve(name))
    }

    /// Adapter for a known provider, built on first use.
    #[must_use]
    pub fn provider(&self, name: ProviderName) -> Arc<dyn PaymentProvider> {
        if let Some(adapter) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
        {
            return Arc::clone(adapter);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            cache
                .entry(name)
                .or_insert_with(|| self.build(name)),
        )
    }

    /// Install an adapter, replacing any cached one for the same provider.
    pub fn register(&self, adapter: Arc<dyn PaymentProvider>) {
        let name = adapter.name();
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, adapter);
    }

    /// Drop every cached adapter. The next lookup rebuilds from configuration.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn build(&self, name: ProviderName) -> Arc<dyn PaymentProvider> {
        tracing::debug!(provider = %name, "Creating payment provider adapter");

        match name {
            ProviderName::Stripe => Arc::new(StripeProvider::new(
                self.config.stripe.clone(),
                self.client.clone(),
            )),
            ProviderName::SumUp => Arc::new(SumUpProvider::new(
                self.config.sumup.clone(),
                self.client.clone(),
                self.config.public_site_url.clone(),
                self.config.hotel.name.clone(),
            )),
            ProviderName::Adyen => Arc::new(AdyenProvider::new(
                self.config.adyen.clone(),
                self.client.clone(),
                self.config.public_site_url.clone(),
            )),
        }
    }
}

/// Parse a provider name, falling back to the default.
fn resolve(name: &str) -> ProviderName {
    name.parse().unwrap_or_else(|err| {
        tracing::warn!(
            error = %err,
            fallback = %ProviderName::DEFAULT,
            "Unsupported payment provider, using default"
        );
        ProviderName::DEFAULT
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(active: &str) -> ProviderRegistry {
        let config = ServiceConfig {
            payment_provider: active.into(),
            ..ServiceConfig::default()
        };
        ProviderRegistry::new(config, reqwest::Client::new())
    }

    /// Log sink shared between a test subscriber and the assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn unknown_name_falls_back_to_stripe() {
        let registry = registry("stripe");
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let adapter = tracing::subscriber::with_default(subscriber, || {
            registry.get_provider_by_name("unsupported-x")
        });

        assert_eq!(adapter.name(), ProviderName::Stripe);
        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning logged: {output}");
        assert!(output.contains("Unsupported payment provider, using default"));
        assert!(output.contains("fallback=stripe"));
    }

    #[test]
    fn unknown_active_provider_falls_back_to_stripe() {
        let registry = registry("paypal");
        assert_eq!(registry.active(), ProviderName::Stripe);
        assert_eq!(registry.get_provider().name(), ProviderName::Stripe);
    }

    #[test]
    fn explicit_name_overrides_active() {
        let registry = registry("stripe");
        assert_eq!(
            registry.get_provider_by_name("SumUp").name(),
            ProviderName::SumUp
        );
        assert_eq!(
            registry.get_provider_by_name("adyen").name(),
            ProviderName::Adyen
        );
    }

    #[test]
    fn adapters_are_cached_until_cleared() {
        let registry = registry("sumup");
        let first = registry.get_provider();
        let second = registry.get_provider();
        assert!(Arc::ptr_eq(&first, &second));

        registry.clear_cache();
        let third = registry.get_provider();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.name(), ProviderName::SumUp);
    }
}
