//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Stripe credentials and endpoint.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_test_...` or `sk_live_...`).
    pub secret_key: Option<String>,
    /// Webhook signing secret (`whsec_...`).
    pub webhook_secret: Option<String>,
    /// API base URL (default: `https://api.stripe.com/v1`).
    pub api_base: String,
}

/// `SumUp` credentials and endpoint.
#[derive(Debug, Clone)]
pub struct SumUpConfig {
    /// API key used as bearer token.
    pub api_key: Option<String>,
    /// Merchant account email checkouts are paid to.
    pub merchant_email: Option<String>,
    /// Shared secret for webhook signatures (optional).
    pub webhook_secret: Option<String>,
    /// API base URL (default: `https://api.sumup.com/v0.1`).
    pub api_base: String,
}

/// Adyen credentials and endpoint.
#[derive(Debug, Clone)]
pub struct AdyenConfig {
    /// API key sent as `X-API-Key`.
    pub api_key: Option<String>,
    /// Merchant account code.
    pub merchant_account: Option<String>,
    /// `test` or `live`.
    pub environment: String,
    /// Live endpoint prefix, required when `environment` is `live`.
    pub live_url_prefix: Option<String>,
    /// Hex-encoded HMAC key for notification signatures (optional).
    pub webhook_hmac_key: Option<String>,
    /// Explicit API base URL, overriding the environment-derived one.
    pub api_base: Option<String>,
}

impl AdyenConfig {
    /// Checkout API v71 base URL for the configured environment.
    #[must_use]
    pub fn checkout_base(&self) -> String {
        if let Some(base) = &self.api_base {
            return base.clone();
        }
        match (self.environment.as_str(), &self.live_url_prefix) {
            ("live", Some(prefix)) => {
                format!("https://{prefix}-checkout-live.adyenpayments.com/checkout/v71")
            }
            _ => "https://checkout-test.adyen.com/v71".to_string(),
        }
    }
}

/// Apaleo (PMS) credentials and endpoints.
#[derive(Debug, Clone)]
pub struct ApaleoConfig {
    /// OAuth client id.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// OAuth token endpoint.
    pub token_endpoint: String,
    /// API base URL (default: `https://api.apaleo.com`).
    pub api_base: String,
    /// Property the engine sells (availability lookups).
    pub property_id: Option<String>,
}

/// Outbound email settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key. Without it confirmation emails are skipped.
    pub resend_api_key: Option<String>,
    /// Sender, e.g. `Hotel Stern <info@siriusmailer.com>`.
    pub from: String,
    /// Resend API base URL.
    pub api_base: String,
}

/// Hotel contact details printed in confirmations.
#[derive(Debug, Clone)]
pub struct HotelInfo {
    /// Display name.
    pub name: String,
    /// Postal address, one line.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// Contact email.
    pub email: String,
}

impl Default for HotelInfo {
    fn default() -> Self {
        Self {
            name: "Hotel Stern".into(),
            address: "Marktplatz 2, 88316 Isny im Allgäu".into(),
            phone: "+49 7562 97010".into(),
            email: "info@hotel-stern.de".into(),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/ibe").
    pub data_dir: String,

    /// Active payment provider name (default: "stripe").
    pub payment_provider: String,

    /// Currency for all payments (default: "EUR").
    pub currency: String,

    /// Stripe settings.
    pub stripe: StripeConfig,

    /// `SumUp` settings.
    pub sumup: SumUpConfig,

    /// Adyen settings.
    pub adyen: AdyenConfig,

    /// Apaleo settings.
    pub apaleo: ApaleoConfig,

    /// Email settings.
    pub email: EmailConfig,

    /// Hotel contact details.
    pub hotel: HotelInfo,

    /// Public website URL, used for provider return URLs.
    pub public_site_url: String,

    /// Admin API key for privileged endpoints.
    pub admin_api_key: Option<String>,

    /// Trust a client-declared `PAID` for `SumUp` instead of re-querying.
    pub sumup_trust_client_status: bool,

    /// How long processed webhook event ids are remembered.
    pub webhook_event_retention_hours: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    secret_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// `SumUp` secrets file structure.
#[derive(Debug, Deserialize)]
struct SumUpSecrets {
    api_key: String,
    #[serde(default)]
    merchant_email: Option<String>,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// Adyen secrets file structure.
#[derive(Debug, Deserialize)]
struct AdyenSecrets {
    api_key: String,
    merchant_account: String,
    #[serde(default)]
    hmac_key: Option<String>,
}

/// Apaleo secrets file structure.
#[derive(Debug, Deserialize)]
struct ApaleoSecrets {
    client_id: String,
    client_secret: String,
}

/// Resend secrets file structure.
#[derive(Debug, Deserialize)]
struct ResendSecrets {
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", &defaults.listen_addr),
            data_dir: env_or("DATA_DIR", &defaults.data_dir),
            payment_provider: env_or("PAYMENT_PROVIDER", &defaults.payment_provider),
            currency: env_or("PAYMENT_CURRENCY", &defaults.currency).to_ascii_uppercase(),
            stripe: load_stripe_config(defaults.stripe),
            sumup: load_sumup_config(defaults.sumup),
            adyen: load_adyen_config(defaults.adyen),
            apaleo: load_apaleo_config(defaults.apaleo),
            email: load_email_config(defaults.email),
            hotel: HotelInfo {
                name: env_or("HOTEL_NAME", &defaults.hotel.name),
                address: env_or("HOTEL_ADDRESS", &defaults.hotel.address),
                phone: env_or("HOTEL_PHONE", &defaults.hotel.phone),
                email: env_or("HOTEL_EMAIL", &defaults.hotel.email),
            },
            public_site_url: env_or("PUBLIC_SITE_URL", &defaults.public_site_url)
                .trim_end_matches('/')
                .to_string(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            sumup_trust_client_status: std::env::var("SUMUP_TRUST_CLIENT_STATUS")
                .is_ok_and(|v| v.eq_ignore_ascii_case("true") || v == "1"),
            webhook_event_retention_hours: env_parse(
                "WEBHOOK_EVENT_RETENTION_HOURS",
                defaults.webhook_event_retention_hours,
            ),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parse(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Candidate locations for a secrets file.
fn secret_paths(file: &str) -> [String; 3] {
    [
        format!(".secrets/{file}"),
        format!("ibe/.secrets/{file}"),
        format!("../.secrets/{file}"),
    ]
}

/// Load the first readable secrets file among the candidate paths.
fn find_secrets<T: serde::de::DeserializeOwned>(file: &str) -> Option<T> {
    for path in &secret_paths(file) {
        if let Ok(secrets) = load_secrets_file::<T>(path) {
            tracing::info!(path = %path, "Loaded secrets from file");
            return Some(secrets);
        }
    }
    tracing::debug!(file = %file, "Secrets file not found, using environment variables");
    None
}

/// Load Stripe secrets from file or environment.
fn load_stripe_config(defaults: StripeConfig) -> StripeConfig {
    let (secret_key, webhook_secret) = match find_secrets::<StripeSecrets>("stripe.json") {
        Some(s) => (Some(s.secret_key), s.webhook_secret),
        None => (
            std::env::var("STRIPE_SECRET_KEY").ok(),
            std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
        ),
    };

    StripeConfig {
        secret_key,
        webhook_secret,
        api_base: env_or("STRIPE_API_BASE", &defaults.api_base),
    }
}

/// Load `SumUp` secrets from file or environment.
fn load_sumup_config(defaults: SumUpConfig) -> SumUpConfig {
    let (api_key, merchant_email, webhook_secret) = match find_secrets::<SumUpSecrets>("sumup.json")
    {
        Some(s) => (Some(s.api_key), s.merchant_email, s.webhook_secret),
        None => (
            std::env::var("SUMUP_API_KEY").ok(),
            std::env::var("SUMUP_MERCHANT_EMAIL").ok(),
            std::env::var("SUMUP_WEBHOOK_SECRET").ok(),
        ),
    };

    SumUpConfig {
        api_key,
        merchant_email,
        webhook_secret,
        api_base: env_or("SUMUP_API_BASE", &defaults.api_base),
    }
}

/// Load Adyen secrets from file or environment.
fn load_adyen_config(defaults: AdyenConfig) -> AdyenConfig {
    let (api_key, merchant_account, webhook_hmac_key) =
        match find_secrets::<AdyenSecrets>("adyen.json") {
            Some(s) => (Some(s.api_key), Some(s.merchant_account), s.hmac_key),
            None => (
                std::env::var("ADYEN_API_KEY").ok(),
                std::env::var("ADYEN_MERCHANT_ACCOUNT").ok(),
                std::env::var("ADYEN_WEBHOOK_HMAC_KEY").ok(),
            ),
        };

    AdyenConfig {
        api_key,
        merchant_account,
        environment: env_or("ADYEN_ENVIRONMENT", &defaults.environment),
        live_url_prefix: std::env::var("ADYEN_LIVE_URL_PREFIX").ok(),
        webhook_hmac_key,
        api_base: std::env::var("ADYEN_API_BASE").ok(),
    }
}

/// Load Apaleo secrets from file or environment.
fn load_apaleo_config(defaults: ApaleoConfig) -> ApaleoConfig {
    let (client_id, client_secret) = match find_secrets::<ApaleoSecrets>("apaleo.json") {
        Some(s) => (Some(s.client_id), Some(s.client_secret)),
        None => (
            std::env::var("APALEO_CLIENT_ID").ok(),
            std::env::var("APALEO_CLIENT_SECRET").ok(),
        ),
    };

    ApaleoConfig {
        client_id,
        client_secret,
        token_endpoint: env_or("APALEO_TOKEN_ENDPOINT", &defaults.token_endpoint),
        api_base: env_or("APALEO_API_BASE", &defaults.api_base),
        property_id: std::env::var("APALEO_PROPERTY_ID").ok(),
    }
}

/// Load Resend secrets from file or environment.
fn load_email_config(defaults: EmailConfig) -> EmailConfig {
    let resend_api_key = find_secrets::<ResendSecrets>("resend.json")
        .map(|s| s.api_key)
        .or_else(|| std::env::var("RESEND_API_KEY").ok());

    EmailConfig {
        resend_api_key,
        from: env_or("EMAIL_FROM", &defaults.from),
        api_base: env_or("RESEND_API_BASE", &defaults.api_base),
    }
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/ibe".into(),
            payment_provider: "stripe".into(),
            currency: "EUR".into(),
            stripe: StripeConfig {
                secret_key: None,
                webhook_secret: None,
                api_base: "https://api.stripe.com/v1".into(),
            },
            sumup: SumUpConfig {
                api_key: None,
                merchant_email: None,
                webhook_secret: None,
                api_base: "https://api.sumup.com/v0.1".into(),
            },
            adyen: AdyenConfig {
                api_key: None,
                merchant_account: None,
                environment: "test".into(),
                live_url_prefix: None,
                webhook_hmac_key: None,
                api_base: None,
            },
            apaleo: ApaleoConfig {
                client_id: None,
                client_secret: None,
                token_endpoint: "https://identity.apaleo.com/connect/token".into(),
                api_base: "https://api.apaleo.com".into(),
                property_id: None,
            },
            email: EmailConfig {
                resend_api_key: None,
                from: "Hotel Stern <info@siriusmailer.com>".into(),
                api_base: "https://api.resend.com".into(),
            },
            hotel: HotelInfo::default(),
            public_site_url: "http://localhost:4321".into(),
            admin_api_key: None,
            sumup_trust_client_status: false,
            webhook_event_retention_hours: 72,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
