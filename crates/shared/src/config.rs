//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Customer portal configuration.
    pub portal: PortalConfig,
    /// Payment provider credentials.
    pub providers: ProvidersConfig,
    /// Outbound email configuration.
    pub email: EmailConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared master key authorizing company registration.
    pub master_api_key: String,
}

/// Customer portal configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Public base URL of this service, used in portal links and
    /// provider redirect URIs (no trailing slash).
    pub base_url: String,
}

/// Payment provider credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Stripe configuration.
    pub stripe: StripeConfig,
    /// PayPal configuration.
    pub paypal: PaypalConfig,
    /// Square configuration.
    pub square: SquareConfig,
}

/// Stripe configuration (connected-account model).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    /// Secret API key.
    pub secret_key: String,
    /// Publishable key, safe to embed in portal pages.
    pub publishable_key: String,
    /// API base URL.
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

/// PayPal configuration (OAuth or email onboarding).
#[derive(Debug, Clone, Deserialize)]
pub struct PaypalConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// API base URL.
    #[serde(default = "default_paypal_api_base")]
    pub api_base: String,
    /// Authorization endpoint base URL.
    #[serde(default = "default_paypal_authorize_base")]
    pub authorize_base: String,
}

fn default_paypal_api_base() -> String {
    "https://api-m.paypal.com".to_string()
}

fn default_paypal_authorize_base() -> String {
    "https://www.paypal.com".to_string()
}

/// Square configuration (OAuth with merchant + location).
#[derive(Debug, Clone, Deserialize)]
pub struct SquareConfig {
    /// Application id, safe to embed in portal pages.
    pub application_id: String,
    /// Application secret used for the code exchange.
    pub application_secret: String,
    /// API base URL.
    #[serde(default = "default_square_api_base")]
    pub api_base: String,
}

fn default_square_api_base() -> String {
    "https://connect.squareup.com".to_string()
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether outbound email is enabled at all.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// From address.
    #[serde(default)]
    pub from_email: String,
    /// From display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Paylink".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAYLINK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
