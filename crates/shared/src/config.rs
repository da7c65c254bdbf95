//! Application configuration management.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Pricing and scheduling configuration.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Scheduler trigger authentication.
    pub cron: CronConfig,
    /// Settlement webhook verification.
    pub webhook: WebhookConfig,
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

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying owner tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// SMTP settings for the outbound email collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Base URL used to build share links.
    pub frontend_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "billing@localhost".to_string(),
            from_name: "Tally".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Pricing, tax and scheduling settings.
///
/// These values are converted into explicit value objects by the core crate
/// and passed into the calculator and schedulers.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// VAT rate applied when tax is not already included (0.20 = 20%).
    #[serde(default = "default_vat_rate")]
    pub vat_rate: Decimal,
    /// Percentage part of the payment processing fee (0.015 = 1.5%).
    #[serde(default = "default_fee_percent")]
    pub fee_percent: Decimal,
    /// Fixed processing fee per currency code, in minor units.
    #[serde(default = "default_fixed_fees")]
    pub fixed_fees: HashMap<String, i64>,
    /// Fixed processing fee for currencies missing from `fixed_fees`.
    #[serde(default = "default_fixed_fee")]
    pub default_fixed_fee: i64,
    /// Smallest chargeable amount in minor units, regardless of currency.
    #[serde(default = "default_minimum_charge")]
    pub minimum_charge: i64,
    /// IANA time zone used for calendar-day truncation.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Rolling window for manual reminders, in hours.
    #[serde(default = "default_manual_reminder_cooldown")]
    pub manual_reminder_cooldown_hours: i64,
    /// Documents per kind per month on the free plan.
    #[serde(default = "default_free_plan_monthly_limit")]
    pub free_plan_monthly_limit: u32,
}

fn default_vat_rate() -> Decimal {
    Decimal::new(20, 2)
}

fn default_fee_percent() -> Decimal {
    Decimal::new(15, 3)
}

fn default_fixed_fees() -> HashMap<String, i64> {
    HashMap::from([
        ("GBP".to_string(), 20),
        ("USD".to_string(), 30),
        ("EUR".to_string(), 30),
    ])
}

fn default_fixed_fee() -> i64 {
    30
}

fn default_minimum_charge() -> i64 {
    100
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_manual_reminder_cooldown() -> i64 {
    24
}

fn default_free_plan_monthly_limit() -> u32 {
    5
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            vat_rate: default_vat_rate(),
            fee_percent: default_fee_percent(),
            fixed_fees: default_fixed_fees(),
            default_fixed_fee: default_fixed_fee(),
            minimum_charge: default_minimum_charge(),
            timezone: default_timezone(),
            manual_reminder_cooldown_hours: default_manual_reminder_cooldown(),
            free_plan_monthly_limit: default_free_plan_monthly_limit(),
        }
    }
}

/// Scheduler trigger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CronConfig {
    /// Bearer token expected on `/cron/*` calls.
    pub secret: String,
}

/// Settlement webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// HMAC-SHA256 signing secret shared with the payment processor.
    pub secret: String,
    /// Maximum accepted age of a signed event, in seconds.
    #[serde(default = "default_webhook_tolerance")]
    pub tolerance_secs: i64,
}

fn default_webhook_tolerance() -> i64 {
    300
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
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
