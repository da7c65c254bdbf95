//! Tally API Server
//!
//! Main entry point for the invoicing backend. Scheduler runs are not
//! started here; an external trigger calls the `/cron/*` routes.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::billing::{BillingContext, BillingRules, BillingService};
use tally_db::{DocumentRepository, ProfileRepository, connect};
use tally_shared::{AppConfig, EmailService, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let rules = BillingRules::from_config(&config.billing)?;
    info!(
        timezone = %config.billing.timezone,
        minimum_charge = config.billing.minimum_charge,
        "Billing rules loaded"
    );

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };
    let jwt_service = JwtService::new(jwt_config);

    let email_service = EmailService::new(config.email.clone());
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let ctx = BillingContext::new(
        Arc::new(DocumentRepository::new(db.clone())),
        Arc::new(ProfileRepository::new(db)),
        Arc::new(email_service),
        rules,
    );

    let state = AppState {
        billing: Arc::new(BillingService::new(ctx)),
        jwt_service: Arc::new(jwt_service),
        cron_secret: Arc::from(config.cron.secret.as_str()),
        webhook: Arc::new(config.webhook.clone()),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
