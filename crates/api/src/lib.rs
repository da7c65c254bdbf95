//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Scheduler trigger and settlement webhook endpoints
//! - Public share-link routes
//! - Owner document routes behind JWT authentication
//! - The mapping from billing errors to JSON responses

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use std::sync::Arc;
use tally_core::billing::BillingService;
use tally_shared::JwtService;
use tally_shared::config::WebhookConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Billing operations over the configured stores and mailer.
    pub billing: Arc<BillingService>,
    /// JWT service for owner tokens.
    pub jwt_service: Arc<JwtService>,
    /// Bearer token expected by the scheduler trigger routes.
    pub cron_secret: Arc<str>,
    /// Settlement webhook signing settings.
    pub webhook: Arc<WebhookConfig>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
