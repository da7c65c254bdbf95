//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod activity;
pub mod cron;
pub mod documents;
pub mod health;
pub mod public;
pub mod webhooks;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Owner routes that require a JWT
    let protected_routes = Router::new()
        .merge(documents::routes())
        .merge(activity::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Cron and webhook routes carry their own credentials
    Router::new()
        .merge(health::routes())
        .merge(cron::routes())
        .merge(webhooks::routes())
        .merge(public::routes())
        .merge(protected_routes)
}
