//! Owner activity feed.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use tally_core::activity::ActivityEntry;
use tally_shared::types::{PageRequest, PageResponse};

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the activity router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/activity", get(recent_activity))
}

/// GET /activity?page=&per_page= - Newest entries first.
async fn recent_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<ActivityEntry>>, ApiError> {
    let entries = state
        .billing
        .recent_activity(auth.owner_id(), page)
        .await?;
    Ok(Json(entries))
}
