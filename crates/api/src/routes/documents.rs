//! Owner routes for invoices and offers.
//!
//! Requires the auth middleware to be applied externally. Every lookup is
//! scoped to the token's owner, so foreign ids answer 404.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::Deserialize;
use tally_core::billing::{AcceptedOffer, RecurrenceRequest, ReminderRequest};
use tally_core::document::{Document, DocumentDraft};
use tally_core::lifecycle::DocumentKind;
use tally_shared::types::DocumentId;
use tracing::info;

use crate::routes::public::DeclineRequest;
use crate::{AppState, error::ApiError, middleware::AuthUser};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `PUT /invoices/{id}/recurring`; a null interval turns recurrence off.
#[derive(Debug, Deserialize)]
pub struct RecurringRequest {
    /// New interval, or none.
    #[serde(default)]
    pub interval: Option<RecurrenceRequest>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Creates the owner document router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices/{id}", get(get_invoice).put(update_invoice))
        .route("/invoices/{id}/send", post(send_invoice))
        .route("/invoices/{id}/void", post(void_invoice))
        .route("/invoices/{id}/paid", post(mark_paid))
        .route("/invoices/{id}/recurring", put(configure_recurring))
        .route("/invoices/{id}/reminders", put(configure_reminders))
        .route("/invoices/{id}/reminders/send", post(send_reminder))
        .route("/offers", post(create_offer))
        .route("/offers/{id}", get(get_offer).put(update_offer))
        .route("/offers/{id}/send", post(send_offer))
        .route("/offers/{id}/accept", post(accept_offer))
        .route("/offers/{id}/decline", post(decline_offer))
}

async fn create(
    state: &AppState,
    auth: &AuthUser,
    kind: DocumentKind,
    draft: &DocumentDraft,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let document = state
        .billing
        .create_document(auth.owner_id(), kind, draft, Utc::now())
        .await?;
    info!(
        document_id = %document.id,
        number = %document.number,
        status = %document.status,
        "Document created"
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// POST /invoices - Create a draft or sent invoice.
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DocumentDraft>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state, &auth, DocumentKind::Invoice, &payload).await
}

/// POST /offers - Create a draft or sent offer.
async fn create_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DocumentDraft>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state, &auth, DocumentKind::Offer, &payload).await
}

/// GET /invoices/{id}
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .get_document(auth.owner_id(), DocumentKind::Invoice, id)
        .await?;
    Ok(Json(document))
}

/// GET /offers/{id}
async fn get_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .get_document(auth.owner_id(), DocumentKind::Offer, id)
        .await?;
    Ok(Json(document))
}

/// PUT /invoices/{id} - Replace the content of an editable invoice.
async fn update_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(payload): Json<DocumentDraft>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .update_document(auth.owner_id(), DocumentKind::Invoice, id, &payload, Utc::now())
        .await?;
    Ok(Json(document))
}

/// PUT /offers/{id} - Replace the content of an editable offer.
async fn update_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(payload): Json<DocumentDraft>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .update_document(auth.owner_id(), DocumentKind::Offer, id, &payload, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /invoices/{id}/send
async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .send_document(auth.owner_id(), DocumentKind::Invoice, id, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /offers/{id}/send
async fn send_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .send_document(auth.owner_id(), DocumentKind::Offer, id, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /invoices/{id}/void
async fn void_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .void_invoice(auth.owner_id(), id, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /invoices/{id}/paid - Record a payment received outside the processor.
async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .mark_invoice_paid(auth.owner_id(), id, Utc::now())
        .await?;
    Ok(Json(document))
}

/// PUT /invoices/{id}/recurring
async fn configure_recurring(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(payload): Json<RecurringRequest>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .configure_recurring(auth.owner_id(), id, payload.interval, Utc::now())
        .await?;
    Ok(Json(document))
}

/// PUT /invoices/{id}/reminders
async fn configure_reminders(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(payload): Json<ReminderRequest>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .configure_reminders(auth.owner_id(), id, &payload, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /invoices/{id}/reminders/send - Manual reminder, rate limited.
async fn send_reminder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .billing
        .send_manual_reminder(auth.owner_id(), id, Utc::now())
        .await?;
    Ok(Json(document))
}

/// POST /offers/{id}/accept - Accept on the client's behalf.
async fn accept_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> Result<Json<AcceptedOffer>, ApiError> {
    let accepted = state
        .billing
        .accept_offer(auth.owner_id(), id, Utc::now())
        .await?;
    Ok(Json(accepted))
}

/// POST /offers/{id}/decline
async fn decline_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    payload: Option<Json<DeclineRequest>>,
) -> Result<Json<Document>, ApiError> {
    let reason = payload.and_then(|Json(body)| body.reason);
    let document = state
        .billing
        .decline_offer(auth.owner_id(), id, reason, Utc::now())
        .await?;
    Ok(Json(document))
}
