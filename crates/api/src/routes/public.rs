//! Share-link routes for clients.
//!
//! No authentication: the public id is the credential.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::document::PublicDocumentView;
use tally_core::lifecycle::{DocumentKind, DocumentStatus};

use crate::{AppState, error::ApiError};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Optional body of a decline.
#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    /// Free-text reason shown to the owner.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of a client decision on an offer.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// New offer status.
    pub status: DocumentStatus,
    /// Number of the invoice created on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    /// Share link of the invoice created on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_public_id: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Creates the share-link router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public/invoices/{public_id}", get(view_invoice))
        .route("/public/offers/{public_id}", get(view_offer))
        .route("/public/offers/{public_id}/accept", post(accept_offer))
        .route("/public/offers/{public_id}/decline", post(decline_offer))
}

/// GET /public/invoices/{public_id} - Read an invoice; the first read marks it viewed.
async fn view_invoice(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<PublicDocumentView>, ApiError> {
    let view = state
        .billing
        .view_public(DocumentKind::Invoice, &public_id, Utc::now())
        .await?;
    Ok(Json(view))
}

/// GET /public/offers/{public_id} - Read an offer; the first read marks it viewed.
async fn view_offer(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<PublicDocumentView>, ApiError> {
    let view = state
        .billing
        .view_public(DocumentKind::Offer, &public_id, Utc::now())
        .await?;
    Ok(Json(view))
}

/// POST /public/offers/{public_id}/accept - Accept and derive the invoice.
async fn accept_offer(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let accepted = state
        .billing
        .accept_offer_public(&public_id, Utc::now())
        .await?;
    Ok(Json(DecisionResponse {
        status: accepted.offer.status,
        invoice_number: Some(accepted.invoice.number),
        invoice_public_id: Some(accepted.invoice.public_id),
    }))
}

/// POST /public/offers/{public_id}/decline - Decline with an optional reason.
async fn decline_offer(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    payload: Option<Json<DeclineRequest>>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let reason = payload.and_then(|Json(body)| body.reason);
    let offer = state
        .billing
        .decline_offer_public(&public_id, reason, Utc::now())
        .await?;
    Ok(Json(DecisionResponse {
        status: offer.status,
        invoice_number: None,
        invoice_public_id: None,
    }))
}
