//! Payment processor webhooks.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use tally_core::billing::{SettlementEvent, SettlementOutcome};
use tally_shared::{AppError, signature};
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

/// Header carrying `t=<unix seconds>,v1=<hex digest>`.
pub const SIGNATURE_HEADER: &str = "tally-signature";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Acknowledgement returned to the processor.
#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    /// Always true once the event has been verified and handled.
    pub received: bool,
    /// What the event did.
    pub outcome: SettlementOutcome,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Creates the webhook router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/settlement", post(settlement))
}

/// POST /webhooks/settlement - Apply a signed settlement event.
///
/// Duplicate deliveries answer 200 so the processor stops retrying.
async fn settlement(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SettlementResponse>, ApiError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;

    let now = Utc::now();
    if let Err(err) = signature::verify(
        &state.webhook.secret,
        header,
        &body,
        now.timestamp(),
        state.webhook.tolerance_secs,
    ) {
        warn!(error = %err, "Rejected settlement webhook");
        return Err(AppError::Unauthorized(err.to_string()).into());
    }

    let event: SettlementEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid settlement event: {e}")))?;

    let outcome = state.billing.apply_settlement(&event, now).await?;
    info!(event_id = %event.event_id, outcome = ?outcome, "Settlement webhook handled");

    Ok(Json(SettlementResponse {
        received: true,
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{TestApp, WEBHOOK_SECRET, invoice_body, json_body};

    fn signed(body: &str, secret: &str, timestamp: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/settlement")
            .header(
                SIGNATURE_HEADER,
                signature::header_value(secret, timestamp, body.as_bytes()),
            )
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn sent_invoice_id(app: &TestApp) -> String {
        let response = app
            .router()
            .oneshot(app.owner_request("POST", "/api/v1/invoices", Some(invoice_body(true))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_settlement_is_idempotent_on_event_id() {
        let app = TestApp::new();
        let invoice_id = sent_invoice_id(&app).await;
        let body = json!({
            "event_id": "evt_1",
            "session_id": "cs_1",
            "invoice_id": invoice_id
        })
        .to_string();
        let now = Utc::now().timestamp();

        let first = app
            .router()
            .oneshot(signed(&body, WEBHOOK_SECRET, now))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(json_body(first).await["outcome"], "applied");

        let second = app
            .router()
            .oneshot(signed(&body, WEBHOOK_SECRET, now))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["outcome"], "already_paid");

        let docs = app.store.documents().unwrap();
        assert_eq!(docs[0].status.as_str(), "paid");
    }

    #[tokio::test]
    async fn test_bad_signature_changes_nothing() {
        let app = TestApp::new();
        let invoice_id = sent_invoice_id(&app).await;
        let body = json!({
            "event_id": "evt_2",
            "session_id": "cs_2",
            "invoice_id": invoice_id
        })
        .to_string();

        let response = app
            .router()
            .oneshot(signed(&body, "not-the-secret", Utc::now().timestamp()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.store.documents().unwrap()[0].status.as_str(), "sent");
    }

    #[tokio::test]
    async fn test_stale_signature_rejected() {
        let app = TestApp::new();
        let body = r#"{"event_id":"e","session_id":"s","invoice_id":"0190a1b2-0000-7000-8000-000000000000"}"#;

        let response = app
            .router()
            .oneshot(signed(body, WEBHOOK_SECRET, Utc::now().timestamp() - 3600))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_event_is_bad_request() {
        let app = TestApp::new();
        let body = r#"{"event_id":"e"}"#;

        let response = app
            .router()
            .oneshot(signed(body, WEBHOOK_SECRET, Utc::now().timestamp()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "VALIDATION_ERROR");
    }
}
