//! Scheduler trigger routes.
//!
//! Called by an external periodic trigger with the shared cron secret as
//! a bearer token. Unauthorized calls do no work.

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tally_core::schedule::{RecurringRunSummary, ReminderRunSummary};
use tally_shared::AppError;
use tracing::warn;

use crate::{AppState, error::ApiError};

type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

/// Creates the scheduler trigger router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cron/recurring", get(run_recurring))
        .route("/cron/reminders", get(run_reminders))
}

fn authorize(state: &AppState, header: BearerHeader) -> Result<(), ApiError> {
    let Ok(TypedHeader(Authorization(bearer))) = header else {
        warn!("Cron trigger without bearer token");
        return Err(AppError::Unauthorized("missing cron token".to_string()).into());
    };
    let expected = state.cron_secret.as_bytes();
    let given = bearer.token().as_bytes();
    if expected.len() != given.len() || !bool::from(expected.ct_eq(given)) {
        warn!("Cron trigger with wrong token");
        return Err(AppError::Unauthorized("invalid cron token".to_string()).into());
    }
    Ok(())
}

/// GET /cron/recurring - Generate due recurring invoices.
async fn run_recurring(
    State(state): State<AppState>,
    header: BearerHeader,
) -> Result<Json<RecurringRunSummary>, ApiError> {
    authorize(&state, header)?;
    let summary = state.billing.run_recurring(Utc::now()).await?;
    Ok(Json(summary))
}

/// GET /cron/reminders - Send due automatic reminders.
async fn run_reminders(
    State(state): State<AppState>,
    header: BearerHeader,
) -> Result<Json<ReminderRunSummary>, ApiError> {
    authorize(&state, header)?;
    let summary = state.billing.run_reminders(Utc::now()).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use rstest::rstest;
    use tower::ServiceExt;

    use crate::test_support::{CRON_SECRET, TestApp, json_body};

    #[rstest]
    #[case::missing(None)]
    #[case::wrong(Some("Bearer nope"))]
    #[case::basic(Some("Basic Y3Jvbjp4"))]
    #[tokio::test]
    async fn test_cron_rejects_bad_credentials(#[case] header: Option<&str>) {
        let app = TestApp::new();
        let mut builder = Request::builder().uri("/api/v1/cron/recurring");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }

        let response = app
            .router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_cron_runs_with_secret() {
        let app = TestApp::new();
        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cron/reminders")
                    .header(AUTHORIZATION, format!("Bearer {CRON_SECRET}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["sent"], 0);
        assert_eq!(body["errors"], 0);
    }
}
