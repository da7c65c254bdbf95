//! Error responses.
//!
//! Every failure leaves the API as `{"error": CODE, "message": text}` with
//! the status code owned by the underlying error type.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tally_core::billing::BillingError;
use tally_shared::AppError;
use tracing::error;

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A billing operation failed.
    Billing(BillingError),
    /// The request was rejected at the HTTP edge.
    App(AppError),
}

impl ApiError {
    /// Returns the HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Billing(err) => err.status_code(),
            Self::App(err) => err.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Billing(err) => err.error_code(),
            Self::App(err) => err.error_code(),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self::Billing(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        }
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            match &self {
                Self::Billing(err) => err.to_string(),
                Self::App(err) => err.to_string(),
            }
        };

        let mut response = (
            status,
            Json(json!({ "error": self.code(), "message": message })),
        )
            .into_response();

        if let Self::Billing(BillingError::RateLimited { retry_after }) = &self {
            let seconds = (*retry_after - Utc::now()).num_seconds().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use http_body_util::BodyExt;
    use tally_core::store::StoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::from(BillingError::NotFound { what: "Invoice" }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Invoice not found");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let err = BillingError::RateLimited {
            retry_after: Utc::now() + TimeDelta::hours(2),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: i64 = response.headers()[RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 7000 && retry <= 7200);
    }

    #[tokio::test]
    async fn test_store_failure_hides_detail() {
        let err = BillingError::Store(StoreError::Database("connection reset".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_app_error_unauthorized() {
        let response =
            ApiError::from(AppError::Unauthorized("bad cron token".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "UNAUTHORIZED");
    }
}
