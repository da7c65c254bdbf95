//! Router test helpers backed by the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header::AUTHORIZATION},
};
use http_body_util::BodyExt;
use tally_core::billing::{BillingContext, BillingRules, BillingService};
use tally_core::document::{OwnerProfile, Plan};
use tally_core::store::InMemoryStore;
use tally_shared::config::WebhookConfig;
use tally_shared::types::{Currency, OwnerId};
use tally_shared::{JwtConfig, JwtService, MockMailer};

use crate::{AppState, create_router};

pub const CRON_SECRET: &str = "cron-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec-test";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<MockMailer>,
    pub owner: OwnerId,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(MockMailer::new());
        let owner = OwnerId::new();
        store
            .put_profile(OwnerProfile {
                owner_id: owner,
                business_name: "Studio Nine".to_string(),
                default_currency: Currency::Gbp,
                vat_included_default: false,
                plan: Plan::Pro,
            })
            .unwrap();
        let ctx = BillingContext::new(
            store.clone(),
            store.clone(),
            mailer.clone(),
            BillingRules::default(),
        );
        let state = AppState {
            billing: Arc::new(BillingService::new(ctx)),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
            cron_secret: Arc::from(CRON_SECRET),
            webhook: Arc::new(WebhookConfig {
                secret: WEBHOOK_SECRET.to_string(),
                tolerance_secs: 300,
            }),
        };
        Self {
            state,
            store,
            mailer,
            owner,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn bearer(&self) -> String {
        let token = self
            .state
            .jwt_service
            .generate_access_token(self.owner)
            .unwrap();
        format!("Bearer {token}")
    }

    pub fn owner_request(&self, method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, self.bearer());
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}

pub fn invoice_body(send_now: bool) -> serde_json::Value {
    serde_json::json!({
        "client": { "inline": { "name": "Acme Ltd", "email": "billing@acme.test" } },
        "line_items": [
            { "description": "Design work", "unit_amount": 10000 },
            { "description": "Hosting", "unit_amount": 5000, "discount_percent": "10" }
        ],
        "send_now": send_now
    })
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
