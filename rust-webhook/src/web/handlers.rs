//! Webhook endpoint handlers.
//!
//! The Clerk endpoint runs one request through:
//! 1. Envelope extraction (headers + raw body)
//! 2. Signature verification
//! 3. Event decoding and routing
//! 4. Provisioning, when the event calls for it
//!
//! Every failure becomes a [`WebhookError`] and is mapped to a status there.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::provision::{ProvisionResult, UserProvisioner};
use crate::router::{route, Action, RoutingOutcome};
use crate::store::UserStore;
use crate::web::envelope::{decode_event, parse_envelope};
use crate::web::error::WebhookError;
use crate::web::signature::WebhookVerifier;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<WebhookVerifier>,
    pub provisioner: UserProvisioner,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn UserStore>) -> Self {
        Self {
            verifier: Arc::new(WebhookVerifier::new(
                config.signing_secret.clone(),
                config.webhook_tolerance(),
            )),
            provisioner: UserProvisioner::new(store, config.user_store_timeout()),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Clerk Webhook
// =============================================================================

/// Clerk webhook endpoint.
///
/// Responds `200` with an empty body when the event was handled or ignored.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let envelope = parse_envelope(&headers, body)?;

    info!(
        event_id = %envelope.id,
        body_length = envelope.raw_body.len(),
        "clerk_webhook_received"
    );

    let payload = state.verifier.verify(envelope)?;
    let event = decode_event(&payload)?;

    match route(&event) {
        RoutingOutcome::Ignored => Ok(StatusCode::OK),
        RoutingOutcome::Rejected(reason) => Err(WebhookError::Rejected(reason)),
        RoutingOutcome::Dispatch(Action::CreateUser(request)) => {
            let result = state.provisioner.provision(request).await?;

            info!(
                event_id = %event.id(),
                created = matches!(result, ProvisionResult::Created(_)),
                "clerk_webhook_handled"
            );

            Ok(StatusCode::OK)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use crate::store::{CreateOutcome, MemoryUserStore, NewUser, Patch, StoreError};
    use crate::web::app;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;

    const SCENARIO_A: &str = r#"{"type":"user.created","data":{"id":"u_1","email_addresses":[{"email_address":"a@x.com"}],"first_name":"Ann"}}"#;

    fn config() -> Config {
        Config {
            port: 0,
            signing_secret: SigningSecret::from_bytes(b"test-signing-key".to_vec()),
            webhook_tolerance_secs: 300,
            user_store_url: None,
            user_store_token: None,
            user_store_timeout_ms: 1000,
        }
    }

    /// Store double that records every create call.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<NewUser>>,
        outcome: Option<fn() -> Result<CreateOutcome, StoreError>>,
    }

    impl RecordingStore {
        fn with_outcome(outcome: fn() -> Result<CreateOutcome, StoreError>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcome: Some(outcome),
            }
        }

        fn calls(&self) -> Vec<NewUser> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserStore for RecordingStore {
        async fn create_user(&self, user: NewUser) -> Result<CreateOutcome, StoreError> {
            self.calls.lock().unwrap().push(user.clone());
            match self.outcome {
                Some(outcome) => outcome(),
                None => Ok(CreateOutcome::Created(user.into())),
            }
        }
    }

    fn app_with(store: Arc<dyn UserStore>) -> Router {
        app(AppState::new(&config(), store))
    }

    fn now() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string()
    }

    fn signed_request(body: &str) -> Request<Body> {
        let timestamp = now();
        let verifier = WebhookVerifier::new(
            config().signing_secret,
            Duration::from_secs(300),
        );
        let signature = verifier
            .signature_header("evt_1", &timestamp, body.as_bytes())
            .unwrap();

        request("evt_1", &timestamp, &signature, body)
    }

    fn request(id: &str, timestamp: &str, signature: &str, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/clerk")
            .header("content-type", "application/json");

        for (name, value) in [
            ("svix-id", id),
            ("svix-timestamp", timestamp),
            ("svix-signature", signature),
        ] {
            if !value.is_empty() {
                builder = builder.header(name, value);
            }
        }

        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(
            app_with(Arc::new(MemoryUserStore::new())),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_scenario_a_user_created() {
        let store = Arc::new(RecordingStore::default());

        let (status, body) = send(app_with(store.clone()), signed_request(SCENARIO_A)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
        assert_eq!(
            store.calls(),
            vec![NewUser {
                external_user_id: "u_1".to_string(),
                email: "a@x.com".to_string(),
                first_name: Patch::Set("Ann".to_string()),
                last_name: Patch::Unspecified,
                image_url: Patch::Unspecified,
            }]
        );
    }

    #[tokio::test]
    async fn test_scenario_b_empty_emails() {
        let store = Arc::new(RecordingStore::default());
        let body = r#"{"type":"user.created","data":{"id":"u_1","email_addresses":[],"first_name":"Ann"}}"#;

        let (status, _) = send(app_with(store.clone()), signed_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_c_bad_signature() {
        let store = Arc::new(RecordingStore::default());
        let req = request("evt_1", &now(), "v1,dGhpcyBpcyBub3QgdGhlIGhtYWM=", SCENARIO_A);

        let (status, body) = send(app_with(store.clone()), req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error occurred during verification");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_d_unrecognized_type() {
        let store = Arc::new(RecordingStore::default());
        let body = r#"{"type":"user.deleted","data":{"id":"u_1","deleted":true}}"#;

        let (status, _) = send(app_with(store.clone()), signed_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_e_already_exists() {
        let store = Arc::new(RecordingStore::with_outcome(|| Ok(CreateOutcome::AlreadyExists)));

        let (status, _) = send(app_with(store.clone()), signed_request(SCENARIO_A)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let store = Arc::new(RecordingStore::with_outcome(|| {
            Err(StoreError::Backend("connection refused".to_string()))
        }));

        let (status, body) = send(app_with(store), signed_request(SCENARIO_A)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error occurred while creating user");
    }

    #[tokio::test]
    async fn test_missing_any_header_is_400() {
        let store = Arc::new(RecordingStore::default());
        let ts = now();

        for (id, timestamp, signature) in [
            ("", ts.as_str(), "v1,abc"),
            ("evt_1", "", "v1,abc"),
            ("evt_1", ts.as_str(), ""),
        ] {
            let req = request(id, timestamp, signature, SCENARIO_A);
            let (status, body) = send(app_with(store.clone()), req).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, "Error occurred -- missing svix headers");
        }

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_after_verification_is_400() {
        let store = Arc::new(RecordingStore::default());

        let (status, body) = send(app_with(store.clone()), signed_request(r#"{"data":{}}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error occurred -- invalid payload");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let store = MemoryUserStore::new();
        let app = app_with(Arc::new(store.clone()));

        let (first, _) = send(app.clone(), signed_request(SCENARIO_A)).await;
        let (second, _) = send(app, signed_request(SCENARIO_A)).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("u_1").await.unwrap().email, "a@x.com");
    }
}
