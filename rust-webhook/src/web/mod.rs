//! Web server module for the Clerk webhook endpoint.
//!
//! This module provides:
//! - Envelope extraction and signature verification
//! - The webhook handler and its error-to-status mapping
//! - The axum [`Router`] wiring both endpoints

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use envelope::{decode_event, parse_envelope, DecodeError, EnvelopeError, SignedEnvelope};
pub use error::WebhookError;
pub use handlers::{clerk_webhook, health, AppState, HealthResponse};
pub use signature::{VerificationError, VerifiedPayload, WebhookVerifier};

/// Path the identity provider delivers webhooks to.
pub const CLERK_WEBHOOK_PATH: &str = "/api/webhooks/clerk";

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(CLERK_WEBHOOK_PATH, post(clerk_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
