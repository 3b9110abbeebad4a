//! Mapping of webhook failures to HTTP responses.
//!
//! Client-side problems are `400` so the provider stops retrying; store
//! failures are `500` so it retries.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::provision::ProvisionError;
use crate::web::envelope::{DecodeError, EnvelopeError};
use crate::web::signature::VerificationError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("event rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Envelope(_)
            | WebhookError::Verification(_)
            | WebhookError::Decode(_)
            | WebhookError::Rejected(_) => StatusCode::BAD_REQUEST,
            WebhookError::Provision(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short diagnostic returned to the caller.
    fn message(&self) -> &'static str {
        match self {
            WebhookError::Envelope(EnvelopeError::MissingHeaders(_)) => {
                "Error occurred -- missing svix headers"
            }
            WebhookError::Envelope(EnvelopeError::EmptyBody) => "Error occurred -- empty body",
            WebhookError::Verification(_) => "Error occurred during verification",
            WebhookError::Decode(_) => "Error occurred -- invalid payload",
            WebhookError::Rejected(_) => "Error occurred -- missing data",
            WebhookError::Provision(_) => "Error occurred while creating user",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(status_code = status.as_u16(), error = %self, "webhook_failed");
        } else {
            warn!(status_code = status.as_u16(), error = %self, "webhook_rejected");
        }

        (status, self.message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_status_mapping() {
        let client_errors = [
            WebhookError::from(EnvelopeError::MissingHeaders(vec!["svix-id"])),
            WebhookError::from(EnvelopeError::EmptyBody),
            WebhookError::from(VerificationError::SignatureMismatch),
            WebhookError::from(VerificationError::TimestampTooOld),
            WebhookError::Rejected("missing user id".to_string()),
        ];
        for err in client_errors {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{}", err);
        }

        let store_failure = WebhookError::from(ProvisionError {
            external_user_id: "u_1".to_string(),
            source: StoreError::Backend("down".to_string()),
        });
        assert_eq!(store_failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_decode_error_is_client_error() {
        let err: WebhookError = serde_json::from_str::<serde_json::Value>("{")
            .map_err(DecodeError::from)
            .unwrap_err()
            .into();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
