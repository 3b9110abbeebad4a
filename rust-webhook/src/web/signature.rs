//! Webhook signature verification.
//!
//! Clerk delivers webhooks through Svix, which signs `{id}.{timestamp}.{body}`
//! with HMAC-SHA256 and sends one or more base64 signatures in the
//! `svix-signature` header, e.g. `v1,g0hM9SsE+OTPJTGt/tmIKtSyZlE3uFJELVlNIOLJ1OE=`.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

use crate::config::SigningSecret;
use crate::web::envelope::SignedEnvelope;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_VERSION: &str = "v1";

/// Why a signed envelope was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no well-formed signature in header")]
    MalformedSignature,

    #[error("no matching signature found")]
    SignatureMismatch,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("message timestamp too old")]
    TimestampTooOld,

    #[error("message timestamp too new")]
    TimestampTooNew,

    #[error("signing key rejected by HMAC")]
    InvalidKey,
}

/// Body and id of an envelope whose signature checked out.
///
/// Only [`WebhookVerifier`] hands these out.
#[derive(Debug, Clone)]
pub struct VerifiedPayload {
    id: String,
    body: Bytes,
}

impl VerifiedPayload {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            body: Bytes::from(body.to_string()),
        }
    }
}

/// Verifies signed envelopes against a single secret.
///
/// Holds no mutable state, so one instance can be shared by every request.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: SigningSecret,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: SigningSecret, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify an envelope against the current wall clock.
    pub fn verify(&self, envelope: SignedEnvelope) -> Result<VerifiedPayload, VerificationError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        self.verify_at(envelope, now)
    }

    /// Verify an envelope as if the current time were `now` (Unix seconds).
    pub fn verify_at(
        &self,
        envelope: SignedEnvelope,
        now: i64,
    ) -> Result<VerifiedPayload, VerificationError> {
        self.check_timestamp(&envelope.timestamp, now)?;

        let expected = self.sign(&envelope.id, &envelope.timestamp, &envelope.raw_body)?;

        let mut well_formed = 0usize;
        let mut matched = false;

        for candidate in envelope.signature.split_whitespace() {
            let Some((version, encoded)) = candidate.split_once(',') else {
                continue;
            };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(provided) = STANDARD.decode(encoded) else {
                continue;
            };

            well_formed += 1;
            // Keep scanning after a match so timing does not reveal its position.
            matched |= constant_time_compare(&expected, &provided);
        }

        if well_formed == 0 {
            warn!(
                event_id = %envelope.id,
                signature_length = envelope.signature.len(),
                "webhook_signature_malformed"
            );
            return Err(VerificationError::MalformedSignature);
        }

        if !matched {
            warn!(
                event_id = %envelope.id,
                candidates = well_formed,
                "webhook_signature_mismatch"
            );
            return Err(VerificationError::SignatureMismatch);
        }

        Ok(VerifiedPayload {
            id: envelope.id,
            body: envelope.raw_body,
        })
    }

    /// Compute the HMAC-SHA256 over `{id}.{timestamp}.{body}`.
    pub fn sign(
        &self,
        id: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, VerificationError> {
        let mut mac = match <HmacSha256 as Mac>::new_from_slice(self.secret.key()) {
            Ok(m) => m,
            Err(_) => {
                warn!("webhook_signature_invalid_key");
                return Err(VerificationError::InvalidKey);
            }
        };
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Header value carrying a single `v1` signature for the given parts.
    pub fn signature_header(
        &self,
        id: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<String, VerificationError> {
        let signature = self.sign(id, timestamp, body)?;
        Ok(format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(signature)))
    }

    fn check_timestamp(&self, timestamp: &str, now: i64) -> Result<(), VerificationError> {
        let webhook_time: i64 = match timestamp.trim().parse() {
            Ok(t) => t,
            Err(_) => {
                warn!(timestamp = %timestamp, "webhook_signature_invalid_timestamp");
                return Err(VerificationError::InvalidTimestamp);
            }
        };

        let tolerance = self.tolerance.as_secs() as i64;

        if webhook_time < now.saturating_sub(tolerance) {
            warn!(
                webhook_time = webhook_time,
                current_time = now,
                tolerance_seconds = tolerance,
                "webhook_signature_stale"
            );
            return Err(VerificationError::TimestampTooOld);
        }

        if webhook_time > now.saturating_add(tolerance) {
            warn!(
                webhook_time = webhook_time,
                current_time = now,
                tolerance_seconds = tolerance,
                "webhook_signature_from_future"
            );
            return Err(VerificationError::TimestampTooNew);
        }

        Ok(())
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}
