//! Signed envelope extraction and post-verification body decoding.
//!
//! The body is captured as raw bytes before any JSON work so the signature
//! check sees exactly what the provider signed. Decoding only happens on a
//! [`VerifiedPayload`], which can only come out of the signature verifier.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

use crate::event::VerifiedEvent;
use crate::web::signature::VerifiedPayload;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

/// Unbranded header names accepted when the svix-* ones are absent.
const FALLBACK_ID_HEADER: &str = "webhook-id";
const FALLBACK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
const FALLBACK_SIGNATURE_HEADER: &str = "webhook-signature";

/// Untrusted inbound payload plus its three authentication headers.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
    pub raw_body: Bytes,
}

/// The request is missing part of the envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("missing svix headers: {}", .0.join(", "))]
    MissingHeaders(Vec<&'static str>),

    #[error("empty request body")]
    EmptyBody,
}

/// The verified body is not a well-formed event.
#[derive(Debug, Error)]
#[error("invalid event body: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Extract the envelope from request headers and the raw body.
///
/// Header lookup is case-insensitive. Every missing or empty header is named
/// in the error.
pub fn parse_envelope(
    headers: &HeaderMap,
    body: Bytes,
) -> Result<SignedEnvelope, EnvelopeError> {
    let id = header_value(headers, ID_HEADER, FALLBACK_ID_HEADER);
    let timestamp = header_value(headers, TIMESTAMP_HEADER, FALLBACK_TIMESTAMP_HEADER);
    let signature = header_value(headers, SIGNATURE_HEADER, FALLBACK_SIGNATURE_HEADER);

    match (id, timestamp, signature) {
        (Some(id), Some(timestamp), Some(signature)) => {
            if body.is_empty() {
                return Err(EnvelopeError::EmptyBody);
            }

            Ok(SignedEnvelope {
                id,
                timestamp,
                signature,
                raw_body: body,
            })
        }
        (id, timestamp, signature) => {
            let missing = [
                (ID_HEADER, id.is_none()),
                (TIMESTAMP_HEADER, timestamp.is_none()),
                (SIGNATURE_HEADER, signature.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            Err(EnvelopeError::MissingHeaders(missing))
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str, fallback: &str) -> Option<String> {
    [name, fallback]
        .into_iter()
        .filter_map(|n| headers.get(n))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Top-level event shape. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Decode a verified body into a typed event.
pub fn decode_event(payload: &VerifiedPayload) -> Result<VerifiedEvent, DecodeError> {
    let raw: RawEvent = serde_json::from_slice(payload.body())?;

    Ok(VerifiedEvent {
        id: payload.id().to_string(),
        event_type: raw.event_type,
        object: raw.object,
        timestamp: raw.timestamp,
        data: raw.data,
    })
}
