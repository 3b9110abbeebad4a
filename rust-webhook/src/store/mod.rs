//! User store collaborator.
//!
//! Persistence lives outside this service. The store enforces uniqueness of
//! `external_user_id`, and reports a duplicate as
//! [`CreateOutcome::AlreadyExists`] instead of an error.
//!
//! ## Implementations
//!
//! - [`HttpUserStore`]: the user service's REST API
//! - [`MemoryUserStore`]: process-local map for tests and local runs

pub mod http;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub use http::HttpUserStore;
pub use memory::MemoryUserStore;

/// Presence of an optional field in a write.
///
/// `Unspecified` leaves the stored value alone on update and uses the store's
/// default on create; `Clear` explicitly removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unspecified,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Patch::Unspecified)
    }

    /// `Set` for `Some`, `Unspecified` for `None`.
    pub fn from_present(value: Option<T>) -> Self {
        value.map_or(Patch::Unspecified, Patch::Set)
    }

    /// Value to persist on creation.
    pub fn into_created(self) -> Option<T> {
        match self {
            Patch::Set(v) => Some(v),
            Patch::Unspecified | Patch::Clear => None,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(v) => v.serialize(serializer),
            Patch::Unspecified | Patch::Clear => serializer.serialize_none(),
        }
    }
}

/// Fields sent to the store when creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub external_user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Patch::is_unspecified")]
    pub first_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unspecified")]
    pub last_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_unspecified")]
    pub image_url: Patch<String>,
}

/// A persisted user, keyed by `external_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub external_user_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<NewUser> for UserRecord {
    fn from(user: NewUser) -> Self {
        Self {
            external_user_id: user.external_user_id,
            email: user.email,
            first_name: user.first_name.into_created(),
            last_name: user.last_name.into_created(),
            image_url: user.image_url.into_created(),
        }
    }
}

/// Successful result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(UserRecord),
    /// A record with the same `external_user_id` already exists.
    AlreadyExists,
}

/// Store failures. All of them are worth a provider retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("user store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("user store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("user store backend error: {0}")]
    Backend(String),
}

/// Create-only persistence for provisioned users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user, or report that one with the same key already exists.
    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome, StoreError>;
}
