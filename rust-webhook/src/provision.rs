//! Idempotent user provisioning.
//!
//! A create for an external id that already exists counts as success, so
//! provider redeliveries and concurrent duplicates never surface as errors.
//! Deduplication is left entirely to the store's uniqueness constraint.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::store::{CreateOutcome, NewUser, StoreError, UserRecord, UserStore};

/// Fields for a user to provision, as built by the event router.
pub type ProvisionRequest = NewUser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionResult {
    Created(UserRecord),
    AlreadyProvisioned,
}

#[derive(Debug, Error)]
#[error("failed to provision user {external_user_id}: {source}")]
pub struct ProvisionError {
    pub external_user_id: String,
    #[source]
    pub source: StoreError,
}

/// Creates users through a [`UserStore`] with a bounded call time.
#[derive(Clone)]
pub struct UserProvisioner {
    store: Arc<dyn UserStore>,
    timeout: Duration,
}

impl UserProvisioner {
    pub fn new(store: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn provision(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionResult, ProvisionError> {
        let external_user_id = request.external_user_id.clone();

        let outcome = tokio::time::timeout(self.timeout, self.store.create_user(request))
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout(self.timeout)));

        match outcome {
            Ok(CreateOutcome::Created(record)) => {
                info!(external_user_id = %external_user_id, "user_provisioned");
                Ok(ProvisionResult::Created(record))
            }
            Ok(CreateOutcome::AlreadyExists) => {
                info!(external_user_id = %external_user_id, "user_already_provisioned");
                Ok(ProvisionResult::AlreadyProvisioned)
            }
            Err(source) => {
                error!(
                    external_user_id = %external_user_id,
                    error = %source,
                    "user_provision_failed"
                );
                Err(ProvisionError {
                    external_user_id,
                    source,
                })
            }
        }
    }
}
