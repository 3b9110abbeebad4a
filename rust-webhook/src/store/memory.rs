//! In-memory user store.
//!
//! Uniqueness holds within one process only. Fine for tests and local runs;
//! multi-instance deployments need [`super::HttpUserStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CreateOutcome, NewUser, StoreError, UserRecord, UserStore};

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, external_user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(external_user_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome, StoreError> {
        // Check and insert under one write lock so racing creates see each other.
        let mut users = self.users.write().await;

        if users.contains_key(&user.external_user_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let record = UserRecord::from(user);
        users.insert(record.external_user_id.clone(), record.clone());

        Ok(CreateOutcome::Created(record))
    }
}
