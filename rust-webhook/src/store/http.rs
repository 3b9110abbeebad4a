//! User store backed by the user service's REST API.
//!
//! `POST {base}/users` with the create fields as JSON:
//! - `200`/`201` → created, response body is the stored record
//! - `409` → a user with this external id already exists
//! - anything else → [`StoreError::Status`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, info};

use super::{CreateOutcome, NewUser, StoreError, UserRecord, UserStore};

#[derive(Clone)]
pub struct HttpUserStore {
    client: Client,
    users_url: String,
    token: Option<String>,
}

impl HttpUserStore {
    /// Create a store client. `timeout` bounds every request end to end.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            users_url: format!("{}/users", base_url.trim_end_matches('/')),
            token,
        })
    }
}

#[async_trait]
impl UserStore for HttpUserStore {
    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome, StoreError> {
        let mut request = self.client.post(&self.users_url).json(&user);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    external_user_id = %user.external_user_id,
                    is_timeout = e.is_timeout(),
                    error = %e,
                    "user_store_request_failed"
                );
                return Err(StoreError::Transport(e));
            }
        };

        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let record: UserRecord = response.json().await?;
                info!(
                    external_user_id = %record.external_user_id,
                    status_code = status.as_u16(),
                    "user_store_created"
                );
                Ok(CreateOutcome::Created(record))
            }
            StatusCode::CONFLICT => {
                info!(
                    external_user_id = %user.external_user_id,
                    "user_store_conflict"
                );
                Ok(CreateOutcome::AlreadyExists)
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                let body = body.chars().take(200).collect::<String>();
                error!(
                    external_user_id = %user.external_user_id,
                    status_code = status.as_u16(),
                    body_preview = %body,
                    "user_store_unexpected_status"
                );
                Err(StoreError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
