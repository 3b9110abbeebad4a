//! Event types delivered by the identity provider.
//!
//! Only the fields this service consumes are modelled; everything else in the
//! provider's payload is ignored on deserialization.

use serde::{Deserialize, Deserializer};

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// An event whose envelope passed signature verification.
///
/// Built only by [`crate::web::envelope::decode_event`] from a verified payload.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    pub(crate) id: String,
    pub(crate) event_type: String,
    pub(crate) object: Option<String>,
    pub(crate) timestamp: Option<i64>,
    pub(crate) data: serde_json::Value,
}

impl VerifiedEvent {
    /// Delivery id from the envelope headers.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Provider-side creation time in milliseconds, when present.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    #[cfg(test)]
    pub(crate) fn for_tests(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: "evt_test".to_string(),
            event_type: event_type.to_string(),
            object: Some("event".to_string()),
            timestamp: None,
            data,
        }
    }
}

/// `data` of a `user.created` event.
///
/// Empty strings are read as absent, matching how the provider fills unset
/// profile fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEventData {
    #[serde(default, rename = "id", deserialize_with = "non_empty")]
    pub external_id: Option<String>,

    #[serde(default, rename = "email_addresses")]
    pub emails: Option<Vec<EmailAddress>>,

    #[serde(default, deserialize_with = "non_empty")]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub image_url: Option<String>,
}

/// One entry of a user's ordered email address list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailAddress {
    #[serde(default, rename = "email_address", deserialize_with = "non_empty")]
    pub address: Option<String>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_event_data_full() {
        let data: UserEventData = serde_json::from_value(json!({
            "id": "u_1",
            "email_addresses": [
                { "id": "idn_1", "email_address": "a@x.com" },
                { "id": "idn_2", "email_address": "b@x.com" }
            ],
            "first_name": "Ann",
            "last_name": "Lee",
            "image_url": "https://img.example/u_1.png",
            "primary_email_address_id": "idn_1"
        }))
        .unwrap();

        assert_eq!(data.external_id.as_deref(), Some("u_1"));
        let emails = data.emails.unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[1].address.as_deref(), Some("b@x.com"));
        assert_eq!(data.first_name.as_deref(), Some("Ann"));
        assert_eq!(data.last_name.as_deref(), Some("Lee"));
        assert_eq!(data.image_url.as_deref(), Some("https://img.example/u_1.png"));
    }

    #[test]
    fn test_user_event_data_blank_and_null_fields() {
        let data: UserEventData = serde_json::from_value(json!({
            "id": "",
            "email_addresses": [{}],
            "first_name": null,
            "last_name": ""
        }))
        .unwrap();

        assert!(data.external_id.is_none());
        assert!(data.emails.unwrap()[0].address.is_none());
        assert!(data.first_name.is_none());
        assert!(data.last_name.is_none());
        assert!(data.image_url.is_none());
    }
}
