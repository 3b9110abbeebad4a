//! Event routing.
//!
//! Turns a verified event into the action to perform. Routing is pure: it
//! never touches the store, so the request handler decides what to run.
//!
//! ```text
//! VerifiedEvent → route() → Dispatch(Action) | Ignored | Rejected(reason)
//! ```
//!
//! Unknown event types are acknowledged and ignored so new provider events do
//! not trigger retries. `user.updated` and `user.deleted` are ignored for now;
//! handling them means adding an [`Action`] variant and a match arm.

use tracing::{info, warn};

use crate::event::{UserEventData, VerifiedEvent, USER_CREATED};
use crate::provision::ProvisionRequest;
use crate::store::{NewUser, Patch};

/// Work to run for a routed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateUser(ProvisionRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    Dispatch(Action),
    /// Event type has no handler.
    Ignored,
    /// Recognized event type with unusable data.
    Rejected(String),
}

/// Route a verified event to its action.
pub fn route(event: &VerifiedEvent) -> RoutingOutcome {
    let outcome = match event.event_type() {
        USER_CREATED => route_user_created(event),
        _ => RoutingOutcome::Ignored,
    };

    match &outcome {
        RoutingOutcome::Dispatch(_) => {
            info!(event_id = %event.id(), event_type = %event.event_type(), "webhook_routing");
        }
        RoutingOutcome::Ignored => {
            info!(event_id = %event.id(), event_type = %event.event_type(), "webhook_event_ignored");
        }
        RoutingOutcome::Rejected(reason) => {
            warn!(
                event_id = %event.id(),
                event_type = %event.event_type(),
                reason = %reason,
                "webhook_event_rejected"
            );
        }
    }

    outcome
}

fn route_user_created(event: &VerifiedEvent) -> RoutingOutcome {
    let data: UserEventData = match serde_json::from_value(event.data().clone()) {
        Ok(d) => d,
        Err(e) => return RoutingOutcome::Rejected(format!("invalid user data: {}", e)),
    };

    let Some(external_id) = data.external_id else {
        return RoutingOutcome::Rejected("missing user id".to_string());
    };

    let Some(primary) = data.emails.and_then(|emails| emails.into_iter().next()) else {
        return RoutingOutcome::Rejected("missing email addresses".to_string());
    };

    RoutingOutcome::Dispatch(Action::CreateUser(NewUser {
        external_user_id: external_id,
        email: primary.address.unwrap_or_default(),
        first_name: Patch::from_present(data.first_name),
        last_name: Patch::from_present(data.last_name),
        image_url: Patch::from_present(data.image_url),
    }))
}
