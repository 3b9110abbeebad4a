//! ClerkSync - verified user provisioning from Clerk webhooks.
//!
//! The `clerksync-web` binary receives Clerk (Svix-signed) webhooks and
//! creates a local user record for every `user.created` event.
//!
//! ## Architecture
//!
//! ```text
//! POST /api/webhooks/clerk
//!   → web::envelope (headers + raw body)
//!   → web::signature (HMAC check, replay window)
//!   → router (event type → action)
//!   → provision (idempotent create)
//!   → store (user service or in-memory)
//! ```

pub mod config;
pub mod event;
pub mod provision;
pub mod router;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, SigningSecret};
pub use event::VerifiedEvent;
pub use provision::{ProvisionError, ProvisionRequest, ProvisionResult, UserProvisioner};
pub use router::{route, Action, RoutingOutcome};
pub use store::{CreateOutcome, HttpUserStore, MemoryUserStore, NewUser, UserRecord, UserStore};
pub use web::{app, AppState};
