//! Thin bearer-key authentication.
//!
//! Actors authenticate with the API key issued at registration, passed as
//! `Authorization: Bearer mx-...`. Handlers pull the resolved actor out of
//! the request with the [`current_user::CurrentUser`] extractor, or
//! [`current_user::OptionalUser`] on endpoints that accept anonymous actors
//! (usage recording and rate-limit probes).
//!
//! Session cookies, token issuance, and federated login are out of scope;
//! they belong to a fronting identity layer.

pub mod current_user;

pub use current_user::OptionalUser;

use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};

/// Reject non-staff actors for staff-only operations.
pub fn require_staff(user: &CurrentUser, action: &str, resource: &str) -> Result<()> {
    if user.is_staff {
        Ok(())
    } else {
        Err(Error::Forbidden {
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}
