//! Database models for users.

use crate::api::models::users::UserRegister;
use crate::crypto;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub api_key: String,
    pub is_staff: bool,
}

impl From<UserRegister> for UserCreateDBRequest {
    fn from(api: UserRegister) -> Self {
        Self {
            username: api.username,
            email: api.email,
            display_name: api.display_name,
            // A fresh key is generated per registration; it is returned once
            // in the registration response and never listed afterwards.
            api_key: crypto::generate_api_key(),
            is_staff: false, // API users cannot create staff accounts
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub api_key: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
