//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRegister {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Public user representation (no API key)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration response. This is the only place the API key is ever
/// returned; it cannot be retrieved again later.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRegisterResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub api_key: String,
}

/// The authenticated actor, resolved from the bearer API key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            display_name: db.display_name,
            is_staff: db.is_staff,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<UserDBResponse> for UserRegisterResponse {
    fn from(db: UserDBResponse) -> Self {
        let api_key = db.api_key.clone();
        Self {
            user: UserResponse::from(db),
            api_key,
        }
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            is_staff: db.is_staff,
        }
    }
}
