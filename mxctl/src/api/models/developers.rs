//! API request/response models for developer profiles.

use crate::db::models::developers::DeveloperDBResponse;
use crate::types::{DeveloperId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};

/// Developer account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "developer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeveloperStatus {
    Active,
    Inactive,
    Suspended,
    PendingApproval,
}

/// Request to register a developer profile for the current user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeveloperRegister {
    pub developer_name: String,
    pub company_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uri")]
    pub website_url: Option<Url>,
    pub bio: Option<String>,
}

/// Request to update a developer profile.
///
/// `monthly_quota_limit` may only be changed by staff.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeveloperUpdate {
    pub company_name: Option<String>,
    #[schema(value_type = Option<String>, format = "uri")]
    pub website_url: Option<Url>,
    pub bio: Option<String>,
    pub monthly_quota_limit: Option<i64>,
}

/// Developer profile details, including quota state and cumulative revenue
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeveloperResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: DeveloperId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub developer_name: String,
    pub company_name: Option<String>,
    pub website_url: Option<String>,
    pub bio: String,
    pub status: DeveloperStatus,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub monthly_quota_limit: i64,
    pub current_month_usage: i64,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeveloperDBResponse> for DeveloperResponse {
    fn from(db: DeveloperDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            developer_name: db.developer_name,
            company_name: db.company_name,
            website_url: db.website_url,
            bio: db.bio,
            status: db.status,
            is_verified: db.is_verified,
            verified_at: db.verified_at,
            monthly_quota_limit: db.monthly_quota_limit,
            current_month_usage: db.current_month_usage,
            total_revenue: db.total_revenue,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing developers
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDevelopersQuery {
    /// Number of entries to skip
    pub skip: Option<i64>,
    /// Maximum number of entries to return
    pub limit: Option<i64>,
    /// Filter by status
    pub status: Option<DeveloperStatus>,
}
