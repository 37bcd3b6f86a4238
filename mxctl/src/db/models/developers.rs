//! Database models for developer profiles.

use crate::api::models::developers::{DeveloperRegister, DeveloperStatus, DeveloperUpdate};
use crate::types::{DeveloperId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a developer profile
#[derive(Debug, Clone)]
pub struct DeveloperCreateDBRequest {
    pub user_id: UserId,
    pub developer_name: String,
    pub company_name: Option<String>,
    pub website_url: Option<String>,
    pub bio: String,
    pub monthly_quota_limit: i64,
}

impl DeveloperCreateDBRequest {
    pub fn new(user_id: UserId, api: DeveloperRegister, monthly_quota_limit: i64) -> Self {
        Self {
            user_id,
            developer_name: api.developer_name,
            company_name: api.company_name,
            website_url: api.website_url.map(|u| u.to_string()),
            bio: api.bio.unwrap_or_default(),
            monthly_quota_limit,
        }
    }
}

/// Database request for updating a developer profile
#[derive(Debug, Clone, Default)]
pub struct DeveloperUpdateDBRequest {
    pub company_name: Option<String>,
    pub website_url: Option<String>,
    pub bio: Option<String>,
    pub monthly_quota_limit: Option<i64>,
}

impl From<DeveloperUpdate> for DeveloperUpdateDBRequest {
    fn from(api: DeveloperUpdate) -> Self {
        Self {
            company_name: api.company_name,
            website_url: api.website_url.map(|u| u.to_string()),
            bio: api.bio,
            monthly_quota_limit: api.monthly_quota_limit,
        }
    }
}

/// Database response for a developer profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeveloperDBResponse {
    pub id: DeveloperId,
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
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeveloperDBResponse {
    /// Whether the developer can spend `requested_calls` more invocations
    /// this month without exceeding their quota.
    pub fn has_quota(&self, requested_calls: i64) -> bool {
        self.current_month_usage + requested_calls <= self.monthly_quota_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn developer(usage: i64, limit: i64) -> DeveloperDBResponse {
        DeveloperDBResponse {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            developer_name: "acme".to_string(),
            company_name: None,
            website_url: None,
            bio: String::new(),
            status: DeveloperStatus::Active,
            is_verified: false,
            verified_at: None,
            monthly_quota_limit: limit,
            current_month_usage: usage,
            total_revenue: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn quota_boundary() {
        assert!(developer(0, 10).has_quota(1));
        assert!(developer(9, 10).has_quota(1));
        assert!(!developer(10, 10).has_quota(1));
        assert!(!developer(8, 10).has_quota(3));
    }
}
