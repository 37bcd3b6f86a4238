//! Database models for model listings.

use crate::api::models::listings::{ModelCategory, ModelCreate, ModelStatus, ModelUpdate, PricingMode};
use crate::types::{DeveloperId, ModelId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a model listing
#[derive(Debug, Clone)]
pub struct ListingCreateDBRequest {
    pub developer_id: DeveloperId,
    pub name: String,
    pub description: String,
    pub category: ModelCategory,
    pub api_name: String,
    pub endpoint_url: String,
    pub is_public: bool,
    pub pricing_mode: PricingMode,
    pub price_per_request: Decimal,
    pub price_per_token: Decimal,
    pub monthly_subscription_price: Decimal,
    pub rate_limit_per_minute: i64,
    pub rate_limit_per_hour: i64,
    pub rate_limit_per_day: i64,
}

impl ListingCreateDBRequest {
    pub fn new(developer_id: DeveloperId, api: ModelCreate) -> Self {
        Self {
            developer_id,
            name: api.name,
            description: api.description,
            category: api.category,
            api_name: api.api_name,
            endpoint_url: api.endpoint_url.to_string(),
            is_public: api.is_public.unwrap_or(true),
            pricing_mode: api.pricing_mode,
            price_per_request: api.price_per_request.unwrap_or_else(|| Decimal::new(1, 4)),
            price_per_token: api.price_per_token.unwrap_or_else(|| Decimal::new(1, 6)),
            monthly_subscription_price: api.monthly_subscription_price.unwrap_or(Decimal::ZERO),
            rate_limit_per_minute: api.rate_limit_per_minute.unwrap_or(60),
            rate_limit_per_hour: api.rate_limit_per_hour.unwrap_or(1_000),
            rate_limit_per_day: api.rate_limit_per_day.unwrap_or(10_000),
        }
    }
}

/// Database request for updating a model listing
#[derive(Debug, Clone, Default)]
pub struct ListingUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ModelCategory>,
    pub endpoint_url: Option<String>,
    pub status: Option<ModelStatus>,
    pub is_public: Option<bool>,
    pub pricing_mode: Option<PricingMode>,
    pub price_per_request: Option<Decimal>,
    pub price_per_token: Option<Decimal>,
    pub monthly_subscription_price: Option<Decimal>,
    pub rate_limit_per_minute: Option<i64>,
    pub rate_limit_per_hour: Option<i64>,
    pub rate_limit_per_day: Option<i64>,
}

impl From<ModelUpdate> for ListingUpdateDBRequest {
    fn from(api: ModelUpdate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            category: api.category,
            endpoint_url: api.endpoint_url.map(|u| u.to_string()),
            status: api.status,
            is_public: api.is_public,
            pricing_mode: api.pricing_mode,
            price_per_request: api.price_per_request,
            price_per_token: api.price_per_token,
            monthly_subscription_price: api.monthly_subscription_price,
            rate_limit_per_minute: api.rate_limit_per_minute,
            rate_limit_per_hour: api.rate_limit_per_hour,
            rate_limit_per_day: api.rate_limit_per_day,
        }
    }
}

/// Database response for a model listing.
///
/// `total_requests`, `average_response_time`, `success_rate`,
/// `average_rating`, and `total_reviews` are maintained exclusively by the
/// metering engine and the rating recompute.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListingDBResponse {
    pub id: ModelId,
    pub developer_id: DeveloperId,
    pub name: String,
    pub description: String,
    pub category: ModelCategory,
    pub api_name: String,
    pub endpoint_url: String,
    pub status: ModelStatus,
    pub is_public: bool,
    pub pricing_mode: PricingMode,
    pub price_per_request: Decimal,
    pub price_per_token: Decimal,
    pub monthly_subscription_price: Decimal,
    pub rate_limit_per_minute: i64,
    pub rate_limit_per_hour: i64,
    pub rate_limit_per_day: i64,
    pub total_requests: i64,
    pub average_response_time: f64,
    pub success_rate: f64,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
