//! API request/response models for the model catalog.

use crate::db::models::listings::ListingDBResponse;
use crate::types::{DeveloperId, ModelId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};

/// Model category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "model_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    Nlp,
    ComputerVision,
    Speech,
    Recommendation,
    Forecasting,
    Classification,
    Generation,
    Translation,
    Sentiment,
    Other,
}

/// Model lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "model_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Active,
    Inactive,
    Deprecated,
    Beta,
    Maintenance,
}

/// How invocations of a model are priced.
///
/// `subscription` is settled by an external billing collaborator; the
/// metering engine only computes per-event cost for `per_request` and
/// `per_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pricing_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    PerRequest,
    PerToken,
    Subscription,
    Free,
}

/// Request to publish a model listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelCreate {
    pub name: String,
    pub description: String,
    pub category: ModelCategory,
    /// Unique machine name used by invocation clients
    pub api_name: String,
    #[schema(value_type = String, format = "uri")]
    pub endpoint_url: Url,
    pub pricing_mode: PricingMode,
    #[schema(value_type = Option<String>)]
    pub price_per_request: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub price_per_token: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub monthly_subscription_price: Option<Decimal>,
    pub rate_limit_per_minute: Option<i64>,
    pub rate_limit_per_hour: Option<i64>,
    pub rate_limit_per_day: Option<i64>,
    pub is_public: Option<bool>,
}

/// Request to update a model listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ModelUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ModelCategory>,
    #[schema(value_type = Option<String>, format = "uri")]
    pub endpoint_url: Option<Url>,
    pub status: Option<ModelStatus>,
    pub is_public: Option<bool>,
    pub pricing_mode: Option<PricingMode>,
    #[schema(value_type = Option<String>)]
    pub price_per_request: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub price_per_token: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub monthly_subscription_price: Option<Decimal>,
    pub rate_limit_per_minute: Option<i64>,
    pub rate_limit_per_hour: Option<i64>,
    pub rate_limit_per_day: Option<i64>,
}

/// Model listing details, including the rolling aggregates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ModelId,
    #[schema(value_type = String, format = "uuid")]
    pub developer_id: DeveloperId,
    pub name: String,
    pub description: String,
    pub category: ModelCategory,
    pub api_name: String,
    pub endpoint_url: String,
    pub status: ModelStatus,
    pub is_public: bool,
    pub pricing_mode: PricingMode,
    #[schema(value_type = String)]
    pub price_per_request: Decimal,
    #[schema(value_type = String)]
    pub price_per_token: Decimal,
    #[schema(value_type = String)]
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

impl From<ListingDBResponse> for ModelResponse {
    fn from(db: ListingDBResponse) -> Self {
        Self {
            id: db.id,
            developer_id: db.developer_id,
            name: db.name,
            description: db.description,
            category: db.category,
            api_name: db.api_name,
            endpoint_url: db.endpoint_url,
            status: db.status,
            is_public: db.is_public,
            pricing_mode: db.pricing_mode,
            price_per_request: db.price_per_request,
            price_per_token: db.price_per_token,
            monthly_subscription_price: db.monthly_subscription_price,
            rate_limit_per_minute: db.rate_limit_per_minute,
            rate_limit_per_hour: db.rate_limit_per_hour,
            rate_limit_per_day: db.rate_limit_per_day,
            total_requests: db.total_requests,
            average_response_time: db.average_response_time,
            success_rate: db.success_rate,
            average_rating: db.average_rating,
            total_reviews: db.total_reviews,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing models
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListModelsQuery {
    /// Number of entries to skip
    pub skip: Option<i64>,
    /// Maximum number of entries to return
    pub limit: Option<i64>,
    /// Filter by category
    pub category: Option<ModelCategory>,
    /// Filter by owning developer
    #[param(value_type = Option<String>, format = "uuid")]
    pub developer: Option<DeveloperId>,
}

/// Derived statistics for one model, computed from the usage ledger and the
/// rolling aggregates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelStatsResponse {
    pub total_requests: i64,
    /// All ledger entries for this model, successful or not
    pub total_interactions: i64,
    pub unique_users: i64,
    pub average_response_time: f64,
    pub success_rate: f64,
    pub average_rating: f64,
    pub total_reviews: i64,
    /// Sum of `cost_incurred` over successful events
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub requests_today: i64,
    pub requests_this_month: i64,
}
