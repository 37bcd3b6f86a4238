//! API request/response models for the usage ledger and rate-limit queries.

use crate::db::models::usage_events::UsageEventDBResponse;
use crate::types::{ModelId, UsageEventId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Outcome of a recorded invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "usage_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Success,
    Error,
    Timeout,
    RateLimited,
    InsufficientQuota,
}

impl UsageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UsageOutcome::Success)
    }
}

/// Trailing window for rate-limit checks.
///
/// This is a closed enum: a window value outside minute/hour/day fails
/// deserialization and surfaces as a 400 rather than silently passing the
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitWindow {
    Minute,
    Hour,
    Day,
}

impl RateLimitWindow {
    /// Length of the trailing window
    pub fn duration(&self) -> chrono::Duration {
        match self {
            RateLimitWindow::Minute => chrono::Duration::minutes(1),
            RateLimitWindow::Hour => chrono::Duration::hours(1),
            RateLimitWindow::Day => chrono::Duration::days(1),
        }
    }
}

/// Request to record one invocation outcome.
///
/// The invocation handler must call this exactly once per logical
/// invocation; recording triggers the metering updates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageEventCreate {
    #[schema(value_type = String, format = "uuid")]
    pub model_id: ModelId,
    pub prompt: String,
    pub response: Option<String>,
    pub outcome: UsageOutcome,
    /// End-to-end latency of the invocation in milliseconds
    pub latency_ms: i32,
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub client_ip: String,
    pub user_agent: Option<String>,
}

/// A usage ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageEventResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UsageEventId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    #[schema(value_type = String, format = "uuid")]
    pub model_id: ModelId,
    pub prompt: String,
    pub response: String,
    pub outcome: UsageOutcome,
    pub latency_ms: i32,
    pub input_tokens: i32,
    pub output_tokens: i32,
    #[schema(value_type = String)]
    pub cost_incurred: Decimal,
    pub user_rating: Option<i32>,
    pub user_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UsageEventDBResponse> for UsageEventResponse {
    fn from(db: UsageEventDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            model_id: db.model_id,
            prompt: db.prompt,
            response: db.response,
            outcome: db.outcome,
            latency_ms: db.latency_ms,
            input_tokens: db.input_tokens,
            output_tokens: db.output_tokens,
            cost_incurred: db.cost_incurred,
            user_rating: db.user_rating,
            user_feedback: db.user_feedback,
            created_at: db.created_at,
        }
    }
}

/// Post-hoc feedback on an interaction (distinct from model reviews)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageFeedback {
    /// Rating from 1-5 stars
    pub rating: Option<i32>,
    pub feedback: Option<String>,
}

/// Query parameters for listing the caller's usage history
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsageQuery {
    /// Number of entries to skip
    pub skip: Option<i64>,
    /// Maximum number of entries to return
    pub limit: Option<i64>,
    /// Filter by model
    #[param(value_type = Option<String>, format = "uuid")]
    pub model: Option<ModelId>,
    /// Filter by outcome
    pub outcome: Option<UsageOutcome>,
}

/// Query parameters for the rate-limit status endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct RateLimitQuery {
    /// Trailing window to evaluate (minute | hour | day)
    pub window: RateLimitWindow,
}

/// Rate-limit status for (subject, model, window)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateLimitStatus {
    pub window: RateLimitWindow,
    /// Configured threshold for this window
    pub limit: i64,
    /// Events by this subject against the model within the trailing window
    pub used: i64,
    /// True once `used` has reached `limit`
    pub limited: bool,
}

/// Aggregate statistics over the caller's usage history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorUsageStats {
    pub total_interactions: i64,
    pub unique_models: i64,
    pub success_rate: f64,
    pub average_response_time: f64,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub total_tokens: i64,
    pub most_used_model: Option<String>,
}

/// Query parameters for the daily usage timeline
#[derive(Debug, Deserialize, IntoParams)]
pub struct TimelineQuery {
    /// Number of trailing days to aggregate (default 30)
    pub days: Option<i64>,
}

/// One day of aggregated usage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimelinePoint {
    pub day: DateTime<Utc>,
    pub interactions: i64,
    pub successful_interactions: i64,
    pub success_rate: f64,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub average_response_time: f64,
}
