//! Database models for the usage ledger.

use crate::api::models::usage::UsageOutcome;
use crate::types::{ModelId, UsageEventId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for appending a usage event to the ledger.
///
/// `cost_incurred` is stamped by the metering engine before the insert and is
/// never recomputed afterwards.
#[derive(Debug, Clone)]
pub struct UsageEventCreateDBRequest {
    pub user_id: Option<UserId>,
    pub model_id: ModelId,
    pub prompt: String,
    pub response: String,
    pub outcome: UsageOutcome,
    pub latency_ms: i32,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub cost_incurred: Decimal,
    pub client_ip: String,
    pub user_agent: String,
}

/// Database response for a usage event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageEventDBResponse {
    pub id: UsageEventId,
    pub user_id: Option<UserId>,
    pub model_id: ModelId,
    pub prompt: String,
    pub response: String,
    pub outcome: UsageOutcome,
    pub latency_ms: i32,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub cost_incurred: Decimal,
    pub user_rating: Option<i32>,
    pub user_feedback: Option<String>,
    pub client_ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}
