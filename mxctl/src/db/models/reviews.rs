//! Database models for reviews and review votes.

use crate::api::models::reviews::VoteKind;
use crate::types::{ModelId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a review.
///
/// `is_verified` is the point-in-time snapshot computed at creation; it is
/// never re-evaluated afterwards.
#[derive(Debug, Clone)]
pub struct ReviewCreateDBRequest {
    pub model_id: ModelId,
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub body: String,
    pub is_verified: bool,
}

/// Database response for a review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewDBResponse {
    pub id: ReviewId,
    pub model_id: ModelId,
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub body: String,
    pub is_verified: bool,
    pub helpful_votes: i64,
    pub total_votes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database response for a review vote
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewVoteDBResponse {
    pub id: uuid::Uuid,
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub vote: VoteKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
