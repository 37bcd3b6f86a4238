//! API request/response models for reviews and votes.

use crate::db::models::reviews::{ReviewDBResponse, ReviewVoteDBResponse};
use crate::types::{ModelId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A helpfulness vote on a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "vote_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Helpful,
    NotHelpful,
}

/// Request to create a review
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewCreate {
    #[schema(value_type = String, format = "uuid")]
    pub model_id: ModelId,
    /// Rating from 1-5 stars
    pub rating: i32,
    pub title: String,
    pub body: String,
}

/// Review details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReviewId,
    #[schema(value_type = String, format = "uuid")]
    pub model_id: ModelId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub rating: i32,
    pub title: String,
    pub body: String,
    /// Snapshot taken at creation: the reviewer had >= 3 successful
    /// invocations of the model at that moment
    pub is_verified: bool,
    pub helpful_votes: i64,
    pub total_votes: i64,
    /// helpful_votes / total_votes as a percentage (0 when unvoted)
    pub helpfulness_ratio: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewDBResponse> for ReviewResponse {
    fn from(db: ReviewDBResponse) -> Self {
        let helpfulness_ratio = if db.total_votes == 0 {
            0.0
        } else {
            db.helpful_votes as f64 / db.total_votes as f64 * 100.0
        };
        Self {
            id: db.id,
            model_id: db.model_id,
            user_id: db.user_id,
            rating: db.rating,
            title: db.title,
            body: db.body,
            is_verified: db.is_verified,
            helpful_votes: db.helpful_votes,
            total_votes: db.total_votes,
            helpfulness_ratio,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Request to cast or change a helpfulness vote
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    pub vote: VoteKind,
}

/// Vote state after a cast/change/removal, with the review's updated counters
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteStatus {
    pub vote: Option<VoteKind>,
    pub helpful_votes: i64,
    pub total_votes: i64,
}

impl VoteStatus {
    pub fn new(vote: Option<ReviewVoteDBResponse>, review: &ReviewDBResponse) -> Self {
        Self {
            vote: vote.map(|v| v.vote),
            helpful_votes: review.helpful_votes,
            total_votes: review.total_votes,
        }
    }
}

/// Query parameters for listing a model's reviews
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListReviewsQuery {
    /// Number of entries to skip
    pub skip: Option<i64>,
    /// Maximum number of entries to return
    pub limit: Option<i64>,
    /// Only include reviews from verified reviewers
    pub verified_only: Option<bool>,
    /// Minimum rating (inclusive)
    pub min_rating: Option<i32>,
}

/// Count of reviews at one rating value
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

/// A compact reference to the most helpful review of a model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MostHelpfulReview {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReviewId,
    pub title: String,
    pub rating: i32,
    pub helpful_votes: i64,
    pub total_votes: i64,
}

/// Review statistics for one model, derived from the review set
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewStatsResponse {
    pub total_reviews: i64,
    pub average_rating: f64,
    /// Counts for each rating value 1-5
    pub rating_distribution: Vec<RatingBucket>,
    pub verified_reviews_count: i64,
    pub verified_reviews_percentage: f64,
    pub most_helpful_review: Option<MostHelpfulReview>,
    /// Reviews created in the last 30 days
    pub recent_reviews_count: i64,
}
