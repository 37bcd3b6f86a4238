//! Ledger-derived reporting queries for dashboards.
//!
//! Everything here is computed from the usage_events / reviews tables rather
//! than from the rolling aggregates, so the numbers stay correct even if an
//! aggregate row were ever rebuilt.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::api::models::listings::ModelStatsResponse;
use crate::api::models::reviews::{MostHelpfulReview, RatingBucket, ReviewStatsResponse};
use crate::api::models::usage::{ActorUsageStats, TimelinePoint};
use crate::db::errors::Result;
use crate::db::models::listings::ListingDBResponse;
use crate::metering::round2;
use crate::types::{ModelId, ReviewId, UserId, abbrev_uuid};

#[derive(FromRow)]
struct ModelLedgerRow {
    total_interactions: i64,
    unique_users: i64,
    total_revenue: Decimal,
    requests_today: i64,
    requests_this_month: i64,
}

/// Derived statistics for one model: the rolling aggregates from the listing
/// row combined with ledger-level counts and realized revenue.
#[instrument(skip(db, listing), fields(model_id = %abbrev_uuid(&listing.id)), err)]
pub async fn model_stats(db: &PgPool, listing: &ListingDBResponse) -> Result<ModelStatsResponse> {
    let row: ModelLedgerRow = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_interactions,
               COUNT(DISTINCT user_id) AS unique_users,
               COALESCE(SUM(cost_incurred) FILTER (WHERE outcome = 'success'), 0) AS total_revenue,
               COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS requests_today,
               COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS requests_this_month
        FROM usage_events
        WHERE model_id = $1
        "#,
    )
    .bind(listing.id)
    .fetch_one(db)
    .await?;

    Ok(ModelStatsResponse {
        total_requests: listing.total_requests,
        total_interactions: row.total_interactions,
        unique_users: row.unique_users,
        average_response_time: round2(listing.average_response_time),
        success_rate: round2(listing.success_rate),
        average_rating: round2(listing.average_rating),
        total_reviews: listing.total_reviews,
        total_revenue: row.total_revenue,
        requests_today: row.requests_today,
        requests_this_month: row.requests_this_month,
    })
}

#[derive(FromRow)]
struct ActorLedgerRow {
    total_interactions: i64,
    unique_models: i64,
    successful_interactions: i64,
    average_response_time: f64,
    total_cost: Decimal,
    total_tokens: i64,
}

/// Aggregate statistics over one actor's usage history.
#[instrument(skip(db), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn actor_stats(db: &PgPool, user_id: UserId) -> Result<ActorUsageStats> {
    let row: ActorLedgerRow = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_interactions,
               COUNT(DISTINCT model_id) AS unique_models,
               COUNT(*) FILTER (WHERE outcome = 'success') AS successful_interactions,
               COALESCE(AVG(latency_ms)::float8, 0) AS average_response_time,
               COALESCE(SUM(cost_incurred), 0) AS total_cost,
               COALESCE(SUM(input_tokens + output_tokens), 0) AS total_tokens
        FROM usage_events
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let most_used_model: Option<String> = sqlx::query_scalar(
        r#"
        SELECT m.name
        FROM usage_events e
        JOIN model_listings m ON m.id = e.model_id
        WHERE e.user_id = $1
        GROUP BY m.name
        ORDER BY COUNT(*) DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    let success_rate = if row.total_interactions > 0 {
        round2(row.successful_interactions as f64 / row.total_interactions as f64 * 100.0)
    } else {
        0.0
    };

    Ok(ActorUsageStats {
        total_interactions: row.total_interactions,
        unique_models: row.unique_models,
        success_rate,
        average_response_time: round2(row.average_response_time),
        total_cost: row.total_cost,
        total_tokens: row.total_tokens,
        most_used_model,
    })
}

#[derive(FromRow)]
struct TimelineRow {
    day: DateTime<Utc>,
    interactions: i64,
    successful_interactions: i64,
    total_cost: Decimal,
    average_response_time: f64,
}

/// Daily rollups over the actor's trailing `days` of history.
#[instrument(skip(db), fields(user_id = %abbrev_uuid(&user_id), days = days), err)]
pub async fn usage_timeline(db: &PgPool, user_id: UserId, days: i64) -> Result<Vec<TimelinePoint>> {
    let since = Utc::now() - Duration::days(days);

    let rows: Vec<TimelineRow> = sqlx::query_as(
        r#"
        SELECT date_trunc('day', created_at) AS day,
               COUNT(*) AS interactions,
               COUNT(*) FILTER (WHERE outcome = 'success') AS successful_interactions,
               COALESCE(SUM(cost_incurred), 0) AS total_cost,
               COALESCE(AVG(latency_ms)::float8, 0) AS average_response_time
        FROM usage_events
        WHERE user_id = $1
          AND created_at >= $2
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let success_rate = if row.interactions > 0 {
                round2(row.successful_interactions as f64 / row.interactions as f64 * 100.0)
            } else {
                0.0
            };
            TimelinePoint {
                day: row.day,
                interactions: row.interactions,
                successful_interactions: row.successful_interactions,
                success_rate,
                total_cost: row.total_cost,
                average_response_time: round2(row.average_response_time),
            }
        })
        .collect())
}

#[derive(FromRow)]
struct ReviewTotalsRow {
    total_reviews: i64,
    average_rating: f64,
    verified_reviews_count: i64,
    recent_reviews_count: i64,
}

#[derive(FromRow)]
struct RatingBucketRow {
    rating: i32,
    count: i64,
}

#[derive(FromRow)]
struct MostHelpfulRow {
    id: ReviewId,
    title: String,
    rating: i32,
    helpful_votes: i64,
    total_votes: i64,
}

/// Review statistics for a model: distribution, verified share, and the most
/// helpful review.
#[instrument(skip(db), fields(model_id = %abbrev_uuid(&model_id)), err)]
pub async fn review_stats(db: &PgPool, model_id: ModelId) -> Result<ReviewStatsResponse> {
    let totals: ReviewTotalsRow = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_reviews,
               COALESCE(AVG(rating)::float8, 0) AS average_rating,
               COUNT(*) FILTER (WHERE is_verified) AS verified_reviews_count,
               COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days') AS recent_reviews_count
        FROM reviews
        WHERE model_id = $1
        "#,
    )
    .bind(model_id)
    .fetch_one(db)
    .await?;

    let buckets: Vec<RatingBucketRow> = sqlx::query_as(
        "SELECT rating, COUNT(*) AS count FROM reviews WHERE model_id = $1 GROUP BY rating",
    )
    .bind(model_id)
    .fetch_all(db)
    .await?;

    // Every rating value 1-5 appears in the distribution, zero-filled
    let rating_distribution = (1..=5)
        .map(|rating| RatingBucket {
            rating,
            count: buckets.iter().find(|b| b.rating == rating).map_or(0, |b| b.count),
        })
        .collect();

    let most_helpful: Option<MostHelpfulRow> = sqlx::query_as(
        r#"
        SELECT id, title, rating, helpful_votes, total_votes
        FROM reviews
        WHERE model_id = $1
          AND total_votes > 0
        ORDER BY helpful_votes DESC, total_votes DESC
        LIMIT 1
        "#,
    )
    .bind(model_id)
    .fetch_optional(db)
    .await?;

    let verified_reviews_percentage = if totals.total_reviews > 0 {
        round2(totals.verified_reviews_count as f64 / totals.total_reviews as f64 * 100.0)
    } else {
        0.0
    };

    Ok(ReviewStatsResponse {
        total_reviews: totals.total_reviews,
        average_rating: round2(totals.average_rating),
        rating_distribution,
        verified_reviews_count: totals.verified_reviews_count,
        verified_reviews_percentage,
        most_helpful_review: most_helpful.map(|row| MostHelpfulReview {
            id: row.id,
            title: row.title,
            rating: row.rating,
            helpful_votes: row.helpful_votes,
            total_votes: row.total_votes,
        }),
        recent_reviews_count: totals.recent_reviews_count,
    })
}
