//! Transactional appliers for the metering arithmetic.
//!
//! Every function here expects to run inside a caller-owned transaction that
//! has already locked the aggregate rows it touches (`SELECT ... FOR UPDATE`
//! through the repositories). Updates are fire-and-forget bookkeeping: a
//! failure aborts the enclosing transaction, dropping the ledger row along
//! with the partial aggregates, and surfaces as a request-level error. The
//! ledger remains authoritative; aggregates are regenerable from it.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

use crate::api::models::usage::{RateLimitStatus, RateLimitWindow, UsageOutcome};
use crate::db::errors::Result;
use crate::db::models::listings::ListingDBResponse;
use crate::metering::{RollingStats, recomputed_rating, window_exhausted};
use crate::types::{ModelId, UserId, abbrev_uuid};

/// Fold one recorded event into the owning listing's rolling aggregates and,
/// on the success path, accrue revenue and quota usage on the developer.
///
/// Must run in the same transaction as the ledger insert, with the listing
/// and developer rows locked.
#[instrument(skip(conn, listing), fields(model_id = %abbrev_uuid(&listing.id), outcome = ?outcome), err)]
pub async fn apply_usage(
    conn: &mut PgConnection,
    listing: &ListingDBResponse,
    outcome: UsageOutcome,
    latency_ms: i32,
    cost: Decimal,
) -> Result<()> {
    let mut stats = RollingStats {
        total_requests: listing.total_requests,
        average_response_time: listing.average_response_time,
        success_rate: listing.success_rate,
    };
    stats.record(outcome.is_success(), f64::from(latency_ms));

    sqlx::query(
        r#"
        UPDATE model_listings
        SET total_requests = $2,
            average_response_time = $3,
            success_rate = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(listing.id)
    .bind(stats.total_requests)
    .bind(stats.average_response_time)
    .bind(stats.success_rate)
    .execute(&mut *conn)
    .await?;

    if outcome.is_success() {
        // Revenue accrues unconditionally when the event carried a cost;
        // the usage counter ticks once per successful invocation.
        sqlx::query(
            r#"
            UPDATE developers
            SET current_month_usage = current_month_usage + 1,
                total_revenue = total_revenue + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(listing.developer_id)
        .bind(cost)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Recompute `average_rating` / `total_reviews` for a model from scratch and
/// write them back. Idempotent; runs after any review create or delete, with
/// the listing row locked.
#[instrument(skip(conn), fields(model_id = %abbrev_uuid(&model_id)), err)]
pub async fn recompute_rating(conn: &mut PgConnection, model_id: ModelId) -> Result<(f64, i64)> {
    let ratings: Vec<i32> = sqlx::query_scalar("SELECT rating FROM reviews WHERE model_id = $1")
        .bind(model_id)
        .fetch_all(&mut *conn)
        .await?;

    let (average_rating, total_reviews) = recomputed_rating(&ratings);

    sqlx::query(
        r#"
        UPDATE model_listings
        SET average_rating = $2,
            total_reviews = $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(model_id)
    .bind(average_rating)
    .bind(total_reviews)
    .execute(&mut *conn)
    .await?;

    Ok((average_rating, total_reviews))
}

/// Configured threshold for a listing and window.
pub fn window_threshold(listing: &ListingDBResponse, window: RateLimitWindow) -> i64 {
    match window {
        RateLimitWindow::Minute => listing.rate_limit_per_minute,
        RateLimitWindow::Hour => listing.rate_limit_per_hour,
        RateLimitWindow::Day => listing.rate_limit_per_day,
    }
}

/// Rate-limit status for (subject, model, window): pure query, no mutation.
///
/// Counts the subject's events against the model in the trailing window
/// `(now - window, now]`; an anonymous subject (`None`) matches anonymous
/// events.
#[instrument(skip(conn, listing), fields(model_id = %abbrev_uuid(&listing.id), window = ?window), err)]
pub async fn rate_limit_status(
    conn: &mut PgConnection,
    listing: &ListingDBResponse,
    subject: Option<UserId>,
    window: RateLimitWindow,
) -> Result<RateLimitStatus> {
    let since = Utc::now() - window.duration();

    let used: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM usage_events
        WHERE model_id = $1
          AND created_at > $2
          AND user_id IS NOT DISTINCT FROM $3
        "#,
    )
    .bind(listing.id)
    .bind(since)
    .bind(subject)
    .fetch_one(&mut *conn)
    .await?;

    let limit = window_threshold(listing, window);

    Ok(RateLimitStatus {
        window,
        limit,
        used,
        limited: window_exhausted(used, limit),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::listings::{ModelCategory, ModelStatus, PricingMode};

    fn listing() -> ListingDBResponse {
        ListingDBResponse {
            id: uuid::Uuid::new_v4(),
            developer_id: uuid::Uuid::new_v4(),
            name: "summarizer".to_string(),
            description: String::new(),
            category: ModelCategory::Nlp,
            api_name: "summarizer-v1".to_string(),
            endpoint_url: "https://models.example.com/summarizer".to_string(),
            status: ModelStatus::Active,
            is_public: true,
            pricing_mode: PricingMode::PerRequest,
            price_per_request: Decimal::new(1, 2),
            price_per_token: Decimal::new(1, 6),
            monthly_subscription_price: Decimal::ZERO,
            rate_limit_per_minute: 60,
            rate_limit_per_hour: 1_000,
            rate_limit_per_day: 10_000,
            total_requests: 0,
            average_response_time: 0.0,
            success_rate: 100.0,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn threshold_picks_the_window_column() {
        let listing = listing();
        assert_eq!(window_threshold(&listing, RateLimitWindow::Minute), 60);
        assert_eq!(window_threshold(&listing, RateLimitWindow::Hour), 1_000);
        assert_eq!(window_threshold(&listing, RateLimitWindow::Day), 10_000);
    }

    #[test]
    fn window_durations() {
        assert_eq!(RateLimitWindow::Minute.duration(), chrono::Duration::minutes(1));
        assert_eq!(RateLimitWindow::Hour.duration(), chrono::Duration::hours(1));
        assert_eq!(RateLimitWindow::Day.duration(), chrono::Duration::days(1));
    }
}
