//! Database repository for reviews and review votes.
//!
//! Vote counter adjustments run in the caller's transaction with the review
//! row locked, so concurrent votes on the same review serialize instead of
//! losing updates.

use crate::api::models::reviews::VoteKind;
use crate::db::{
    errors::Result,
    models::reviews::{ReviewCreateDBRequest, ReviewDBResponse, ReviewVoteDBResponse},
};
use crate::metering::vote_counter_delta;
use crate::types::{ModelId, ReviewId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing a model's reviews
#[derive(Debug, Clone)]
pub struct ReviewFilter {
    pub model_id: ModelId,
    pub verified_only: bool,
    pub min_rating: Option<i32>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Reviews<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reviews<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(model_id = %abbrev_uuid(&request.model_id), rating = request.rating), err)]
    pub async fn create(&mut self, request: &ReviewCreateDBRequest) -> Result<ReviewDBResponse> {
        let review_id = Uuid::new_v4();

        let review = sqlx::query_as::<_, ReviewDBResponse>(
            r#"
            INSERT INTO reviews (id, model_id, user_id, rating, title, body, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(request.model_id)
        .bind(request.user_id)
        .bind(request.rating)
        .bind(&request.title)
        .bind(&request.body)
        .bind(request.is_verified)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(review)
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(review)
    }

    /// Lock the review row for the duration of the caller's transaction.
    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_update(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(review)
    }

    #[instrument(skip(self, filter), fields(model_id = %abbrev_uuid(&filter.model_id)), err)]
    pub async fn list_for_model(&mut self, filter: &ReviewFilter) -> Result<Vec<ReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(
            r#"
            SELECT * FROM reviews
            WHERE model_id = $1
              AND (NOT $4 OR is_verified = TRUE)
              AND ($5::int IS NULL OR rating >= $5)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.model_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(filter.verified_only)
        .bind(filter.min_rating)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(reviews)
    }

    /// Whether the user has already reviewed the model. Backstopped by the
    /// unique constraint on (model_id, user_id).
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), model_id = %abbrev_uuid(&model_id)), err)]
    pub async fn exists_for(&mut self, user_id: UserId, model_id: ModelId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND model_id = $2)")
            .bind(user_id)
            .bind(model_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(exists)
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: ReviewId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&review_id)), err)]
    pub async fn get_vote(&mut self, review_id: ReviewId, user_id: UserId) -> Result<Option<ReviewVoteDBResponse>> {
        let vote = sqlx::query_as::<_, ReviewVoteDBResponse>("SELECT * FROM review_votes WHERE review_id = $1 AND user_id = $2")
            .bind(review_id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(vote)
    }

    /// Upsert a helpfulness vote and adjust the parent review's counters in
    /// the same transaction.
    ///
    /// Casting a new vote bumps the total (and helpful, when applicable);
    /// flipping an existing vote moves the helpful increment without
    /// double-counting the total; revoting the same value is a no-op.
    #[instrument(skip(self, review), fields(review_id = %abbrev_uuid(&review.id), vote = ?kind), err)]
    pub async fn cast_vote(
        &mut self,
        review: &ReviewDBResponse,
        user_id: UserId,
        kind: VoteKind,
    ) -> Result<(ReviewVoteDBResponse, ReviewDBResponse)> {
        let previous = self.get_vote(review.id, user_id).await?;

        if let Some(prev) = &previous
            && prev.vote == kind
        {
            return Ok((prev.clone(), review.clone()));
        }

        let vote = sqlx::query_as::<_, ReviewVoteDBResponse>(
            r#"
            INSERT INTO review_votes (id, review_id, user_id, vote)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (review_id, user_id)
            DO UPDATE SET vote = EXCLUDED.vote, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review.id)
        .bind(user_id)
        .bind(kind)
        .fetch_one(&mut *self.db)
        .await?;

        let (helpful_delta, total_delta) = vote_counter_delta(previous.map(|p| p.vote), Some(kind));
        let review = self.adjust_vote_counters(review.id, helpful_delta, total_delta).await?;

        Ok((vote, review))
    }

    /// Remove the user's vote, if any, decrementing the counters. Returns
    /// `None` when there was no vote to remove.
    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&review_id)), err)]
    pub async fn remove_vote(&mut self, review_id: ReviewId, user_id: UserId) -> Result<Option<ReviewDBResponse>> {
        let Some(previous) = self.get_vote(review_id, user_id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM review_votes WHERE review_id = $1 AND user_id = $2")
            .bind(review_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        let (helpful_delta, total_delta) = vote_counter_delta(Some(previous.vote), None);
        let review = self.adjust_vote_counters(review_id, helpful_delta, total_delta).await?;

        Ok(Some(review))
    }

    async fn adjust_vote_counters(&mut self, review_id: ReviewId, helpful_delta: i64, total_delta: i64) -> Result<ReviewDBResponse> {
        let review = sqlx::query_as::<_, ReviewDBResponse>(
            r#"
            UPDATE reviews
            SET helpful_votes = helpful_votes + $2,
                total_votes = total_votes + $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(helpful_delta)
        .bind(total_delta)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(review)
    }
}
