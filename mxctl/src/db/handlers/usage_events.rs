//! Database repository for the usage ledger.
//!
//! Ledger rows are append-only apart from the two post-hoc feedback fields;
//! there is no update or delete surface here.

use crate::api::models::usage::UsageOutcome;
use crate::db::{
    errors::{DbError, Result},
    models::usage_events::{UsageEventCreateDBRequest, UsageEventDBResponse},
};
use crate::types::{ModelId, UsageEventId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing a user's usage history
#[derive(Debug, Clone)]
pub struct UsageEventFilter {
    pub user_id: UserId,
    pub model_id: Option<ModelId>,
    pub outcome: Option<UsageOutcome>,
    pub skip: i64,
    pub limit: i64,
}

pub struct UsageEvents<'c> {
    db: &'c mut PgConnection,
}

impl<'c> UsageEvents<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append one event to the ledger. The row is immutable once written
    /// except for the post-hoc feedback fields.
    #[instrument(skip(self, request), fields(model_id = %abbrev_uuid(&request.model_id), outcome = ?request.outcome), err)]
    pub async fn create(&mut self, request: &UsageEventCreateDBRequest) -> Result<UsageEventDBResponse> {
        let event_id = Uuid::new_v4();

        let event = sqlx::query_as::<_, UsageEventDBResponse>(
            r#"
            INSERT INTO usage_events (
                id, user_id, model_id, prompt, response, outcome, latency_ms,
                input_tokens, output_tokens, cost_incurred, client_ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(request.user_id)
        .bind(request.model_id)
        .bind(&request.prompt)
        .bind(&request.response)
        .bind(request.outcome)
        .bind(request.latency_ms)
        .bind(request.input_tokens)
        .bind(request.output_tokens)
        .bind(request.cost_incurred)
        .bind(&request.client_ip)
        .bind(&request.user_agent)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(event)
    }

    #[instrument(skip(self), fields(event_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: UsageEventId) -> Result<Option<UsageEventDBResponse>> {
        let event = sqlx::query_as::<_, UsageEventDBResponse>("SELECT * FROM usage_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(event)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn list(&mut self, filter: &UsageEventFilter) -> Result<Vec<UsageEventDBResponse>> {
        let events = sqlx::query_as::<_, UsageEventDBResponse>(
            r#"
            SELECT * FROM usage_events
            WHERE user_id = $1
              AND ($4::uuid IS NULL OR model_id = $4)
              AND ($5::usage_outcome IS NULL OR outcome = $5)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(filter.model_id)
        .bind(filter.outcome)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(events)
    }

    /// Attach post-hoc feedback to an interaction. These are the only two
    /// mutable fields on a ledger row.
    #[instrument(skip(self), fields(event_id = %abbrev_uuid(&id)), err)]
    pub async fn update_feedback(
        &mut self,
        id: UsageEventId,
        rating: Option<i32>,
        feedback: Option<&str>,
    ) -> Result<UsageEventDBResponse> {
        let event = sqlx::query_as::<_, UsageEventDBResponse>(
            r#"
            UPDATE usage_events
            SET user_rating = COALESCE($2, user_rating),
                user_feedback = COALESCE($3, user_feedback)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(feedback)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(event)
    }

    /// Number of successful events the user has recorded against the model.
    /// Feeds review eligibility (>= 1) and the verified-reviewer snapshot
    /// (>= 3).
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), model_id = %abbrev_uuid(&model_id)), err)]
    pub async fn successful_count(&mut self, user_id: UserId, model_id: ModelId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM usage_events WHERE user_id = $1 AND model_id = $2 AND outcome = 'success'",
        )
        .bind(user_id)
        .bind(model_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}
