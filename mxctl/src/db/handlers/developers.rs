//! Database repository for developer profiles.

use crate::api::models::developers::DeveloperStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::developers::{DeveloperCreateDBRequest, DeveloperDBResponse, DeveloperUpdateDBRequest},
};
use crate::types::{DeveloperId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing developers
#[derive(Debug, Clone)]
pub struct DeveloperFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<DeveloperStatus>,
}

impl Default for DeveloperFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            status: None,
        }
    }
}

pub struct Developers<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Developers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_by_user_id(&mut self, user_id: UserId) -> Result<Option<DeveloperDBResponse>> {
        let developer = sqlx::query_as::<_, DeveloperDBResponse>("SELECT * FROM developers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(developer)
    }

    /// Lock the developer row for the duration of the caller's transaction.
    ///
    /// The metering engine serializes concurrent aggregate updates through
    /// this lock.
    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_update(&mut self, id: DeveloperId) -> Result<Option<DeveloperDBResponse>> {
        let developer = sqlx::query_as::<_, DeveloperDBResponse>("SELECT * FROM developers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(developer)
    }

    /// Mark a developer as verified and activate the account.
    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&id)), err)]
    pub async fn verify(&mut self, id: DeveloperId) -> Result<DeveloperDBResponse> {
        let developer = sqlx::query_as::<_, DeveloperDBResponse>(
            r#"
            UPDATE developers
            SET is_verified = TRUE,
                verified_at = NOW(),
                status = 'active',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(developer)
    }

    /// Reset the monthly usage counter to zero. Idempotent; invoked by the
    /// external scheduled task runner on calendar boundaries.
    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&id)), err)]
    pub async fn reset_monthly_usage(&mut self, id: DeveloperId) -> Result<DeveloperDBResponse> {
        let developer = sqlx::query_as::<_, DeveloperDBResponse>(
            r#"
            UPDATE developers
            SET current_month_usage = 0,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(developer)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Developers<'c> {
    type CreateRequest = DeveloperCreateDBRequest;
    type UpdateRequest = DeveloperUpdateDBRequest;
    type Response = DeveloperDBResponse;
    type Id = DeveloperId;
    type Filter = DeveloperFilter;

    #[instrument(skip(self, request), fields(developer_name = %request.developer_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let developer_id = Uuid::new_v4();

        let developer = sqlx::query_as::<_, DeveloperDBResponse>(
            r#"
            INSERT INTO developers (id, user_id, developer_name, company_name, website_url, bio, monthly_quota_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(developer_id)
        .bind(request.user_id)
        .bind(&request.developer_name)
        .bind(&request.company_name)
        .bind(&request.website_url)
        .bind(&request.bio)
        .bind(request.monthly_quota_limit)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(developer)
    }

    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let developer = sqlx::query_as::<_, DeveloperDBResponse>("SELECT * FROM developers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(developer)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let developers = sqlx::query_as::<_, DeveloperDBResponse>(
            r#"
            SELECT * FROM developers
            WHERE ($3::developer_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(filter.status)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(developers)
    }

    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM developers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(developer_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let developer = sqlx::query_as::<_, DeveloperDBResponse>(
            r#"
            UPDATE developers
            SET company_name = COALESCE($2, company_name),
                website_url = COALESCE($3, website_url),
                bio = COALESCE($4, bio),
                monthly_quota_limit = COALESCE($5, monthly_quota_limit),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.company_name)
        .bind(&request.website_url)
        .bind(&request.bio)
        .bind(request.monthly_quota_limit)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(developer)
    }
}
