//! Database repository for model listings.

use crate::api::models::listings::ModelCategory;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::listings::{ListingCreateDBRequest, ListingDBResponse, ListingUpdateDBRequest},
};
use crate::types::{DeveloperId, ModelId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing the catalog
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub skip: i64,
    pub limit: i64,
    pub category: Option<ModelCategory>,
    pub developer_id: Option<DeveloperId>,
    /// When false, restrict to active + public listings
    pub include_private: bool,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            category: None,
            developer_id: None,
            include_private: false,
        }
    }
}

pub struct Listings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Listings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Lock the listing row for the duration of the caller's transaction.
    ///
    /// All aggregate writers (metering engine, rating recompute) go through
    /// this lock so concurrent read-modify-write updates serialize per
    /// listing.
    #[instrument(skip(self), fields(model_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_update(&mut self, id: ModelId) -> Result<Option<ListingDBResponse>> {
        let listing = sqlx::query_as::<_, ListingDBResponse>("SELECT * FROM model_listings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(listing)
    }

    /// Top-model list for dashboards: active public listings with an average
    /// rating of at least 4.0 and at least 100 recorded requests.
    #[instrument(skip(self), err)]
    pub async fn featured(&mut self, limit: i64) -> Result<Vec<ListingDBResponse>> {
        let listings = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            SELECT * FROM model_listings
            WHERE status = 'active'
              AND is_public = TRUE
              AND average_rating >= 4.0
              AND total_requests >= 100
            ORDER BY average_rating DESC, total_requests DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(listings)
    }

    #[instrument(skip(self), fields(developer_id = %abbrev_uuid(&developer_id)), err)]
    pub async fn list_by_developer(&mut self, developer_id: DeveloperId) -> Result<Vec<ListingDBResponse>> {
        let listings =
            sqlx::query_as::<_, ListingDBResponse>("SELECT * FROM model_listings WHERE developer_id = $1 ORDER BY created_at DESC")
                .bind(developer_id)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(listings)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Listings<'c> {
    type CreateRequest = ListingCreateDBRequest;
    type UpdateRequest = ListingUpdateDBRequest;
    type Response = ListingDBResponse;
    type Id = ModelId;
    type Filter = ListingFilter;

    #[instrument(skip(self, request), fields(api_name = %request.api_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let model_id = Uuid::new_v4();

        let listing = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            INSERT INTO model_listings (
                id, developer_id, name, description, category, api_name, endpoint_url,
                is_public, pricing_mode, price_per_request, price_per_token,
                monthly_subscription_price, rate_limit_per_minute, rate_limit_per_hour,
                rate_limit_per_day
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(model_id)
        .bind(request.developer_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.category)
        .bind(&request.api_name)
        .bind(&request.endpoint_url)
        .bind(request.is_public)
        .bind(request.pricing_mode)
        .bind(request.price_per_request)
        .bind(request.price_per_token)
        .bind(request.monthly_subscription_price)
        .bind(request.rate_limit_per_minute)
        .bind(request.rate_limit_per_hour)
        .bind(request.rate_limit_per_day)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(listing)
    }

    #[instrument(skip(self), fields(model_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let listing = sqlx::query_as::<_, ListingDBResponse>("SELECT * FROM model_listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(listing)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let listings = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            SELECT * FROM model_listings
            WHERE ($3::model_category IS NULL OR category = $3)
              AND ($4::uuid IS NULL OR developer_id = $4)
              AND ($5 OR (status = 'active' AND is_public = TRUE))
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .bind(filter.category)
        .bind(filter.developer_id)
        .bind(filter.include_private)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(listings)
    }

    #[instrument(skip(self), fields(model_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM model_listings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(model_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates. Aggregate columns are
        // deliberately untouchable from here.
        let listing = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            UPDATE model_listings
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                endpoint_url = COALESCE($5, endpoint_url),
                status = COALESCE($6, status),
                is_public = COALESCE($7, is_public),
                pricing_mode = COALESCE($8, pricing_mode),
                price_per_request = COALESCE($9, price_per_request),
                price_per_token = COALESCE($10, price_per_token),
                monthly_subscription_price = COALESCE($11, monthly_subscription_price),
                rate_limit_per_minute = COALESCE($12, rate_limit_per_minute),
                rate_limit_per_hour = COALESCE($13, rate_limit_per_hour),
                rate_limit_per_day = COALESCE($14, rate_limit_per_day),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.category)
        .bind(&request.endpoint_url)
        .bind(request.status)
        .bind(request.is_public)
        .bind(request.pricing_mode)
        .bind(request.price_per_request)
        .bind(request.price_per_token)
        .bind(request.monthly_subscription_price)
        .bind(request.rate_limit_per_minute)
        .bind(request.rate_limit_per_hour)
        .bind(request.rate_limit_per_day)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(listing)
    }
}
