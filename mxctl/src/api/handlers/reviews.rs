use crate::api::models::reviews::{ListReviewsQuery, ReviewCreate, ReviewResponse, ReviewStatsResponse, VoteRequest, VoteStatus};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{reports, reviews::ReviewFilter, Listings, Repository, Reviews, UsageEvents};
use crate::db::models::reviews::ReviewCreateDBRequest;
use crate::errors::{Error, Result};
use crate::metering::engine;
use crate::types::{ModelId, ReviewId};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

/// Successful interactions required before a reviewer is marked verified
const VERIFIED_REVIEWER_THRESHOLD: i64 = 3;

fn review_not_found(id: ReviewId) -> Error {
    Error::NotFound {
        resource: "Review".to_string(),
        id: id.to_string(),
    }
}

fn model_not_found(id: ModelId) -> Error {
    Error::NotFound {
        resource: "Model".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    summary = "Review a model",
    description = "One review per (user, model). Requires at least one successful prior \
                   invocation; the verified flag is a snapshot of whether the reviewer had three \
                   or more at creation time. Creation triggers a full recompute of the model's \
                   rating aggregates.",
    request_body = ReviewCreate,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid rating, duplicate review, or no prior usage"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_review(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    if !(1..=5).contains(&create.rating) {
        return Err(Error::Validation {
            message: "rating must be between 1 and 5".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Lock the listing so the recompute below serializes with other review
    // mutations and with the metering engine.
    let listing = Listings::new(&mut tx)
        .get_for_update(create.model_id)
        .await?
        .ok_or_else(|| model_not_found(create.model_id))?;

    let mut reviews = Reviews::new(&mut tx);
    if reviews.exists_for(current_user.id, create.model_id).await? {
        return Err(Error::Validation {
            message: "You have already reviewed this model".to_string(),
        });
    }

    let successful_uses = UsageEvents::new(&mut tx).successful_count(current_user.id, create.model_id).await?;
    if successful_uses == 0 {
        return Err(Error::Validation {
            message: "You must use the model before reviewing it".to_string(),
        });
    }

    let request = ReviewCreateDBRequest {
        model_id: create.model_id,
        user_id: current_user.id,
        rating: create.rating,
        title: create.title,
        body: create.body,
        // Point-in-time snapshot; never re-evaluated after creation
        is_verified: successful_uses >= VERIFIED_REVIEWER_THRESHOLD,
    };
    let review = Reviews::new(&mut tx).create(&request).await?;

    engine::recompute_rating(&mut tx, listing.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

#[utoipa::path(
    get,
    path = "/reviews/{id}",
    tag = "reviews",
    summary = "Get a review",
    responses(
        (status = 200, description = "Review details", body = ReviewResponse),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Review ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_review(State(state): State<AppState>, Path(id): Path<ReviewId>) -> Result<Json<ReviewResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reviews::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(review) => Ok(Json(ReviewResponse::from(review))),
        None => Err(review_not_found(id)),
    }
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    tag = "reviews",
    summary = "Delete a review",
    description = "Deletion triggers a full recompute of the model's rating aggregates over the \
                   remaining review set.",
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your review"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Review ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_review(State(state): State<AppState>, Path(id): Path<ReviewId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let review = Reviews::new(&mut tx).get_by_id(id).await?.ok_or_else(|| review_not_found(id))?;

    if review.user_id != current_user.id && !current_user.is_staff {
        return Err(Error::Forbidden {
            action: "delete".to_string(),
            resource: "review".to_string(),
        });
    }

    // Same lock order as creation: listing first, then the review mutation
    Listings::new(&mut tx)
        .get_for_update(review.model_id)
        .await?
        .ok_or_else(|| model_not_found(review.model_id))?;

    Reviews::new(&mut tx).delete(id).await?;
    engine::recompute_rating(&mut tx, review.model_id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/models/{id}/reviews",
    tag = "reviews",
    summary = "List a model's reviews",
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID"),
        ListReviewsQuery
    ),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<ReviewResponse>),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_model_reviews(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Listings::new(&mut conn).get_by_id(id).await?.is_none() {
        return Err(model_not_found(id));
    }

    let filter = ReviewFilter {
        model_id: id,
        verified_only: query.verified_only.unwrap_or(false),
        min_rating: query.min_rating,
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(100).min(1000),
    };
    let reviews = Reviews::new(&mut conn).list_for_model(&filter).await?;

    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/models/{id}/review-stats",
    tag = "reviews",
    summary = "Review statistics for a model",
    responses(
        (status = 200, description = "Distribution, verified share, most helpful review", body = ReviewStatsResponse),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn model_review_stats(State(state): State<AppState>, Path(id): Path<ModelId>) -> Result<Json<ReviewStatsResponse>> {
    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        if Listings::new(&mut conn).get_by_id(id).await?.is_none() {
            return Err(model_not_found(id));
        }
    }

    let stats = reports::review_stats(&state.db, id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    post,
    path = "/reviews/{id}/vote",
    tag = "reviews",
    summary = "Vote on review helpfulness",
    description = "Upsert semantics: a first vote creates, a differing vote flips the helpful \
                   counter without double-counting the total, an identical vote is a no-op. \
                   Voting on your own review is rejected.",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = VoteStatus),
        (status = 400, description = "Self-vote"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Review ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn vote_on_review(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    current_user: CurrentUser,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteStatus>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Reviews::new(&mut tx);
    let review = repo.get_for_update(id).await?.ok_or_else(|| review_not_found(id))?;

    if review.user_id == current_user.id {
        return Err(Error::Validation {
            message: "You cannot vote on your own review".to_string(),
        });
    }

    let (vote, review) = repo.cast_vote(&review, current_user.id, request.vote).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(VoteStatus::new(Some(vote), &review)))
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}/vote",
    tag = "reviews",
    summary = "Remove your vote from a review",
    responses(
        (status = 200, description = "Vote removed", body = VoteStatus),
        (status = 400, description = "No vote to remove"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Review ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_review_vote(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    current_user: CurrentUser,
) -> Result<Json<VoteStatus>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Reviews::new(&mut tx);
    repo.get_for_update(id).await?.ok_or_else(|| review_not_found(id))?;

    let review = repo.remove_vote(id, current_user.id).await?.ok_or_else(|| Error::Validation {
        message: "You have not voted on this review".to_string(),
    })?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(VoteStatus::new(None, &review)))
}
