use crate::api::models::listings::{ListModelsQuery, ModelCreate, ModelResponse, ModelStatsResponse, ModelUpdate};
use crate::api::models::users::CurrentUser;
use crate::auth::OptionalUser;
use crate::db::handlers::{listings::ListingFilter, reports, Developers, Listings, Repository};
use crate::db::models::listings::{ListingCreateDBRequest, ListingDBResponse, ListingUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::ModelId;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

fn not_found(id: ModelId) -> Error {
    Error::NotFound {
        resource: "Model".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/models",
    tag = "models",
    summary = "Publish a model listing",
    request_body = ModelCreate,
    responses(
        (status = 201, description = "Model listed", body = ModelResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only developers can publish models"),
        (status = 409, description = "API name already taken"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_model(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ModelCreate>,
) -> Result<(StatusCode, Json<ModelResponse>)> {
    if create.api_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "api_name must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut developers = Developers::new(&mut conn);
    let developer = developers.get_by_user_id(current_user.id).await?.ok_or_else(|| Error::Forbidden {
        action: "publish".to_string(),
        resource: "model".to_string(),
    })?;

    let mut listings = Listings::new(&mut conn);
    let listing = listings.create(&ListingCreateDBRequest::new(developer.id, create)).await?;

    Ok((StatusCode::CREATED, Json(ModelResponse::from(listing))))
}

#[utoipa::path(
    get,
    path = "/models",
    tag = "models",
    summary = "Browse the model catalog",
    params(ListModelsQuery),
    responses(
        (status = 200, description = "Model listings", body = Vec<ModelResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ListModelsQuery>,
    OptionalUser(user): OptionalUser,
) -> Result<Json<Vec<ModelResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Listings::new(&mut conn);

    let filter = ListingFilter {
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(100).min(1000),
        category: query.category,
        developer_id: query.developer,
        // The public catalog only shows active public listings
        include_private: user.map(|u| u.is_staff).unwrap_or(false),
    };
    let listings = repo.list(&filter).await?;

    Ok(Json(listings.into_iter().map(ModelResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/models/featured",
    tag = "models",
    summary = "Featured models",
    description = "Active public models with an average rating of at least 4.0 and at least 100 \
                   recorded requests, best first.",
    responses(
        (status = 200, description = "Featured model listings", body = Vec<ModelResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn featured_models(State(state): State<AppState>) -> Result<Json<Vec<ModelResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Listings::new(&mut conn);

    let listings = repo.featured(12).await?;
    Ok(Json(listings.into_iter().map(ModelResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/models/{id}",
    tag = "models",
    summary = "Get a model listing",
    responses(
        (status = 200, description = "Model details", body = ModelResponse),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_model(State(state): State<AppState>, Path(id): Path<ModelId>) -> Result<Json<ModelResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Listings::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(listing) => Ok(Json(ModelResponse::from(listing))),
        None => Err(not_found(id)),
    }
}

/// Owner-or-staff guard for model mutations
async fn get_owned_listing(
    conn: &mut sqlx::PgConnection,
    id: ModelId,
    current_user: &CurrentUser,
) -> Result<ListingDBResponse> {
    let listing = Listings::new(&mut *conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    if current_user.is_staff {
        return Ok(listing);
    }

    let owner = Developers::new(&mut *conn).get_by_user_id(current_user.id).await?;
    match owner {
        Some(developer) if developer.id == listing.developer_id => Ok(listing),
        _ => Err(Error::Forbidden {
            action: "modify".to_string(),
            resource: "model".to_string(),
        }),
    }
}

#[utoipa::path(
    patch,
    path = "/models/{id}",
    tag = "models",
    summary = "Update a model listing",
    request_body = ModelUpdate,
    responses(
        (status = 200, description = "Updated model", body = ModelResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owning developer"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    current_user: CurrentUser,
    Json(update): Json<ModelUpdate>,
) -> Result<Json<ModelResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    get_owned_listing(&mut conn, id, &current_user).await?;

    let mut repo = Listings::new(&mut conn);
    let listing = repo.update(id, &ListingUpdateDBRequest::from(update)).await?;

    Ok(Json(ModelResponse::from(listing)))
}

#[utoipa::path(
    delete,
    path = "/models/{id}",
    tag = "models",
    summary = "Delist a model",
    responses(
        (status = 204, description = "Model deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owning developer"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_model(State(state): State<AppState>, Path(id): Path<ModelId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    get_owned_listing(&mut conn, id, &current_user).await?;

    let mut repo = Listings::new(&mut conn);
    repo.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/models/{id}/stats",
    tag = "models",
    summary = "Rolling statistics and ledger-derived metrics for a model",
    responses(
        (status = 200, description = "Model statistics", body = ModelStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn model_stats(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    _current_user: CurrentUser,
) -> Result<Json<ModelStatsResponse>> {
    let listing = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Listings::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?
    };

    let stats = reports::model_stats(&state.db, &listing).await?;
    Ok(Json(stats))
}
