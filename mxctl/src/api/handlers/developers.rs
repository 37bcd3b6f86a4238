use crate::api::models::developers::{DeveloperRegister, DeveloperResponse, DeveloperUpdate, ListDevelopersQuery};
use crate::api::models::listings::ModelResponse;
use crate::api::models::users::CurrentUser;
use crate::auth::require_staff;
use crate::db::handlers::{developers::DeveloperFilter, Developers, Listings, Repository};
use crate::db::models::developers::{DeveloperCreateDBRequest, DeveloperDBResponse, DeveloperUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::DeveloperId;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

fn not_found(id: DeveloperId) -> Error {
    Error::NotFound {
        resource: "Developer".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/developers",
    tag = "developers",
    summary = "Register a developer profile",
    request_body = DeveloperRegister,
    responses(
        (status = 201, description = "Developer profile created", body = DeveloperResponse),
        (status = 400, description = "Invalid request or profile already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn register_developer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<DeveloperRegister>,
) -> Result<(StatusCode, Json<DeveloperResponse>)> {
    if create.developer_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "developer_name must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    if repo.get_by_user_id(current_user.id).await?.is_some() {
        return Err(Error::Validation {
            message: "This account already has a developer profile".to_string(),
        });
    }

    let request = DeveloperCreateDBRequest::new(current_user.id, create, state.config.quotas.default_monthly_limit);
    let developer = repo.create(&request).await?;

    Ok((StatusCode::CREATED, Json(DeveloperResponse::from(developer))))
}

#[utoipa::path(
    get,
    path = "/developers",
    tag = "developers",
    summary = "List developers",
    params(ListDevelopersQuery),
    responses(
        (status = 200, description = "List of developers", body = Vec<DeveloperResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_developers(State(state): State<AppState>, Query(query): Query<ListDevelopersQuery>) -> Result<Json<Vec<DeveloperResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    let filter = DeveloperFilter {
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(100).min(1000),
        status: query.status,
    };
    let developers = repo.list(&filter).await?;

    Ok(Json(developers.into_iter().map(DeveloperResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/developers/{id}",
    tag = "developers",
    summary = "Get a developer profile",
    responses(
        (status = 200, description = "Developer details", body = DeveloperResponse),
        (status = 404, description = "Developer not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Developer ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_developer(State(state): State<AppState>, Path(id): Path<DeveloperId>) -> Result<Json<DeveloperResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(developer) => Ok(Json(DeveloperResponse::from(developer))),
        None => Err(not_found(id)),
    }
}

/// Shared owner-or-staff guard for developer mutations
async fn get_owned_developer(repo: &mut Developers<'_>, id: DeveloperId, current_user: &CurrentUser) -> Result<DeveloperDBResponse> {
    let developer = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    if developer.user_id != current_user.id && !current_user.is_staff {
        return Err(Error::Forbidden {
            action: "update".to_string(),
            resource: "developer".to_string(),
        });
    }

    Ok(developer)
}

#[utoipa::path(
    patch,
    path = "/developers/{id}",
    tag = "developers",
    summary = "Update a developer profile",
    request_body = DeveloperUpdate,
    responses(
        (status = 200, description = "Updated developer", body = DeveloperResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the profile owner"),
        (status = 404, description = "Developer not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Developer ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_developer(
    State(state): State<AppState>,
    Path(id): Path<DeveloperId>,
    current_user: CurrentUser,
    Json(update): Json<DeveloperUpdate>,
) -> Result<Json<DeveloperResponse>> {
    // Quota limits are a platform decision, not a self-service field
    if update.monthly_quota_limit.is_some() {
        require_staff(&current_user, "update quota of", "developer")?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    get_owned_developer(&mut repo, id, &current_user).await?;

    let developer = repo.update(id, &DeveloperUpdateDBRequest::from(update)).await?;
    Ok(Json(DeveloperResponse::from(developer)))
}

#[utoipa::path(
    get,
    path = "/developers/{id}/models",
    tag = "developers",
    summary = "List a developer's models",
    responses(
        (status = 200, description = "The developer's model listings", body = Vec<ModelResponse>),
        (status = 404, description = "Developer not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Developer ID")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_developer_models(State(state): State<AppState>, Path(id): Path<DeveloperId>) -> Result<Json<Vec<ModelResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut developers = Developers::new(&mut conn);
    if developers.get_by_id(id).await?.is_none() {
        return Err(not_found(id));
    }

    let mut listings = Listings::new(&mut conn);
    let models = listings.list_by_developer(id).await?;

    Ok(Json(models.into_iter().map(ModelResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/developers/{id}/verify",
    tag = "developers",
    summary = "Verify a developer account (staff only)",
    responses(
        (status = 200, description = "Verified developer", body = DeveloperResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Developer not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Developer ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn verify_developer(
    State(state): State<AppState>,
    Path(id): Path<DeveloperId>,
    current_user: CurrentUser,
) -> Result<Json<DeveloperResponse>> {
    require_staff(&current_user, "verify", "developer")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    if repo.get_by_id(id).await?.is_none() {
        return Err(not_found(id));
    }

    let developer = repo.verify(id).await?;
    Ok(Json(DeveloperResponse::from(developer)))
}

#[utoipa::path(
    post,
    path = "/developers/{id}/reset-usage",
    tag = "developers",
    summary = "Reset monthly quota usage (staff only)",
    description = "Sets the developer's current-month usage counter back to zero. Idempotent; \
                   intended to be driven by an external scheduled task on calendar boundaries.",
    responses(
        (status = 200, description = "Developer with usage reset", body = DeveloperResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Developer not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Developer ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reset_developer_usage(
    State(state): State<AppState>,
    Path(id): Path<DeveloperId>,
    current_user: CurrentUser,
) -> Result<Json<DeveloperResponse>> {
    require_staff(&current_user, "reset usage of", "developer")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Developers::new(&mut conn);

    if repo.get_by_id(id).await?.is_none() {
        return Err(not_found(id));
    }

    let developer = repo.reset_monthly_usage(id).await?;
    Ok(Json(DeveloperResponse::from(developer)))
}
