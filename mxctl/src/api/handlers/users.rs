use crate::api::models::users::{CurrentUser, UserRegister, UserRegisterResponse, UserResponse};
use crate::db::handlers::Users;
use crate::db::models::users::UserCreateDBRequest;
use crate::errors::{Error, Result};
use crate::types::UserId;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Register a user account",
    request_body = UserRegister,
    responses(
        (status = 201, description = "Account created; the API key is only returned here", body = UserRegisterResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username or email already taken"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register_user(State(state): State<AppState>, Json(create): Json<UserRegister>) -> Result<(StatusCode, Json<UserRegisterResponse>)> {
    if create.username.trim().is_empty() {
        return Err(Error::Validation {
            message: "username must not be empty".to_string(),
        });
    }
    if !create.email.contains('@') {
        return Err(Error::Validation {
            message: "email is not a valid address".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo.create(&UserCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, Json(UserRegisterResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get a user account",
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "User ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    if current_user.id != id && !current_user.is_staff {
        return Err(Error::Forbidden {
            action: "read".to_string(),
            resource: "user".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        }),
    }
}
