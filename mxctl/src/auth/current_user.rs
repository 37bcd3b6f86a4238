//! Extractors for resolving the authenticated actor from a bearer API key.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::instrument;

use crate::api::models::users::CurrentUser;
use crate::db::handlers::Users;
use crate::errors::{Error, Result};
use crate::AppState;

/// Pull the bearer token out of the Authorization header, if present.
/// A malformed header is an error rather than a silent miss.
fn bearer_token(parts: &Parts) -> Result<Option<String>> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| Error::Unauthenticated {
        message: Some("Invalid authorization header".to_string()),
    })?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(Error::Unauthenticated {
            message: Some("Authorization header must be 'Bearer <api-key>'".to_string()),
        }),
    }
}

#[instrument(skip_all)]
async fn resolve_api_key(state: &AppState, api_key: &str) -> Result<Option<CurrentUser>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);

    Ok(users.get_by_api_key(api_key).await?.map(CurrentUser::from))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?.ok_or(Error::Unauthenticated { message: None })?;

        resolve_api_key(state, &token).await?.ok_or(Error::Unauthenticated {
            message: Some("Invalid API key".to_string()),
        })
    }
}

/// Optional authentication: anonymous when no Authorization header is sent,
/// but a *presented* key must still be valid.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match bearer_token(parts)? {
            None => Ok(OptionalUser(None)),
            Some(token) => {
                let user = resolve_api_key(state, &token).await?.ok_or(Error::Unauthenticated {
                    message: Some("Invalid API key".to_string()),
                })?;
                Ok(OptionalUser(Some(user)))
            }
        }
    }
}
