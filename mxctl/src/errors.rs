use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Actor lacks rights over the target resource
    #[error("Insufficient permissions to {action} {resource}")]
    Forbidden { action: String, resource: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    Validation { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Developer has exhausted their monthly quota
    #[error("Monthly quota exhausted for developer {developer}")]
    QuotaExhausted { developer: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { action, resource } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::Validation { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::QuotaExhausted { .. } => "Monthly quota exhausted".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => {
                    // Map the schema's unique constraints to actionable messages
                    match (table.as_deref(), constraint.as_deref()) {
                        (Some("users"), Some(c)) if c.contains("email") => "An account with this email address already exists".to_string(),
                        (Some("users"), Some(c)) if c.contains("username") => "This username is already taken".to_string(),
                        (Some("developers"), Some("developers_user_unique")) => "This account already has a developer profile".to_string(),
                        (Some("developers"), Some("developers_name_unique")) => "This developer name is already taken".to_string(),
                        (Some("model_listings"), Some("model_listings_api_name_unique")) => {
                            "A model with this API name already exists. Please choose a different API name.".to_string()
                        }
                        (Some("reviews"), Some("reviews_user_model_unique")) => "You have already reviewed this model".to_string(),
                        (Some("review_votes"), Some("review_votes_user_review_unique")) => {
                            "You have already voted on this review".to_string()
                        }
                        _ => "Resource already exists".to_string(),
                    }
                }
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. } | Error::NotFound { .. } | Error::QuotaExhausted { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // Unique violations get a minimal structured JSON body so clients can
        // tell which resource collided; everything else is a plain message.
        if let Error::Database(DbError::UniqueViolation { constraint, table, .. }) = &self {
            use serde_json::json;

            let resource = match (table.as_deref(), constraint.as_deref()) {
                (Some("users"), _) => "user",
                (Some("developers"), _) => "developer",
                (Some("model_listings"), _) => "model",
                (Some("reviews"), _) => "review",
                (Some("review_votes"), _) => "vote",
                _ => "unknown",
            };
            let body = json!({
                "message": self.user_message(),
                "resource": resource
            });

            return (status, axum::response::Json(body)).into_response();
        }

        let user_message = self.user_message();
        (status, user_message).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
