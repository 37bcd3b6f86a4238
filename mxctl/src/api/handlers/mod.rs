//! Axum request handlers for the management API.

pub mod developers;
pub mod models;
pub mod reviews;
pub mod usage;
pub mod users;
