//! API request/response models, serde + utoipa annotated.

pub mod developers;
pub mod listings;
pub mod reviews;
pub mod usage;
pub mod users;
