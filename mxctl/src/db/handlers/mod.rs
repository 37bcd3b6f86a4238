//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed operations, and returns domain models from
//! [`crate::db::models`]. Entities with full CRUD lifecycles implement the
//! [`Repository`] trait; ledger-style entities (usage events, reviews)
//! expose purpose-built methods instead.
//!
//! # Common Pattern
//!
//! ```ignore
//! use mxctl::db::handlers::{Developers, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Developers::new(&mut tx);
//!     let developers = repo.list(&Default::default()).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod developers;
pub mod listings;
pub mod reports;
pub mod repository;
pub mod reviews;
pub mod usage_events;
pub mod users;

pub use developers::Developers;
pub use listings::Listings;
pub use repository::Repository;
pub use reviews::Reviews;
pub use usage_events::UsageEvents;
pub use users::Users;
