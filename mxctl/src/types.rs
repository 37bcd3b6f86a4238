//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`UserId`]: User account identifier
//! - [`DeveloperId`]: Developer profile identifier
//! - [`ModelId`]: Model listing identifier
//! - [`UsageEventId`]: Usage ledger entry identifier
//! - [`ReviewId`]: Review identifier

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type DeveloperId = Uuid;
pub type ModelId = Uuid;
pub type UsageEventId = Uuid;
pub type ReviewId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
