//! UUIDv7 utilities for time-ordered identifiers.
//!
//! Job and page ids use UUIDv7, which embeds a millisecond Unix timestamp in
//! the first 48 bits. Ids generated later sort lexicographically greater,
//! which keeps the `(created_at, id)` claim ordering stable even for jobs
//! created in the same millisecond.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Check whether a UUID is version 7.
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}
