//! Window boundary math
//!
//! All window boundaries in the core are timezone-aware `DateTime<Utc>`
//! instants; normalizing other representations is the caller's concern.

use chrono::{DateTime, Utc};

/// Clamp a window start to no earlier than `end - ttl`
///
/// Used by `materialize`: a view with a TTL never syncs rows older than its
/// retention bound. A TTL large enough that the bound falls before
/// representable time clamps nothing.
pub fn clamp_start_to_ttl(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ttl: Option<std::time::Duration>,
) -> DateTime<Utc> {
    match ttl
        .and_then(|t| chrono::Duration::from_std(t).ok())
        .and_then(|ttl| end.checked_sub_signed(ttl))
    {
        Some(bound) => start.max(bound),
        None => start,
    }
}
