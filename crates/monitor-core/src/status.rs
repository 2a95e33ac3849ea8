//! Which sources get a re-check for a requested target status.

/// Target status meaning "re-check every source regardless of status".
pub const CHECK_ALL: &str = "all";

pub const AVAILABLE: &str = "available";
pub const UNAVAILABLE: &str = "unavailable";
pub const IN_PROGRESS: &str = "in_progress";
pub const PARTIALLY_AVAILABLE: &str = "partially_available";

/// Returns `true` when a source currently in `source_status` should be
/// re-checked under `target_status`.
///
/// Targeting `unavailable` also picks up sources that were never checked
/// (empty status) and sources stuck `in_progress`. Every other target is an
/// exact, case-sensitive comparison.
pub fn matches(source_status: &str, target_status: &str) -> bool {
    match target_status {
        CHECK_ALL => true,
        UNAVAILABLE => matches!(source_status, UNAVAILABLE | IN_PROGRESS | ""),
        _ => source_status == target_status,
    }
}
