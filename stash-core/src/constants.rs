//! Defaults and naming conventions shared across stash crates.

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Default interval between background sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default TTL for cached page content.
pub const DEFAULT_PAGE_TTL_SECS: u64 = 10;

/// Default deadline for a single page fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY NAMING
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix of the per-URL access counter key (`count:{url}`).
pub const URL_COUNTER_PREFIX: &str = "count:";

/// Builds the access counter key for a URL.
pub fn url_counter_key(url: &str) -> String {
    format!("{}{}", URL_COUNTER_PREFIX, url)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALL HISTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Output-log placeholder for an invocation that has not returned yet.
pub const PENDING_MARKER: &str = "pending";

/// Output-log prefix recorded when the wrapped operation failed.
pub const FAILURE_MARKER_PREFIX: &str = "!error: ";

/// Builds the failure sentinel for an output log.
pub fn failure_marker(err: impl std::fmt::Display) -> String {
    format!("{}{}", FAILURE_MARKER_PREFIX, err)
}
