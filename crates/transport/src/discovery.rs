//! [`Discovery`] — a one-shot probe against the ADT discovery endpoint.
//!
//! Warms the cookie jar and CSRF token before the first non-idempotent
//! call. Memoized for the lifetime of a [`crate::Transport`]; see
//! SPEC_FULL §9 for why this is once-per-process rather than TTL-based.

pub const DISCOVERY_PATH: &str = "/sap/bc/adt/discovery";

/// Parsed result of a discovery probe. ADT's discovery document is itself
/// a large service catalog; callers of this crate graph only ever need to
/// know that the probe succeeded (it establishes cookies/CSRF), so the
/// parsed form is intentionally minimal rather than a full catalog model.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryInfo {
    pub warmed: bool,
}
