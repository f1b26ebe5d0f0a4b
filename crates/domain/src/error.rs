//! Shared error taxonomy used across all ADT crates.

/// The error kinds a caller of any ADT component can observe.
///
/// These are taxonomy, not wire types: `adt-dispatcher` maps each variant
/// to a stable JSON envelope field, but the variants themselves are shared
/// by every crate in the workspace.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied ({rule}): {message}")]
    PermissionDenied { rule: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("upstream error ({status}) for {method} {path}: {body_prefix}")]
    Upstream {
        method: String,
        path: String,
        status: u16,
        body_prefix: String,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Sub-case of [`Error::InconsistentState`]: unlock failed after a
    /// cancellation or a failed write, leaving the SAP-side lock held.
    /// Named separately so callers can match on it without string-matching.
    #[error("stuck lock {lock_handle} on {object}: {reason}")]
    StuckLock {
        object: String,
        lock_handle: String,
        reason: String,
    },

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable tag for the dispatcher's JSON envelope.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::PermissionDenied { .. } => "permission_denied",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Cancelled(_) => "cancelled",
            Error::Upstream { .. } => "upstream",
            Error::Malformed(_) => "malformed",
            Error::InconsistentState(_) => "inconsistent_state",
            Error::StuckLock { .. } => "stuck_lock",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::Auth(_) => "auth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_lock_has_its_own_tag() {
        let e = Error::StuckLock {
            object: "ZFOO".into(),
            lock_handle: "LOCK1".into(),
            reason: "unlock timed out".into(),
        };
        assert_eq!(e.kind_tag(), "stuck_lock");
        assert!(e.to_string().contains("LOCK1"));
    }

    #[test]
    fn upstream_message_includes_status_and_path() {
        let e = Error::Upstream {
            method: "POST".into(),
            path: "/sap/bc/adt/foo".into(),
            status: 500,
            body_prefix: "Internal error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("/sap/bc/adt/foo"));
    }
}
