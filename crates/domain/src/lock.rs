//! [`Lock`] — a SAP-issued lock handle bound to an [`ObjectIdentity`].

use serde::{Deserialize, Serialize};

use crate::identity::ObjectIdentity;

/// An active lock on an ABAP development object.
///
/// Invariant: at most one active `Lock` per [`ObjectIdentity`] per
/// process; [`adt-lifecycle`](../../adt_lifecycle/index.html)'s engine
/// guarantees release on every exit path (spec.md §8 properties 1–2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub object: ObjectIdentity,
    pub lock_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_request: Option<String>,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
}

impl Lock {
    pub fn new(object: ObjectIdentity, lock_handle: impl Into<String>) -> Self {
        Self {
            object,
            lock_handle: lock_handle.into(),
            transport_request: None,
            acquired_at: chrono::Utc::now(),
        }
    }

    pub fn with_transport_request(mut self, tr: impl Into<String>) -> Self {
        self.transport_request = Some(tr.into());
        self
    }
}
