//! `LifecycleEngine` — the `WriteObject` state machine: optional create,
//! lock, per-include source updates in caller order, optional
//! activation, and lock release on every exit path.
//!
//! No module-level state: every `write_object` call owns its own lock
//! handle end to end, so concurrent calls on distinct objects never
//! interfere (concurrent calls on the *same* object are serialized by the
//! SAP-side lock itself; the loser sees `Conflict`).

pub mod activate;
pub mod create;
pub mod lock;

use std::sync::Arc;

use adt_domain::{Error, IncludeTag, Lock as LockHandle, ObjectIdentity, OperationClass, Result, SafetyPolicy};
use adt_transport::{addressing, RequestSpec, Transport};

pub use activate::ActivationResult;

/// Options for a single `WriteObject` call.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub create_if_missing: bool,
    pub transport_request: Option<String>,
    pub activate: bool,
    pub package_for_create: Option<String>,
}

/// Successful outcome of `WriteObject`.
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    pub activation: Option<ActivationResult>,
}

/// Every way `WriteObject` can fail, distinguishing a clean abort (no
/// lock ever taken, or lock released with nothing written) from a
/// partial write that left some includes updated on the server.
#[derive(thiserror::Error, Debug)]
pub enum WriteFailure {
    #[error(transparent)]
    Error(#[from] Error),

    #[error("write failed on include {failing_include:?} after updating {updated_includes:?}: {cause}")]
    PartialSuccess {
        updated_includes: Vec<IncludeTag>,
        failing_include: IncludeTag,
        cause: Error,
    },

    #[error("activation failed with {} diagnostic message(s)", result.messages.len())]
    ActivationFailed { result: ActivationResult },
}

pub struct LifecycleEngine {
    transport: Arc<Transport>,
    policy: SafetyPolicy,
}

impl LifecycleEngine {
    pub fn new(transport: Arc<Transport>, policy: SafetyPolicy) -> Self {
        Self { transport, policy }
    }

    fn check(&self, class: OperationClass, id: &ObjectIdentity) -> std::result::Result<(), WriteFailure> {
        self.policy
            .check(class, &id.name)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })
            .map_err(WriteFailure::Error)
    }

    /// `WriteObject`: see the module docs for the full state machine.
    pub async fn write_object(
        &self,
        id: &ObjectIdentity,
        sources: &[(IncludeTag, String)],
        options: &WriteOptions,
    ) -> std::result::Result<WriteOutcome, WriteFailure> {
        self.check(OperationClass::Write, id)?;
        if options.create_if_missing {
            self.check(OperationClass::Create, id)?;
        }

        if options.create_if_missing && !self.object_exists(id).await? {
            let pkg = options.package_for_create.as_deref().ok_or_else(|| {
                WriteFailure::Error(Error::InvalidArgument(
                    "CreateIfMissing requires PkgForCreate".into(),
                ))
            })?;
            create::create_object(&self.transport, id, pkg)
                .await
                .map_err(WriteFailure::Error)?;
        }

        self.check(OperationClass::Lock, id)?;
        let handle = lock::lock_object(&self.transport, id)
            .await
            .map_err(WriteFailure::Error)?;

        let mut updated = Vec::new();
        for (include, text) in sources {
            let target = id.clone().with_include(*include);
            if let Err(cause) = self.update_source(&target, text, &handle, options).await {
                self.unlock_or_stuck(&handle).await?;
                return Err(WriteFailure::PartialSuccess {
                    updated_includes: updated,
                    failing_include: *include,
                    cause,
                });
            }
            updated.push(*include);
        }

        let activation = if options.activate {
            match activate::activate_object(&self.transport, id).await {
                Ok(result) if result.success => Some(result),
                Ok(result) => {
                    self.unlock_or_stuck(&handle).await?;
                    return Err(WriteFailure::ActivationFailed { result });
                }
                Err(cause) => {
                    self.unlock_or_stuck(&handle).await?;
                    return Err(WriteFailure::Error(cause));
                }
            }
        } else {
            None
        };

        self.unlock_or_stuck(&handle).await?;
        Ok(WriteOutcome { activation })
    }

    /// Attempt `Unlock` unconditionally. A failure here, arriving after an
    /// earlier failure or at the end of a successful write, is escalated
    /// to `Error::StuckLock` rather than left silent (spec.md §8
    /// property 2).
    async fn unlock_or_stuck(&self, handle: &LockHandle) -> std::result::Result<(), WriteFailure> {
        lock::unlock_object(&self.transport, handle)
            .await
            .map_err(|e| {
                WriteFailure::Error(Error::StuckLock {
                    object: handle.object.name.clone(),
                    lock_handle: handle.lock_handle.clone(),
                    reason: e.to_string(),
                })
            })
    }

    async fn object_exists(&self, id: &ObjectIdentity) -> std::result::Result<bool, WriteFailure> {
        let Some(uri) = addressing::source_uri(id) else {
            return Ok(true);
        };
        match self
            .transport
            .request(RequestSpec::get(uri).with_accept("text/plain"))
            .await
        {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(WriteFailure::Error(e)),
        }
    }

    async fn update_source(
        &self,
        id: &ObjectIdentity,
        text: &str,
        handle: &LockHandle,
        options: &WriteOptions,
    ) -> Result<()> {
        let uri = addressing::source_uri(id).ok_or_else(|| {
            Error::InvalidArgument(format!("{:?} has no source endpoint", id.kind))
        })?;
        let mut spec = RequestSpec::new(reqwest::Method::PUT, uri)
            .with_query("lockHandle", handle.lock_handle.clone())
            .with_body(text.as_bytes().to_vec(), "text/plain; charset=utf-8");
        if let Some(tr) = &options.transport_request {
            spec = spec.with_query("corrNr", tr.clone());
        }
        self.transport.request(spec).await?;
        Ok(())
    }

    /// Thin operation for advanced callers: lock without writing.
    pub async fn lock(&self, id: &ObjectIdentity) -> Result<LockHandle> {
        self.policy
            .check(OperationClass::Lock, &id.name)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })?;
        lock::lock_object(&self.transport, id).await
    }

    /// Thin operation for advanced callers: release a previously
    /// acquired lock.
    pub async fn unlock(&self, handle: &LockHandle) -> Result<()> {
        lock::unlock_object(&self.transport, handle).await
    }

    /// `EditSource`: update a single include under a caller-held lock,
    /// without the full create/activate state machine.
    pub async fn edit_source(
        &self,
        id: &ObjectIdentity,
        include: IncludeTag,
        text: &str,
        handle: &LockHandle,
    ) -> Result<()> {
        self.policy
            .check(OperationClass::Write, &id.name)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })?;
        let target = id.clone().with_include(include);
        self.update_source(&target, text, handle, &WriteOptions::default()).await
    }
}
