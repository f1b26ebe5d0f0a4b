//! Typed read operations per [`ObjectKind`], built over `adt-transport` +
//! `adt-transport::addressing`.

pub mod class;
pub mod search;

use adt_domain::{Error, ObjectIdentity, OperationClass, Result, SafetyPolicy};
use adt_transport::{addressing, RequestSpec, Transport};
use std::sync::Arc;

pub use class::{ClassMethod, ClassObjectStructure};
pub use search::ObjectReference;

/// Reads ABAP development object source and metadata. Every method
/// applies `SafetyPolicy(Read)` before touching the network — per spec.md
/// §4.5, reads are always safety-checked even though `Read` is rarely
/// denied, so a caller that misconfigures `BlockedPackages` still gets a
/// consistent `PermissionDenied` instead of an inconsistent partial read.
pub struct Reader {
    transport: Arc<Transport>,
    policy: SafetyPolicy,
}

impl Reader {
    pub fn new(transport: Arc<Transport>, policy: SafetyPolicy) -> Self {
        Self { transport, policy }
    }

    fn check_read(&self, id: &ObjectIdentity) -> Result<()> {
        self.policy
            .check(OperationClass::Read, &id.name)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })
    }

    /// Fetch the plain-text source of an object (or a specific include, if
    /// `id.include` is set).
    pub async fn get_source(&self, id: &ObjectIdentity) -> Result<String> {
        self.check_read(id)?;
        let uri = addressing::source_uri(id)
            .ok_or_else(|| Error::InvalidArgument(format!("{:?} has no single source URI", id.kind)))?;
        let resp = self
            .transport
            .request(RequestSpec::get(uri).with_accept("text/plain"))
            .await?;
        Ok(resp.text())
    }

    /// `SearchObject(query, max)` — see [`search::search_object`].
    pub async fn search_object(&self, query: &str, max: u32) -> Result<Vec<ObjectReference>> {
        search::search_object(&self.transport, query, max).await
    }

    /// `GetClassObjectStructure` — see [`class::get_class_object_structure`].
    pub async fn get_class_object_structure(&self, class_name: &str) -> Result<ClassObjectStructure> {
        let id = ObjectIdentity::new(adt_domain::ObjectKind::Class, class_name);
        self.check_read(&id)?;
        class::get_class_object_structure(&self.transport, &id).await
    }

    /// `GetClassMethodSource(Class, Method)` — see
    /// [`class::get_class_method_source`].
    pub async fn get_class_method_source(&self, class_name: &str, method: &str) -> Result<String> {
        let id = ObjectIdentity::new(adt_domain::ObjectKind::Class, class_name);
        self.check_read(&id)?;
        let structure = class::get_class_object_structure(&self.transport, &id).await?;
        let source = self.get_source(&id).await?;
        class::extract_method_source(&structure, &source, method)
    }
}
