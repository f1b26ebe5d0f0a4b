//! Shared data model, error taxonomy, and safety policy for the ADT crate
//! graph.
//!
//! Every other crate in the workspace depends on this one; it has no
//! workspace-internal dependencies of its own.

pub mod callgraph;
pub mod config;
pub mod debug;
pub mod error;
pub mod identity;
pub mod lock;
pub mod safety;
pub mod trace;

pub use config::Config;
pub use error::{Error, Result};
pub use identity::{IncludeTag, ObjectIdentity, ObjectKind};
pub use lock::Lock;
pub use safety::{Denied, OperationClass, SafetyMode, SafetyPolicy};
