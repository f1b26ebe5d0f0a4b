//! [`ObjectIdentity`] — the tagged, kind-dispatched address of an ABAP
//! development object.
//!
//! Deliberately NOT modeled as a trait hierarchy per object kind: a tagged
//! enum plus free functions keeps `Reader`/`LifecycleEngine` code linear,
//! per the design notes in spec.md §9 ("deep polymorphism of 'ADT
//! object'").

use serde::{Deserialize, Serialize};

/// The kind of ABAP development object being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Program,
    Class,
    Interface,
    FunctionModule,
    FunctionGroup,
    Include,
    Table,
    View,
    Structure,
    /// Core Data Services (CDS) view/entity.
    DataDefinition,
    BehaviorDefinition,
    ServiceDefinition,
    ServiceBinding,
    MessageClass,
    Package,
    Transaction,
}

/// A single named sub-part of a compound object.
///
/// Class objects use most of these; other kinds only ever use `Main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeTag {
    Main,
    Definitions,
    Implementations,
    Testclasses,
    LocalsDef,
    LocalsImp,
    Macros,
}

impl IncludeTag {
    /// The ADT include-segment name, e.g. `testclasses`.
    pub fn as_adt_segment(self) -> &'static str {
        match self {
            IncludeTag::Main => "main",
            IncludeTag::Definitions => "definitions",
            IncludeTag::Implementations => "implementations",
            IncludeTag::Testclasses => "testclasses",
            IncludeTag::LocalsDef => "locals_def",
            IncludeTag::LocalsImp => "locals_imp",
            IncludeTag::Macros => "macros",
        }
    }
}

/// The full (Kind, Name, optional Parent, optional Include) address of an
/// ABAP development object.
///
/// `name` is stored normalized to upper-case (see [`normalize_name`]); the
/// only place case matters is the original caller-supplied string, which
/// is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub kind: ObjectKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<IncludeTag>,
}

impl ObjectIdentity {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: normalize_name(&name.into()),
            parent: None,
            include: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(normalize_name(&parent.into()));
        self
    }

    pub fn with_include(mut self, include: IncludeTag) -> Self {
        self.include = Some(include);
        self
    }

    /// True if `name` is a namespaced name of the form `/NS/REST`.
    pub fn is_namespaced(&self) -> bool {
        is_namespaced_name(&self.name)
    }
}

/// Upper-case a name, preserving the `/NS/NAME` namespace shape.
///
/// SAP object names are case-insensitive on the wire; the canonical form
/// used throughout this crate graph is upper-case, matching spec.md §3's
/// "Name is normalized to upper-case except in URL segments".
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase()
}

/// True if `name` begins with `/` (a namespaced name, e.g. `/DMO/CL_X`).
pub fn is_namespaced_name(name: &str) -> bool {
    name.starts_with('/')
}

/// Percent-encode a normalized object name for use in a URL path segment.
///
/// `/` (namespace delimiters) become `%2F`; nothing else in a valid ABAP
/// identifier needs escaping, but we escape conservatively via the
/// standard path-segment escape set so unexpected characters never break
/// the URL.
pub fn url_encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for b in name.bytes() {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b'/' => out.push_str("%2F"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Convert a (possibly namespaced) object name to a filesystem-safe file
/// stem: `/` becomes `#`.
///
/// Inverse of [`from_filename`]. See spec.md §3 "for file-backed round
/// trips" and §8 property 7.
pub fn to_filename(name: &str) -> String {
    name.replace('/', "#")
}

/// Inverse of [`to_filename`]: `#` becomes `/`.
pub fn from_filename(stem: &str) -> String {
    stem.replace('#', "/")
}
