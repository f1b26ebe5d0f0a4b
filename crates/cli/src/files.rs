//! Local file-naming convention for source sync (spec.md §6): ABAP
//! source files are named `<name>.<kind-extension>`, with `/` in a
//! namespaced name mapped to `#` via [`adt_domain::identity::to_filename`]
//! / [`adt_domain::identity::from_filename`].

use adt_domain::identity::{from_filename, to_filename};
use adt_domain::{Error, ObjectKind, Result};

const KIND_EXTENSIONS: &[(ObjectKind, &str)] = &[
    (ObjectKind::Program, "prog.abap"),
    (ObjectKind::Class, "clas.abap"),
    (ObjectKind::Interface, "intf.abap"),
    (ObjectKind::FunctionGroup, "fugr.abap"),
    (ObjectKind::FunctionModule, "fugr.abap"),
    (ObjectKind::Include, "prog.abap"),
    (ObjectKind::Table, "tabl.xml"),
    (ObjectKind::View, "view.xml"),
    (ObjectKind::Structure, "tabl.xml"),
    (ObjectKind::DataDefinition, "ddls.asddls"),
    (ObjectKind::BehaviorDefinition, "bdef.asbdef"),
    (ObjectKind::ServiceDefinition, "srvd.asrvd"),
    (ObjectKind::ServiceBinding, "srvb.asrvb"),
    (ObjectKind::MessageClass, "msag.xml"),
    (ObjectKind::Package, "devc.xml"),
    (ObjectKind::Transaction, "tran.xml"),
];

/// Parse a CLI-supplied kind name (e.g. `"program"`) the same way
/// `Dispatcher`'s own `kind` JSON field does, via `ObjectKind`'s
/// snake_case `Deserialize`.
pub fn parse_kind(name: &str) -> Result<ObjectKind> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| Error::InvalidArgument(format!("unknown object kind: {name}")))
}

fn extension_for_kind(kind: ObjectKind) -> &'static str {
    KIND_EXTENSIONS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, ext)| *ext)
        .expect("every ObjectKind has a local file extension")
}

/// `(Class, "/DMO/CL_X")` -> `"#DMO#CL_X.clas.abap"`.
pub fn local_filename(kind: ObjectKind, name: &str) -> String {
    format!("{}.{}", to_filename(name), extension_for_kind(kind))
}

/// Inverse of [`local_filename`]: split a file name on the first `.` and
/// recover `(kind, name)`. Errors if the extension doesn't match a known
/// kind.
pub fn parse_local_filename(file_name: &str) -> Result<(ObjectKind, String)> {
    let (stem, ext) = file_name.split_once('.').ok_or_else(|| {
        Error::InvalidArgument(format!("{file_name} has no extension"))
    })?;
    let kind = KIND_EXTENSIONS
        .iter()
        .find(|(_, known_ext)| *known_ext == ext)
        .map(|(k, _)| *k)
        .ok_or_else(|| Error::InvalidArgument(format!("unrecognized extension: .{ext}")))?;
    Ok((kind, from_filename(stem)))
}
