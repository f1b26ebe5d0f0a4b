//! [`ObjectAddressing`] — (ObjectKind, Name[, Parent, Include]) → ADT URI.
//!
//! A tagged enum plus a per-kind dispatch table, not a trait hierarchy:
//! per spec.md §9's design note on "deep polymorphism of ADT object", this
//! keeps `adt-reader`/`adt-lifecycle` code linear instead of requiring a
//! new trait impl per object kind.

use adt_domain::identity::{url_encode_name, IncludeTag, ObjectIdentity, ObjectKind};

/// Compute the canonical ADT source URI for an object identity.
///
/// `Package` has no single source URI (it addresses the repository node
/// structure instead); callers needing that query should use
/// [`package_nodestructure_query`].
pub fn source_uri(id: &ObjectIdentity) -> Option<String> {
    let n = url_encode_name(&id.name);
    Some(match id.kind {
        ObjectKind::Program => format!("/sap/bc/adt/programs/programs/{n}/source/main"),
        ObjectKind::Class => match id.include {
            Some(tag) => class_include_uri(&n, tag),
            None => format!("/sap/bc/adt/oo/classes/{n}/source/main"),
        },
        ObjectKind::Interface => format!("/sap/bc/adt/oo/interfaces/{n}/source/main"),
        ObjectKind::FunctionModule => {
            let group = url_encode_name(id.parent.as_deref().unwrap_or_default());
            format!("/sap/bc/adt/functions/groups/{group}/fmodules/{n}/source/main")
        }
        ObjectKind::FunctionGroup => format!("/sap/bc/adt/functions/groups/{n}/source/main"),
        ObjectKind::Include => format!("/sap/bc/adt/programs/includes/{n}/source/main"),
        ObjectKind::Table => format!("/sap/bc/adt/ddic/tables/{n}/source/main"),
        ObjectKind::View => format!("/sap/bc/adt/ddic/views/{n}/source/main"),
        ObjectKind::Structure => format!("/sap/bc/adt/ddic/structures/{n}/source/main"),
        ObjectKind::DataDefinition => format!("/sap/bc/adt/ddic/ddl/sources/{n}/source/main"),
        ObjectKind::BehaviorDefinition => {
            format!("/sap/bc/adt/bo/behaviordefinitions/{n}/source/main")
        }
        ObjectKind::ServiceDefinition => format!("/sap/bc/adt/ddic/srvd/sources/{n}/source/main"),
        ObjectKind::ServiceBinding => format!("/sap/bc/adt/businessservices/bindings/{n}"),
        ObjectKind::MessageClass => format!("/sap/bc/adt/messageclass/{}", id.name.to_lowercase()),
        ObjectKind::Package | ObjectKind::Transaction => return None,
    })
}

fn class_include_uri(encoded_name: &str, tag: IncludeTag) -> String {
    format!(
        "/sap/bc/adt/oo/classes/{encoded_name}/includes/{}/source/main",
        tag.as_adt_segment()
    )
}

/// The objectstructure endpoint for a class, used by
/// `GetClassObjectStructure`.
pub fn class_object_structure_uri(id: &ObjectIdentity) -> String {
    let n = url_encode_name(&id.name);
    format!("/sap/bc/adt/oo/classes/{n}/objectstructure")
}

/// `Package` addressing goes through the repository node structure query
/// rather than a per-object source URI.
pub fn package_nodestructure_query(package_name: &str) -> (String, Vec<(String, String)>) {
    (
        "/sap/bc/adt/repository/nodestructure".to_string(),
        vec![(
            "parent_name".to_string(),
            url_encode_name(&package_name.to_uppercase()),
        )],
    )
}

/// Whether a media type is required beyond the default `application/xml`
/// for reading this kind's source (most kinds read as plain text).
pub fn is_plain_text_source(kind: ObjectKind) -> bool {
    !matches!(kind, ObjectKind::Package | ObjectKind::Transaction)
}
