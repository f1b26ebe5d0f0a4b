//! `CreateObject` — create a missing object shell before the engine locks
//! and writes its source.

use adt_domain::{Error, ObjectIdentity, ObjectKind, Result};
use adt_transport::{RequestSpec, Transport};

/// The collection endpoint objects of this kind are created under.
/// `None` for kinds this engine never creates (DDIC/service objects are
/// expected to pre-exist; only source-carrying ABAP objects are
/// creatable here).
fn collection_uri(kind: ObjectKind) -> Option<&'static str> {
    match kind {
        ObjectKind::Program => Some("/sap/bc/adt/programs/programs"),
        ObjectKind::Class => Some("/sap/bc/adt/oo/classes"),
        ObjectKind::Interface => Some("/sap/bc/adt/oo/interfaces"),
        ObjectKind::Include => Some("/sap/bc/adt/programs/includes"),
        ObjectKind::FunctionGroup => Some("/sap/bc/adt/functions/groups"),
        _ => None,
    }
}

pub async fn create_object(
    transport: &Transport,
    id: &ObjectIdentity,
    package: &str,
) -> Result<()> {
    let uri = collection_uri(id.kind).ok_or_else(|| {
        Error::InvalidArgument(format!("{:?} objects cannot be created by WriteObject", id.kind))
    })?;

    let body = format!(
        r#"<adtcore:objectStructure xmlns:adtcore="http://www.sap.com/adt/core">
  <adtcore:name>{name}</adtcore:name>
  <adtcore:packageRef adtcore:name="{package}"/>
</adtcore:objectStructure>"#,
        name = id.name,
        package = package.to_uppercase(),
    );

    transport
        .request(
            RequestSpec::new(reqwest::Method::POST, uri)
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;
    Ok(())
}
