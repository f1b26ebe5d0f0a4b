//! `Lock`/`Unlock` — SAP-side pessimistic object locking.
//!
//! Grounded on the same request/response shape as `adt-reader`'s class
//! object structure fetch: POST/DELETE with query parameters, response
//! decoded by the tolerant namespace-stripping XML decoder.

use adt_domain::{Error, Lock, ObjectIdentity, Result};
use adt_transport::{addressing, RequestSpec, Transport};
use adt_xml::decode;

const LOCK_ACCEPT: &str = "application/vnd.sap.as+xml";

/// Base object URI for lock/unlock/activate, stripped of the
/// `/source/main` (or per-include) suffix that `source_uri` appends for
/// source reads. Locking is always per-object, never per-include.
pub fn object_base_uri(id: &ObjectIdentity) -> Option<String> {
    let mut whole = id.clone();
    whole.include = None;
    let uri = addressing::source_uri(&whole)?;
    Some(
        uri.strip_suffix("/source/main")
            .unwrap_or(&uri)
            .to_string(),
    )
}

pub async fn lock_object(transport: &Transport, id: &ObjectIdentity) -> Result<Lock> {
    let uri = object_base_uri(id).ok_or_else(|| {
        Error::InvalidArgument(format!("{:?} objects cannot be locked", id.kind))
    })?;

    let resp = transport
        .request(
            RequestSpec::new(reqwest::Method::POST, uri)
                .with_query("_action", "LOCK")
                .with_query("accessMode", "MODIFY")
                .with_accept(LOCK_ACCEPT),
        )
        .await?;

    let handle = extract_lock_handle(&resp.body)?;
    Ok(Lock::new(id.clone(), handle))
}

pub async fn unlock_object(transport: &Transport, lock: &Lock) -> Result<()> {
    let uri = object_base_uri(&lock.object).ok_or_else(|| {
        Error::InvalidArgument(format!("{:?} objects cannot be unlocked", lock.object.kind))
    })?;

    transport
        .request(
            RequestSpec::new(reqwest::Method::POST, uri)
                .with_query("_action", "UNLOCK")
                .with_query("lockHandle", lock.lock_handle.clone())
                .with_accept(LOCK_ACCEPT),
        )
        .await?;
    Ok(())
}

fn extract_lock_handle(xml: &[u8]) -> Result<String> {
    let root = decode::decode(xml)?;
    if let Some(el) = root.child("LOCK_HANDLE") {
        if !el.text.trim().is_empty() {
            return Ok(el.text.trim().to_string());
        }
    }
    let mut found = Vec::new();
    root.find_all("LOCK_HANDLE", &mut found);
    if let Some(el) = found.first() {
        if !el.text.trim().is_empty() {
            return Ok(el.text.trim().to_string());
        }
    }
    if let Some(handle) = root.attr("lockHandle") {
        return Ok(handle.to_string());
    }
    Err(Error::Malformed(
        "lock response carried no LOCK_HANDLE".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_domain::ObjectKind;

    #[test]
    fn object_base_uri_strips_source_main() {
        let id = ObjectIdentity::new(ObjectKind::Program, "ZTEST");
        assert_eq!(
            object_base_uri(&id).unwrap(),
            "/sap/bc/adt/programs/programs/ZTEST"
        );
    }

    #[test]
    fn object_base_uri_ignores_include_for_class() {
        let id = ObjectIdentity::new(ObjectKind::Class, "ZCL_FOO")
            .with_include(adt_domain::IncludeTag::Testclasses);
        assert_eq!(object_base_uri(&id).unwrap(), "/sap/bc/adt/oo/classes/ZCL_FOO");
    }

    #[test]
    fn package_has_no_lockable_uri() {
        let id = ObjectIdentity::new(ObjectKind::Package, "ZPKG");
        assert!(object_base_uri(&id).is_none());
    }

    #[test]
    fn extracts_lock_handle_from_nested_element() {
        let xml = br#"<asx:abap xmlns:asx="urn:x"><asx:values><DATA><LOCK_HANDLE>abc123</LOCK_HANDLE></DATA></asx:values></asx:abap>"#;
        assert_eq!(extract_lock_handle(xml).unwrap(), "abc123");
    }

    #[test]
    fn missing_lock_handle_is_malformed() {
        let xml = br#"<asx:abap xmlns:asx="urn:x"><asx:values/></asx:abap>"#;
        let err = extract_lock_handle(xml).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
