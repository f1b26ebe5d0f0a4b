//! `Activate` — inactive-to-active object activation and diagnostics.

use adt_domain::{ObjectIdentity, Result};
use adt_transport::{addressing, RequestSpec, Transport};
use adt_xml::decode;

const ACTIVATION_PATH: &str = "/sap/bc/adt/activation";

/// A single diagnostic message returned by the activation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationMessage {
    pub severity: String,
    pub text: String,
    pub object: String,
    pub line: Option<u32>,
}

/// The outcome of an `Activate` call. `success` is false if any message
/// carries `severity == "E"` (error) or `"A"` (abort).
#[derive(Debug, Clone, Default)]
pub struct ActivationResult {
    pub success: bool,
    pub messages: Vec<ActivationMessage>,
}

pub async fn activate_object(transport: &Transport, id: &ObjectIdentity) -> Result<ActivationResult> {
    let mut whole = id.clone();
    whole.include = None;
    let uri = crate::lock::object_base_uri(&whole).unwrap_or_else(|| {
        addressing::source_uri(&whole).unwrap_or_default()
    });

    let body = format!(
        r#"<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
  <adtcore:objectReference adtcore:uri="{uri}" adtcore:name="{name}"/>
</adtcore:objectReferences>"#,
        uri = uri,
        name = whole.name,
    );

    let resp = transport
        .request(
            RequestSpec::new(reqwest::Method::POST, ACTIVATION_PATH)
                .with_query("method", "activate")
                .with_query("preauditRequested", "true")
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;

    parse_activation_response(&resp.body)
}

fn parse_activation_response(xml: &[u8]) -> Result<ActivationResult> {
    if xml.is_empty() {
        return Ok(ActivationResult {
            success: true,
            messages: Vec::new(),
        });
    }
    let root = decode::decode(xml)?;
    let mut found = Vec::new();
    root.find_all("message", &mut found);

    let mut messages = Vec::new();
    for m in found {
        let severity = m.attr("type").unwrap_or("E").to_string();
        let text = m
            .child("shortText")
            .map(|c| c.text.clone())
            .unwrap_or_else(|| m.text.clone());
        let object = m.attr("objDescr").unwrap_or_default().to_string();
        let line = m.attr("line").and_then(|v| v.parse().ok());
        messages.push(ActivationMessage {
            severity,
            text,
            object,
            line,
        });
    }

    let success = !messages
        .iter()
        .any(|m| m.severity.eq_ignore_ascii_case("E") || m.severity.eq_ignore_ascii_case("A"));

    Ok(ActivationResult { success, messages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_success() {
        let result = parse_activation_response(&[]).unwrap();
        assert!(result.success);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn warning_only_is_success() {
        let xml = br#"<msgs:messages xmlns:msgs="urn:x">
            <msgs:message msgs:type="W" msgs:objDescr="ZTEST" msgs:line="12">Unused variable</msgs:message>
        </msgs:messages>"#;
        let result = parse_activation_response(xml).unwrap();
        assert!(result.success);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].line, Some(12));
    }

    #[test]
    fn error_message_fails_activation() {
        let xml = br#"<msgs:messages xmlns:msgs="urn:x">
            <msgs:message msgs:type="E" msgs:objDescr="ZTEST">Syntax error</msgs:message>
        </msgs:messages>"#;
        let result = parse_activation_response(xml).unwrap();
        assert!(!result.success);
        assert_eq!(result.messages[0].severity, "E");
    }
}
