//! `SearchObject` — quick search against the repository information
//! system.

use adt_domain::Result;
use adt_transport::{RequestSpec, Transport};
use adt_xml::decode;

const SEARCH_PATH: &str = "/sap/bc/adt/repository/informationsystem/search";

/// A single search hit. Wildcards `*`/`?` in the query pass through to the
/// server unchanged; this module does no client-side filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    pub name: String,
    pub object_type: String,
}

pub async fn search_object(
    transport: &Transport,
    query: &str,
    max: u32,
) -> Result<Vec<ObjectReference>> {
    let resp = transport
        .request(
            RequestSpec::get(SEARCH_PATH)
                .with_query("operation", "quickSearch")
                .with_query("query", query)
                .with_query("maxResults", max.to_string())
                .with_accept("application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    let mut refs = Vec::new();
    let mut found = Vec::new();
    root.find_all("objectReference", &mut found);
    for el in found {
        let name = el.attr("name").unwrap_or_default().to_string();
        let object_type = el.attr("type").unwrap_or_default().to_string();
        if !name.is_empty() {
            refs.push(ObjectReference { name, object_type });
        }
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_object_reference() {
        let xml = br#"<adtcore:objectReferences xmlns:adtcore="urn:x">
            <adtcore:objectReference adtcore:name="ZTEST" adtcore:type="PROG/P"/>
        </adtcore:objectReferences>"#;
        let root = decode::decode(xml).unwrap();
        let mut found = Vec::new();
        root.find_all("objectReference", &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attr("name"), Some("ZTEST"));
        assert_eq!(found[0].attr("type"), Some("PROG/P"));
    }
}
