//! Dispatcher-only operations that have no dedicated library crate:
//! `GrepObject`/`GrepPackage` (client-side text search over fetched
//! source), `QueryData` (data preview), `FindDefinition`/`FindReferences`
//! (repository navigation/usages), `SyntaxCheck`. Grounded on the same
//! `Transport`/`adt-xml` composition `adt-reader`/`adt-analysis` use, just
//! without a crate of their own since each is a single request/response
//! pair.

use adt_domain::lock::Lock as LockHandle;
use adt_domain::{Error, ObjectIdentity, Result};
use adt_lifecycle::activate::ActivationMessage;
use adt_reader::ObjectReference;
use adt_transport::{addressing, RequestSpec, Transport};
use adt_xml::decode;

const DATA_PREVIEW_PATH: &str = "/sap/bc/adt/datapreview/freestyle";
const NAVIGATION_PATH: &str = "/sap/bc/adt/navigation/target";
const USAGE_REFERENCES_PATH: &str = "/sap/bc/adt/repository/informationsystem/usageReferences";
const CHECK_RUN_PATH: &str = "/sap/bc/adt/checkruns";

/// A single matching line from a client-side grep over fetched source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepHit {
    pub object: String,
    pub line: u32,
    pub text: String,
}

/// Case-insensitive substring grep over one object's source. Not a
/// regular-expression engine: ADT exposes no server-side grep endpoint,
/// so this fetches the source and scans it locally, matching the plain
/// substring semantics `SearchObject`'s wildcards intentionally avoid.
pub fn grep_lines(object: &str, source: &str, pattern: &str) -> Vec<GrepHit> {
    let needle = pattern.to_lowercase();
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(&needle))
        .map(|(i, line)| GrepHit {
            object: object.to_string(),
            line: (i + 1) as u32,
            text: line.to_string(),
        })
        .collect()
}

/// Lists a package's direct repository members (name, source URI), as
/// returned by the `nodestructure` service.
pub async fn list_package_members(transport: &Transport, package: &str) -> Result<Vec<(String, String)>> {
    let (path, query) = addressing::package_nodestructure_query(package);
    let mut spec = RequestSpec::get(path).with_accept("application/xml");
    for (k, v) in query {
        spec = spec.with_query(k, v);
    }
    let resp = transport.request(spec).await?;
    let root = decode::decode(&resp.body)?;
    let mut found = Vec::new();
    root.find_all("node", &mut found);
    Ok(found
        .iter()
        .filter_map(|el| {
            let name = el.attr("name")?.to_string();
            let uri = el.attr("uri")?.to_string();
            Some((name, uri))
        })
        .collect())
}

pub async fn fetch_plain_text(transport: &Transport, uri: &str) -> Result<String> {
    let resp = transport
        .request(RequestSpec::get(uri).with_accept("text/plain"))
        .await?;
    Ok(resp.text())
}

/// `QueryData`: a bare identifier (`^[A-Za-z_][A-Za-z0-9_]*$`) is expanded
/// to `SELECT * FROM {id}`; anything else is sent to the data preview
/// service verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPreviewRow {
    pub columns: Vec<(String, String)>,
}

pub fn expand_query(query: &str) -> String {
    let is_bare_identifier = !query.is_empty()
        && query.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && query.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_bare_identifier {
        format!("SELECT * FROM {query}")
    } else {
        query.to_string()
    }
}

pub async fn query_data(transport: &Transport, query: &str) -> Result<Vec<DataPreviewRow>> {
    let sql = expand_query(query);
    let body = format!(
        r#"<dataPreview:dataPreview xmlns:dataPreview="http://www.sap.com/adt/dataPreview">
  <dataPreview:freeStyle>{sql}</dataPreview:freeStyle>
</dataPreview:dataPreview>"#,
        sql = sql
    );
    let resp = transport
        .request(
            RequestSpec::new(reqwest::Method::POST, DATA_PREVIEW_PATH)
                .with_query("rowNumber", "100")
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    let mut rows = Vec::new();
    let mut found = Vec::new();
    root.find_all("row", &mut found);
    for row_el in found {
        let mut columns = Vec::new();
        let mut cells = Vec::new();
        row_el.find_all("cell", &mut cells);
        for cell in cells {
            let name = cell.attr("name").unwrap_or_default().to_string();
            columns.push((name, cell.text.clone()));
        }
        rows.push(DataPreviewRow { columns });
    }
    Ok(rows)
}

/// `FindDefinition`: resolves a source position to the URI/line/column of
/// its declaration, or `None` if the server reports nothing navigable at
/// that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub uri: String,
    pub line: u32,
    pub column: u32,
}

pub async fn find_definition(
    transport: &Transport,
    source_uri: &str,
    line: u32,
    column: u32,
) -> Result<Option<NavigationTarget>> {
    let resp = transport
        .request(
            RequestSpec::get(NAVIGATION_PATH)
                .with_query("uri", format!("{source_uri}#start={line},{column}"))
                .with_accept("application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    Ok(root.attr("uri").map(|uri| NavigationTarget {
        uri: uri.to_string(),
        line: root.attr("line").and_then(|v| v.parse().ok()).unwrap_or(0),
        column: root.attr("column").and_then(|v| v.parse().ok()).unwrap_or(0),
    }))
}

/// `FindReferences`: every place in the repository that uses the object
/// at `source_uri`.
pub async fn find_references(transport: &Transport, source_uri: &str) -> Result<Vec<ObjectReference>> {
    let resp = transport
        .request(
            RequestSpec::get(USAGE_REFERENCES_PATH)
                .with_query("uri", source_uri)
                .with_accept("application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    let mut found = Vec::new();
    root.find_all("referencedObject", &mut found);
    Ok(found
        .iter()
        .filter_map(|el| {
            let name = el.attr("name")?.to_string();
            let object_type = el.attr("type").unwrap_or_default().to_string();
            Some(ObjectReference { name, object_type })
        })
        .collect())
}

/// `SyntaxCheck`: submits source for a check without writing it,
/// returning the same shape of diagnostic `adt-lifecycle`'s activation
/// step uses.
pub async fn syntax_check(transport: &Transport, id: &ObjectIdentity, source: &str) -> Result<Vec<ActivationMessage>> {
    let uri = addressing::source_uri(id)
        .ok_or_else(|| Error::InvalidArgument(format!("{:?} has no single source URI", id.kind)))?;
    let body = format!(
        r#"<chkrun:checkObjectList xmlns:chkrun="http://www.sap.com/adt/checkrun">
  <chkrun:checkObject chkrun:uri="{uri}" chkrun:version="active">
    <chkrun:artifacts>
      <chkrun:artifact chkrun:contentType="text/plain; charset=utf-8" chkrun:uri="{uri}">
        <chkrun:content>{source}</chkrun:content>
      </chkrun:artifact>
    </chkrun:artifacts>
  </chkrun:checkObject>
</chkrun:checkObjectList>"#,
        uri = uri,
        source = source
    );
    let resp = transport
        .request(
            RequestSpec::new(reqwest::Method::POST, CHECK_RUN_PATH)
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;

    if resp.body.is_empty() {
        return Ok(Vec::new());
    }
    let root = decode::decode(&resp.body)?;
    let mut found = Vec::new();
    root.find_all("message", &mut found);
    Ok(found
        .iter()
        .map(|el| ActivationMessage {
            severity: el.attr("type").unwrap_or("E").to_string(),
            text: el.attr("shortText").unwrap_or(&el.text).to_string(),
            object: el.attr("uri").unwrap_or_default().to_string(),
            line: el.attr("line").and_then(|v| v.parse().ok()),
        })
        .collect())
}

/// Resolve a [`LockHandle`] from dispatcher args without re-acquiring a
/// lock: `EditSource` operates under a lock the caller already holds.
pub fn lock_handle_from_parts(object: &ObjectIdentity, handle: &str, transport_request: Option<&str>) -> LockHandle {
    let lock = LockHandle::new(object.clone(), handle);
    match transport_request {
        Some(tr) => lock.with_transport_request(tr),
        None => lock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifier_expands_to_select_star() {
        assert_eq!(expand_query("ZTABLE"), "SELECT * FROM ZTABLE");
        assert_eq!(expand_query("z_custom_tab"), "SELECT * FROM z_custom_tab");
    }

    #[test]
    fn free_form_query_passes_through() {
        let q = "SELECT name FROM ztable WHERE id = 1";
        assert_eq!(expand_query(q), q);
    }

    #[test]
    fn identifier_with_leading_digit_is_not_bare() {
        let q = "1ZTABLE";
        assert_eq!(expand_query(q), q);
    }

    #[test]
    fn grep_lines_is_case_insensitive_and_one_indexed() {
        let source = "REPORT ztest.\nWRITE 'Hello World'.\nWRITE 'bye'.";
        let hits = grep_lines("ZTEST", source, "hello");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 2);
        assert_eq!(hits[0].object, "ZTEST");
    }

    #[test]
    fn grep_lines_matches_nothing_on_miss() {
        assert!(grep_lines("ZTEST", "REPORT ztest.", "nope").is_empty());
    }
}
