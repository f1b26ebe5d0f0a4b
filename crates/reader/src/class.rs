//! Class-specific reads: object structure and per-method source extraction.

use adt_domain::{Error, ObjectIdentity, Result};
use adt_transport::{addressing, RequestSpec, Transport};
use adt_xml::decode;

/// A single method declared in a class's object structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMethod {
    pub name: String,
    /// 1-based, inclusive. `None` if the method has no implementation
    /// (e.g. abstract or interface method).
    pub implementation_start: Option<u32>,
    pub implementation_end: Option<u32>,
}

/// The parsed `objectstructure` response for a class.
#[derive(Debug, Clone, Default)]
pub struct ClassObjectStructure {
    pub includes: Vec<String>,
    pub methods: Vec<ClassMethod>,
}

pub async fn get_class_object_structure(
    transport: &Transport,
    id: &ObjectIdentity,
) -> Result<ClassObjectStructure> {
    let uri = addressing::class_object_structure_uri(id);
    let resp = transport
        .request(RequestSpec::get(uri).with_accept("application/vnd.sap.adt.oo.classes+xml"))
        .await?;
    parse_object_structure(&resp.body)
}

fn parse_object_structure(xml: &[u8]) -> Result<ClassObjectStructure> {
    let root = decode::decode(xml)?;

    let mut includes = Vec::new();
    let mut found: Vec<&decode::Element> = Vec::new();
    root.find_all("include", &mut found);
    for inc in &found {
        if let Some(name) = inc.attr("includeType").or_else(|| inc.attr("name")) {
            includes.push(name.to_string());
        }
    }

    let mut methods = Vec::new();
    let method_els = found_methods(&root);
    for m in &method_els {
        let name = m.attr("name").unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }
        let start = m.attr("implementationStart").and_then(|v| v.parse().ok());
        let end = m.attr("implementationEnd").and_then(|v| v.parse().ok());
        methods.push(ClassMethod {
            name,
            implementation_start: start,
            implementation_end: end,
        });
    }

    Ok(ClassObjectStructure { includes, methods })
}

fn found_methods(root: &decode::Element) -> Vec<&decode::Element> {
    let mut out = Vec::new();
    root.find_all("method", &mut out);
    out
}

/// Extract lines `[start..end]` (1-based, inclusive) from `source` for the
/// named method in `structure`.
///
/// `NotFound` if the method is absent or declared without an
/// implementation; `InconsistentState` if the structure's recorded line
/// bounds exceed the actual source length (the objectstructure response
/// and the source response disagreeing is a server-side inconsistency,
/// not a caller error).
pub fn extract_method_source(
    structure: &ClassObjectStructure,
    source: &str,
    method: &str,
) -> Result<String> {
    let m = structure
        .methods
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(method))
        .ok_or_else(|| Error::NotFound(format!("method {method}")))?;

    let (start, end) = match (m.implementation_start, m.implementation_end) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(Error::NotFound(format!("method {method} has no implementation"))),
    };

    let lines: Vec<&str> = source.lines().collect();
    if start == 0 || end < start || end as usize > lines.len() {
        return Err(Error::InconsistentState(format!(
            "method {method} implementation lines {start}..{end} exceed source of {} lines",
            lines.len()
        )));
    }

    Ok(lines[(start as usize - 1)..(end as usize)].join("\n"))
}
