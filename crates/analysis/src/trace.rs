//! Runtime trace listing/download and `ExtractCallEdgesFromTrace`.

use adt_domain::trace::TraceEntry;
use adt_domain::Result;
use adt_transport::{RequestSpec, Transport};
use adt_xml::decode;

const TRACE_LIST_PATH: &str = "/sap/bc/adt/runtime/traces/requests";
const UNIT_TEST_PATH: &str = "/sap/bc/adt/abapunit/testruns";

/// A single entry in the "latest traces" listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSummary {
    pub id: String,
    pub created_at: String,
}

pub async fn list_latest_traces(transport: &Transport, user: &str) -> Result<Vec<TraceSummary>> {
    let resp = transport
        .request(
            RequestSpec::get(TRACE_LIST_PATH)
                .with_query("user", user.to_uppercase())
                .with_accept("application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    let mut found = Vec::new();
    root.find_all("traceRequest", &mut found);
    Ok(found
        .iter()
        .filter_map(|el| {
            let id = el.attr("id")?.to_string();
            let created_at = el.attr("created").unwrap_or_default().to_string();
            Some(TraceSummary { id, created_at })
        })
        .collect())
}

/// Pick the most recently created trace from a listing (lexicographic on
/// `created_at`, which the server returns as an ISO-8601 timestamp).
pub fn newest_trace(traces: &[TraceSummary]) -> Option<&TraceSummary> {
    traces.iter().max_by(|a, b| a.created_at.cmp(&b.created_at))
}

pub async fn download_hitlist(transport: &Transport, trace_id: &str) -> Result<Vec<TraceEntry>> {
    let path = format!("/sap/bc/adt/runtime/traces/{trace_id}/hitlist");
    let resp = transport
        .request(RequestSpec::get(path).with_accept("application/xml"))
        .await?;

    let root = decode::decode(&resp.body)?;
    let mut found = Vec::new();
    root.find_all("hitEntry", &mut found);
    Ok(found
        .iter()
        .map(|el| TraceEntry {
            program: el.attr("program").unwrap_or_default().to_string(),
            event: el.attr("event").unwrap_or_default().to_string(),
            line: el.attr("line").and_then(|v| v.parse().ok()).unwrap_or(0),
            duration_micros: el.attr("durationMicros").and_then(|v| v.parse().ok()),
        })
        .collect())
}

pub async fn trigger_unit_tests(transport: &Transport, object_uri: &str) -> Result<bool> {
    let body = format!(
        r#"<aunit:runConfiguration xmlns:aunit="http://www.sap.com/adt/aunit">
  <aunit:objectSet>
    <aunit:adtcore:objectReference adtcore:uri="{object_uri}"/>
  </aunit:objectSet>
</aunit:runConfiguration>"#,
        object_uri = object_uri
    );
    transport
        .request(
            RequestSpec::new(reqwest::Method::POST, UNIT_TEST_PATH)
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;
    Ok(true)
}

/// Groups trace entries by `Program` and emits a synthetic caller→callee
/// edge (by program name) each time the `Program` field changes between
/// adjacent entries. No cross-run deduplication: a transition that
/// recurs later in the same trace is recorded again.
pub fn extract_call_edges_from_trace(entries: &[TraceEntry]) -> Vec<(String, String)> {
    entries
        .windows(2)
        .filter(|w| w[0].program != w[1].program)
        .map(|w| (w[0].program.clone(), w[1].program.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(program: &str) -> TraceEntry {
        TraceEntry {
            program: program.to_string(),
            event: "CALL".to_string(),
            line: 1,
            duration_micros: None,
        }
    }

    #[test]
    fn extracts_edge_on_program_change() {
        let entries = vec![entry("ZA"), entry("ZA"), entry("ZB"), entry("ZC")];
        let edges = extract_call_edges_from_trace(&entries);
        assert_eq!(
            edges,
            vec![("ZA".to_string(), "ZB".to_string()), ("ZB".to_string(), "ZC".to_string())]
        );
    }

    #[test]
    fn no_transitions_when_program_never_changes() {
        let entries = vec![entry("ZA"), entry("ZA")];
        assert!(extract_call_edges_from_trace(&entries).is_empty());
    }

    #[test]
    fn newest_trace_picks_max_created_at() {
        let traces = vec![
            TraceSummary { id: "1".into(), created_at: "2026-01-01T00:00:00Z".into() },
            TraceSummary { id: "2".into(), created_at: "2026-06-01T00:00:00Z".into() },
        ];
        assert_eq!(newest_trace(&traces).unwrap().id, "2");
    }

    #[test]
    fn newest_trace_of_empty_list_is_none() {
        assert!(newest_trace(&[]).is_none());
    }
}
