//! `GetCallGraph`/`FlattenCallGraph`/`AnalyzeCallGraph`/`CompareCallGraphs`.

use std::collections::{HashMap, HashSet};

use adt_domain::callgraph::{CallGraphEdge, CallGraphNode};
use adt_domain::Result;
use adt_transport::{RequestSpec, Transport};
use adt_xml::decode::{self, Element};

const CALLGRAPH_PATH: &str = "/sap/bc/adt/repository/informationsystem/callgraph";

/// `direction` in `GetCallGraph`: whose call sites the tree expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Callers,
    Callees,
}

impl Direction {
    fn as_wire(self) -> &'static str {
        match self {
            Direction::Callers => "callers",
            Direction::Callees => "callees",
        }
    }
}

const DEFAULT_MAX_DEPTH: u32 = 3;
const DEFAULT_MAX_RESULTS: u32 = 100;

pub async fn get_call_graph(
    transport: &Transport,
    object_uri: &str,
    direction: Direction,
    max_depth: Option<u32>,
    max_results: Option<u32>,
) -> Result<CallGraphNode> {
    let body = format!(
        r#"<callgraph:request xmlns:callgraph="http://www.sap.com/adt/callgraph">
  <callgraph:objectUri>{object_uri}</callgraph:objectUri>
  <callgraph:direction>{direction}</callgraph:direction>
  <callgraph:maxDepth>{max_depth}</callgraph:maxDepth>
  <callgraph:maxResults>{max_results}</callgraph:maxResults>
</callgraph:request>"#,
        object_uri = object_uri,
        direction = direction.as_wire(),
        max_depth = max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS),
    );

    let resp = transport
        .request(
            RequestSpec::new(reqwest::Method::POST, CALLGRAPH_PATH)
                .with_accept("application/xml")
                .with_body(body.into_bytes(), "application/xml"),
        )
        .await?;

    let root = decode::decode(&resp.body)?;
    Ok(node_from_element(&root))
}

fn node_from_element(el: &Element) -> CallGraphNode {
    CallGraphNode {
        uri: el.attr("uri").unwrap_or_default().to_string(),
        name: el.attr("name").unwrap_or_default().to_string(),
        node_type: el.attr("type").unwrap_or_default().to_string(),
        description: el.attr("description").unwrap_or_default().to_string(),
        line: el.attr("line").and_then(|v| v.parse().ok()).unwrap_or(0),
        column: el.attr("column").and_then(|v| v.parse().ok()).unwrap_or(0),
        children: el
            .children_named("node")
            .map(node_from_element)
            .collect(),
    }
}

/// Pre-order traversal of the tree into caller→callee edges. No
/// deduplication: a callee reached through two distinct call sites
/// appears as two edges.
pub fn flatten_call_graph(root: &CallGraphNode) -> Vec<CallGraphEdge> {
    let mut edges = Vec::new();
    flatten_into(root, &mut edges);
    edges
}

fn flatten_into(node: &CallGraphNode, out: &mut Vec<CallGraphEdge>) {
    for child in &node.children {
        out.push(CallGraphEdge {
            caller_uri: node.uri.clone(),
            caller_name: node.name.clone(),
            callee_uri: child.uri.clone(),
            callee_name: child.name.clone(),
            line: child.line,
        });
        flatten_into(child, out);
    }
}

/// Aggregate statistics over a call-graph tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallGraphStats {
    /// Count of distinct node URIs in the tree.
    pub total_nodes: usize,
    /// Count of all parent→child edges, including duplicates from
    /// repeated call sites.
    pub total_edges: usize,
    pub max_depth: u32,
    pub nodes_by_type: HashMap<String, usize>,
    /// The distinct URIs backing `total_nodes`, sorted for determinism.
    pub unique_nodes: Vec<String>,
}

pub fn analyze_call_graph(root: &CallGraphNode) -> CallGraphStats {
    let mut seen = HashSet::new();
    let mut nodes_by_type: HashMap<String, usize> = HashMap::new();
    let max_depth = walk_stats(root, 1, &mut seen, &mut nodes_by_type);

    let mut unique_nodes: Vec<String> = seen.into_iter().collect();
    unique_nodes.sort();

    CallGraphStats {
        total_nodes: unique_nodes.len(),
        total_edges: flatten_call_graph(root).len(),
        max_depth,
        nodes_by_type,
        unique_nodes,
    }
}

fn walk_stats(
    node: &CallGraphNode,
    depth: u32,
    seen: &mut HashSet<String>,
    nodes_by_type: &mut HashMap<String, usize>,
) -> u32 {
    if seen.insert(node.uri.clone()) {
        *nodes_by_type.entry(node.node_type.clone()).or_insert(0) += 1;
    }
    node.children
        .iter()
        .map(|c| walk_stats(c, depth + 1, seen, nodes_by_type))
        .max()
        .unwrap_or(depth)
}

/// Result of comparing a statically-derived call graph against edges
/// extracted from a runtime trace. Edges are keyed by `(caller_name,
/// callee_name)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallGraphComparison {
    pub common: Vec<(String, String)>,
    pub static_only: Vec<(String, String)>,
    pub actual_only: Vec<(String, String)>,
    pub coverage_ratio: f64,
}

pub fn compare_call_graphs(
    static_root: &CallGraphNode,
    actual_edges: &[(String, String)],
) -> CallGraphComparison {
    let static_pairs: HashSet<(String, String)> = flatten_call_graph(static_root)
        .into_iter()
        .map(|e| (e.caller_name, e.callee_name))
        .collect();
    let actual_pairs: HashSet<(String, String)> = actual_edges.iter().cloned().collect();

    let mut common: Vec<_> = static_pairs.intersection(&actual_pairs).cloned().collect();
    let mut static_only: Vec<_> = static_pairs.difference(&actual_pairs).cloned().collect();
    let mut actual_only: Vec<_> = actual_pairs.difference(&static_pairs).cloned().collect();
    common.sort();
    static_only.sort();
    actual_only.sort();

    let coverage_ratio = if static_pairs.is_empty() {
        0.0
    } else {
        common.len() as f64 / static_pairs.len() as f64
    };

    CallGraphComparison {
        common,
        static_only,
        actual_only,
        coverage_ratio,
    }
}
