//! Call-graph data model shared by `adt-analysis`.

use serde::{Deserialize, Serialize};

/// A node in a call-graph tree rooted at a requested object URI.
///
/// The protocol hides cycles as tree duplication (spec.md §3, §9): the
/// same callee may appear as a child of multiple parents. Consumers that
/// need deduplication (e.g. `AnalyzeCallGraph`) must dedupe explicitly by
/// `uri`; consumers that need the raw call sites (e.g.
/// `FlattenCallGraph`) must not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphNode {
    pub uri: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub children: Vec<CallGraphNode>,
}

impl CallGraphNode {
    pub fn leaf(uri: impl Into<String>, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            node_type: node_type.into(),
            description: String::new(),
            line: 0,
            column: 0,
            children: Vec::new(),
        }
    }
}

/// A single caller→callee edge extracted from a [`CallGraphNode`] tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallGraphEdge {
    pub caller_uri: String,
    pub caller_name: String,
    pub callee_uri: String,
    pub callee_name: String,
    pub line: u32,
}
