//! ABAP runtime trace data model, shared by `adt-analysis`.

use serde::{Deserialize, Serialize};

/// A single event recorded in an ABAP runtime trace hitlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub program: String,
    pub event: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_micros: Option<u64>,
}

/// Aggregate statistics over a list of [`TraceEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAnalysis {
    pub entries: Vec<TraceEntry>,
    pub total_wall_time_micros: u64,
}

impl TraceAnalysis {
    pub fn from_entries(entries: Vec<TraceEntry>) -> Self {
        let total_wall_time_micros = entries.iter().filter_map(|e| e.duration_micros).sum();
        Self {
            entries,
            total_wall_time_micros,
        }
    }
}
