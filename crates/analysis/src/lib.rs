//! `AnalysisOps` — call-graph retrieval/analysis and runtime-trace
//! comparison, composed on top of `adt-transport`/`adt-xml`.

pub mod callgraph;
pub mod trace;

use std::sync::Arc;

use adt_domain::callgraph::CallGraphNode;
use adt_domain::trace::TraceEntry;
use adt_domain::{Error, OperationClass, Result, SafetyPolicy};
use adt_transport::Transport;

pub use callgraph::{CallGraphComparison, CallGraphStats, Direction};
pub use trace::TraceSummary;

pub struct AnalysisOps {
    transport: Arc<Transport>,
    policy: SafetyPolicy,
}

impl AnalysisOps {
    pub fn new(transport: Arc<Transport>, policy: SafetyPolicy) -> Self {
        Self { transport, policy }
    }

    fn check_read(&self) -> Result<()> {
        self.policy
            .check_operation(OperationClass::Read)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })
    }

    pub async fn get_call_graph(
        &self,
        object_uri: &str,
        direction: Direction,
        max_depth: Option<u32>,
        max_results: Option<u32>,
    ) -> Result<CallGraphNode> {
        self.check_read()?;
        callgraph::get_call_graph(&self.transport, object_uri, direction, max_depth, max_results).await
    }

    pub async fn run_unit_tests(&self, object_uri: &str) -> Result<bool> {
        self.policy
            .check_operation(OperationClass::Execute)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })?;
        trace::trigger_unit_tests(&self.transport, object_uri).await
    }

    pub async fn list_latest_traces(&self, user: &str) -> Result<Vec<TraceSummary>> {
        self.check_read()?;
        trace::list_latest_traces(&self.transport, user).await
    }

    pub async fn download_hitlist(&self, trace_id: &str) -> Result<Vec<TraceEntry>> {
        self.check_read()?;
        trace::download_hitlist(&self.transport, trace_id).await
    }

    /// Composite `TraceExecution`: each step is fault-tolerant. A failing
    /// step leaves its field `None` rather than aborting the remaining
    /// steps, so callers always get back whatever could be learned.
    pub async fn trace_execution(&self, opts: &TraceExecutionOptions) -> TraceExecutionResult {
        let mut result = TraceExecutionResult::default();

        result.static_callees = self
            .get_call_graph(
                &opts.object_uri,
                opts.direction,
                opts.max_depth,
                opts.max_results,
            )
            .await
            .map_err(|e| tracing::warn!(error = %e, "trace_execution: static call graph failed"))
            .ok();

        if opts.run_unit_tests {
            result.unit_tests_triggered = self
                .run_unit_tests(&opts.object_uri)
                .await
                .map_err(|e| tracing::warn!(error = %e, "trace_execution: unit test trigger failed"))
                .ok();
        }

        let traces = self
            .list_latest_traces(&opts.user)
            .await
            .map_err(|e| tracing::warn!(error = %e, "trace_execution: listing traces failed"))
            .ok();

        let newest_id = traces
            .as_deref()
            .and_then(trace::newest_trace)
            .map(|t| t.id.clone());
        result.latest_traces = traces;

        if let Some(id) = newest_id {
            result.hitlist = self
                .download_hitlist(&id)
                .await
                .map_err(|e| tracing::warn!(error = %e, "trace_execution: hitlist download failed"))
                .ok();
        }

        if let Some(hitlist) = &result.hitlist {
            let actual_edges = trace::extract_call_edges_from_trace(hitlist);
            if let Some(static_root) = &result.static_callees {
                result.stats = Some(callgraph::analyze_call_graph(static_root));
                result.comparison = Some(callgraph::compare_call_graphs(static_root, &actual_edges));
            }
            result.actual_edges = Some(actual_edges);
        }

        result
    }
}

#[derive(Debug, Clone)]
pub struct TraceExecutionOptions {
    pub object_uri: String,
    pub user: String,
    pub run_unit_tests: bool,
    pub direction: Direction,
    pub max_depth: Option<u32>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TraceExecutionResult {
    pub static_callees: Option<CallGraphNode>,
    pub unit_tests_triggered: Option<bool>,
    pub latest_traces: Option<Vec<TraceSummary>>,
    pub hitlist: Option<Vec<TraceEntry>>,
    pub actual_edges: Option<Vec<(String, String)>>,
    pub comparison: Option<CallGraphComparison>,
    pub stats: Option<CallGraphStats>,
}
