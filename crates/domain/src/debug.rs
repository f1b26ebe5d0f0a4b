//! Data model for the external-debugger session coordinator (spec.md §4.7).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointKind {
    Line,
    Exception,
    Statement,
}

/// An external breakpoint, mirroring the ADT debugger breakpoint shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Server-assigned on create; `None` before the create call returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: BreakpointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub enabled: bool,
    pub user: String,
}

impl Breakpoint {
    pub fn line(uri: impl Into<String>, line: u32, user: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: BreakpointKind::Line,
            uri: Some(uri.into()),
            line: Some(line),
            exception: None,
            statement: None,
            condition: None,
            enabled: true,
            user: user.into(),
        }
    }

    pub fn exception(name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: BreakpointKind::Exception,
            uri: None,
            line: None,
            exception: Some(name.into()),
            statement: None,
            condition: None,
            enabled: true,
            user: user.into(),
        }
    }
}

/// Debug session lifecycle state. See spec.md §4.7 for the full state
/// diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStatus {
    Waiting,
    Caught,
    Attached,
    AttachFailed,
    Stepping,
    Stopped,
    Error,
    Timeout,
}

impl DebugStatus {
    /// Statuses from which a second `POST /session` must be rejected with
    /// 409 (spec.md §4.7 concurrency, §8 property 9: `{waiting, caught,
    /// attached}` exactly — `stepping` is a transient sub-state of
    /// `attached` and `attach_failed` already requires a `DELETE` to clear).
    pub fn is_non_terminal(self) -> bool {
        matches!(
            self,
            DebugStatus::Waiting | DebugStatus::Caught | DebugStatus::Attached
        )
    }
}

/// A single stack frame as reported by the debugger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackFrame {
    pub uri: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

/// A single inspected variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub has_children: bool,
}

/// The full state of a single debug session, owned by the `DebugDaemon`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSession {
    pub id: String,
    pub status: DebugStatus,
    pub user: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debuggee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_line: Option<u32>,
    #[serde(default)]
    pub stack: Vec<StackFrame>,
    #[serde(default)]
    pub variables: HashMap<String, Variable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DebugSession {
    pub fn new(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: DebugStatus::Waiting,
            user: user.into(),
            start_time: chrono::Utc::now(),
            debuggee_id: None,
            current_uri: None,
            current_line: None,
            stack: Vec::new(),
            variables: HashMap::new(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_terminal_statuses() {
        assert!(DebugStatus::Waiting.is_non_terminal());
        assert!(DebugStatus::Caught.is_non_terminal());
        assert!(DebugStatus::Attached.is_non_terminal());
        assert!(!DebugStatus::Stepping.is_non_terminal());
        assert!(!DebugStatus::Stopped.is_non_terminal());
        assert!(!DebugStatus::Timeout.is_non_terminal());
        assert!(!DebugStatus::Error.is_non_terminal());
        assert!(!DebugStatus::AttachFailed.is_non_terminal());
    }

    #[test]
    fn new_session_starts_waiting() {
        let s = DebugSession::new("sess-1", "DEVELOPER");
        assert_eq!(s.status, DebugStatus::Waiting);
        assert!(s.stack.is_empty());
    }
}
