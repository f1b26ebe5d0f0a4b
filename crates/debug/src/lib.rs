//! External-debugger session coordinator and its HTTP facade
//! (`DebugDaemon`).
//!
//! A single process-wide session slot: only one debug session may be
//! non-terminal (`waiting`/`caught`/`attached`) at a time. A listener
//! background task owns the catch→attach→seed-stack sequence; every other
//! operation is a direct request/response against the session the caller
//! currently holds.

pub mod cancel;
pub mod daemon;
mod listener;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use adt_domain::debug::{Breakpoint, DebugSession, DebugStatus, StackFrame, Variable};
use adt_domain::{Error, OperationClass, Result, SafetyPolicy};
use adt_transport::{RequestSpec, Transport};
use adt_xml::decode;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use cancel::CancelToken;

pub(crate) type SessionHandle = Arc<AsyncMutex<DebugSession>>;

const BREAKPOINTS_PATH: &str = "/sap/bc/adt/debugger/breakpoints";
const STEPS_PATH: &str = "/sap/bc/adt/debugger/steps";
const VARIABLES_PATH: &str = "/sap/bc/adt/debugger/variables";

/// Mirrors `adt_domain::config::TimeoutConfig`'s defaults/ceiling.
const DEFAULT_LISTENER_SECS: u64 = 60;
const MAX_LISTENER_SECS: u64 = 300;
const ROOT_VARIABLE: &str = "@ROOT";

/// What kind of step to issue against an attached debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Into,
    Over,
    Return,
    Continue,
    RunToLine,
    JumpToLine,
    Terminate,
}

impl StepKind {
    fn as_wire(self) -> &'static str {
        match self {
            StepKind::Into => "stepInto",
            StepKind::Over => "stepOver",
            StepKind::Return => "stepReturn",
            StepKind::Continue => "stepContinue",
            StepKind::RunToLine => "stepRunToLine",
            StepKind::JumpToLine => "stepJumpToLine",
            StepKind::Terminate => "terminate",
        }
    }
}

struct SessionEntry {
    handle: SessionHandle,
    cancel: CancelToken,
}

/// Owns the single debug session slot and the breakpoint registry.
pub struct DebugCoordinator {
    transport: Arc<Transport>,
    policy: SafetyPolicy,
    slot: RwLock<Option<SessionEntry>>,
    breakpoints: AsyncMutex<HashMap<String, Breakpoint>>,
}

impl DebugCoordinator {
    pub fn new(transport: Arc<Transport>, policy: SafetyPolicy) -> Self {
        Self {
            transport,
            policy,
            slot: RwLock::new(None),
            breakpoints: AsyncMutex::new(HashMap::new()),
        }
    }

    fn check(&self, class: OperationClass) -> Result<()> {
        self.policy
            .check_operation(class)
            .map_err(|d| Error::PermissionDenied {
                rule: d.rule.to_string(),
                message: d.message,
            })
    }

    fn current_handle(&self) -> Option<SessionHandle> {
        self.slot.read().as_ref().map(|e| e.handle.clone())
    }

    /// `POST /session`: starts the listener task if no non-terminal
    /// session currently holds the slot.
    pub async fn start_session(&self, user: &str, timeout_secs: Option<u64>) -> Result<DebugSession> {
        self.check(OperationClass::Debug)?;

        if let Some(handle) = self.current_handle() {
            let snapshot = handle.lock().await.clone();
            if snapshot.status.is_non_terminal() {
                return Err(Error::Conflict(format!(
                    "debug session {} is already active ({:?})",
                    snapshot.id, snapshot.status
                )));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = DebugSession::new(id, user.to_string());
        let handle: SessionHandle = Arc::new(AsyncMutex::new(session));
        let cancel = CancelToken::new();
        *self.slot.write() = Some(SessionEntry {
            handle: handle.clone(),
            cancel: cancel.clone(),
        });

        let timeout = Duration::from_secs(
            timeout_secs
                .unwrap_or(DEFAULT_LISTENER_SECS)
                .min(MAX_LISTENER_SECS),
        );
        tokio::spawn(listener::run(self.transport.clone(), handle.clone(), cancel, timeout));

        Ok(handle.lock().await.clone())
    }

    /// `GET /session`.
    pub async fn get_session(&self) -> Result<DebugSession> {
        self.check(OperationClass::Debug)?;
        match self.current_handle() {
            Some(handle) => Ok(handle.lock().await.clone()),
            None => Err(Error::NotFound("no active debug session".into())),
        }
    }

    /// `DELETE /session`: detaches and clears the slot so a fresh `POST`
    /// can start immediately, regardless of the listener task's own
    /// progress (it is cancelled but may still be mid-flight on its
    /// detached `DebugSession`, which nothing reads any more).
    pub async fn delete_session(&self) -> Result<()> {
        self.check(OperationClass::Debug)?;
        let entry = self.slot.write().take();
        match entry {
            Some(entry) => {
                entry.cancel.cancel();
                let mut s = entry.handle.lock().await;
                s.status = DebugStatus::Stopped;
                Ok(())
            }
            None => Err(Error::NotFound("no active debug session".into())),
        }
    }

    /// `POST /breakpoint`.
    pub async fn create_breakpoint(&self, mut bp: Breakpoint) -> Result<Breakpoint> {
        self.check(OperationClass::Debug)?;
        let body = breakpoint_request_body(&bp);
        let resp = self
            .transport
            .request(
                RequestSpec::new(reqwest::Method::POST, BREAKPOINTS_PATH)
                    .with_accept("application/xml")
                    .with_body(body.into_bytes(), "application/xml"),
            )
            .await?;
        let root = decode::decode(&resp.body)?;
        let id = root
            .attr("id")
            .ok_or_else(|| Error::Malformed("breakpoint response carried no id".into()))?
            .to_string();
        bp.id = Some(id.clone());
        self.breakpoints.lock().await.insert(id, bp.clone());
        Ok(bp)
    }

    /// `GET /breakpoints`: breakpoints this coordinator created for `user`.
    pub async fn list_breakpoints(&self, user: &str) -> Result<Vec<Breakpoint>> {
        self.check(OperationClass::Debug)?;
        Ok(self
            .breakpoints
            .lock()
            .await
            .values()
            .filter(|bp| bp.user == user)
            .cloned()
            .collect())
    }

    /// `DELETE /breakpoint?id=`.
    pub async fn delete_breakpoint(&self, id: &str) -> Result<()> {
        self.check(OperationClass::Debug)?;
        self.transport
            .request(
                RequestSpec::new(reqwest::Method::DELETE, BREAKPOINTS_PATH)
                    .with_query("id", id)
                    .with_accept("application/xml"),
            )
            .await?;
        self.breakpoints.lock().await.remove(id);
        Ok(())
    }

    /// `POST /step`: issues a step request against the attached debuggee
    /// and updates the session status to `stepping` for its duration.
    pub async fn step(&self, kind: StepKind, uri: Option<&str>) -> Result<DebugSession> {
        self.check(OperationClass::Debug)?;
        let handle = self
            .current_handle()
            .ok_or_else(|| Error::NotFound("no active debug session".into()))?;

        {
            let mut s = handle.lock().await;
            s.status = DebugStatus::Stepping;
        }

        let mut spec = RequestSpec::new(reqwest::Method::POST, STEPS_PATH)
            .with_query("type", kind.as_wire())
            .with_accept("application/xml");
        if let Some(uri) = uri {
            spec = spec.with_query("uri", uri);
        }

        let result = self.transport.request(spec).await;
        let mut s = handle.lock().await;
        match result {
            Ok(_) if kind == StepKind::Terminate => {
                s.status = DebugStatus::Stopped;
            }
            Ok(_) => {
                drop(s);
                let stack = listener::fetch_stack(&self.transport).await?;
                let mut s = handle.lock().await;
                s.status = DebugStatus::Stopped;
                if let Some(frame0) = stack.first() {
                    s.current_uri = Some(frame0.uri.clone());
                    s.current_line = Some(frame0.line);
                }
                s.stack = stack;
            }
            Err(e) => {
                s.status = DebugStatus::Error;
                s.error = Some(e.to_string());
                return Err(e);
            }
        }
        Ok(handle.lock().await.clone())
    }

    /// `GET /stack`: the stack held on the current session (populated by
    /// the listener on attach and refreshed on every step).
    pub async fn get_stack(&self) -> Result<Vec<StackFrame>> {
        self.check(OperationClass::Debug)?;
        let handle = self
            .current_handle()
            .ok_or_else(|| Error::NotFound("no active debug session".into()))?;
        Ok(handle.lock().await.stack.clone())
    }

    /// `GET /variables`: inspect a variable (default `@ROOT`) at the
    /// current stack position.
    pub async fn get_variables(&self, parent_id: Option<&str>) -> Result<Vec<Variable>> {
        self.check(OperationClass::Debug)?;
        self.current_handle()
            .ok_or_else(|| Error::NotFound("no active debug session".into()))?;

        let resp = self
            .transport
            .request(
                RequestSpec::get(VARIABLES_PATH)
                    .with_query("parentId", parent_id.unwrap_or(ROOT_VARIABLE))
                    .with_accept("application/xml"),
            )
            .await?;
        let root = decode::decode(&resp.body)?;
        let mut found = Vec::new();
        root.find_all("variable", &mut found);
        Ok(found
            .iter()
            .map(|el| Variable {
                name: el.attr("name").unwrap_or_default().to_string(),
                value: el.attr("value").map(str::to_string),
                type_name: el.attr("type").map(str::to_string),
                has_children: el.attr("hasChildren") == Some("true"),
            })
            .collect())
    }
}

fn breakpoint_request_body(bp: &Breakpoint) -> String {
    use adt_domain::debug::BreakpointKind;
    match bp.kind {
        BreakpointKind::Line => format!(
            r#"<debugger:breakpoint xmlns:debugger="http://www.sap.com/adt/debugger" debugger:kind="line" debugger:uri="{}" debugger:line="{}"/>"#,
            bp.uri.as_deref().unwrap_or_default(),
            bp.line.unwrap_or(0)
        ),
        BreakpointKind::Exception => format!(
            r#"<debugger:breakpoint xmlns:debugger="http://www.sap.com/adt/debugger" debugger:kind="exception" debugger:exception="{}"/>"#,
            bp.exception.as_deref().unwrap_or_default()
        ),
        BreakpointKind::Statement => format!(
            r#"<debugger:breakpoint xmlns:debugger="http://www.sap.com/adt/debugger" debugger:kind="statement" debugger:statement="{}"/>"#,
            bp.statement.as_deref().unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_domain::config::TimeoutConfig;
    use adt_domain::{Config, SafetyMode};

    fn coordinator(mode: SafetyMode) -> DebugCoordinator {
        let config = Config {
            base_url: "http://127.0.0.1:1".into(),
            user: "DEVELOPER".into(),
            client: "100".into(),
            language: "EN".into(),
            tls_verify: true,
            cookie_overrides: HashMap::new(),
            credential: Default::default(),
            timeouts: TimeoutConfig::default(),
            logging: Default::default(),
            daemon: Default::default(),
            safety: Default::default(),
        };
        let transport = Arc::new(Transport::new(&config, Some("secret".into())).unwrap());
        DebugCoordinator::new(transport, SafetyPolicy::new(mode))
    }

    #[tokio::test]
    async fn read_only_policy_denies_starting_a_session() {
        let coord = coordinator(SafetyMode::ReadOnly);
        let err = coord.start_session("DEVELOPER", None).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn second_start_while_non_terminal_is_conflict() {
        let coord = coordinator(SafetyMode::Full);
        let first = coord.start_session("DEVELOPER", Some(1)).await.unwrap();
        assert_eq!(first.status, DebugStatus::Waiting);

        let err = coord.start_session("DEVELOPER", Some(1)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_without_a_session_is_not_found() {
        let coord = coordinator(SafetyMode::Full);
        let err = coord.delete_session().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_clears_the_slot_so_a_new_session_can_start() {
        let coord = coordinator(SafetyMode::Full);
        coord.start_session("DEVELOPER", Some(1)).await.unwrap();
        coord.delete_session().await.unwrap();

        // Slot is free again even though the old session's listener task
        // (pointed at an unreachable transport) is presumably still
        // winding down in the background.
        let second = coord.start_session("DEVELOPER", Some(1)).await.unwrap();
        assert_eq!(second.status, DebugStatus::Waiting);
    }

    #[tokio::test]
    async fn get_session_without_one_active_is_not_found() {
        let coord = coordinator(SafetyMode::Full);
        let err = coord.get_session().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn list_breakpoints_is_empty_for_a_fresh_coordinator() {
        let coord = coordinator(SafetyMode::Full);
        let bps = coord.list_breakpoints("DEVELOPER").await.unwrap();
        assert!(bps.is_empty());
    }
}
