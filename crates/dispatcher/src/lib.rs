//! `Dispatcher` — the uniform JSON-in/JSON-out operation table spec.md
//! §4.9 describes: a single `dispatch(op, args)` entry point fronting
//! every other crate, so a caller (the CLI, or any future transport)
//! never has to know which library crate backs a given operation name.
//!
//! `SafetyPolicy` is always checked before any `Transport` touch, even
//! for the net-new operations this crate implements directly in
//! [`wire`]: a denial never reaches the network, matching the same
//! property `Reader`/`LifecycleEngine`/`AnalysisOps` already hold.

pub mod envelope;
pub mod expert;
pub mod wire;

use std::sync::Arc;

use adt_domain::{
    Error, IncludeTag, ObjectIdentity, ObjectKind, OperationClass, Result, SafetyPolicy,
};
use adt_lifecycle::{LifecycleEngine, WriteFailure, WriteOptions};
use adt_reader::Reader;
use adt_analysis::AnalysisOps;
use adt_transport::Transport;
use envelope::{optional_bool, optional_str, optional_u32, require_str, Envelope};
use serde_json::{json, Value};

/// Which slice of operations `dispatch` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// The ~13 operations spec.md §4.9 names as the default surface.
    Focused,
    /// Focused, plus per-kind read/write variants and raw atomics.
    Expert,
}

pub struct Dispatcher {
    pub(crate) transport: Arc<Transport>,
    pub(crate) policy: SafetyPolicy,
    pub(crate) reader: Reader,
    lifecycle: LifecycleEngine,
    analysis: AnalysisOps,
    profile: Profile,
}

impl Dispatcher {
    pub fn new(transport: Arc<Transport>, policy: SafetyPolicy, profile: Profile) -> Self {
        let reader = Reader::new(transport.clone(), policy.clone());
        let lifecycle = LifecycleEngine::new(transport.clone(), policy.clone());
        let analysis = AnalysisOps::new(transport.clone(), policy.clone());
        Self {
            transport,
            policy,
            reader,
            lifecycle,
            analysis,
            profile,
        }
    }

    /// Dispatch a single named operation. Unknown operation names, and
    /// Expert-only names under [`Profile::Focused`], are reported as
    /// `Error::InvalidArgument` rather than a panic: a caller that sends
    /// a typo should get a normal error envelope, not a crash.
    pub async fn dispatch(&self, op: &str, args: Value) -> Envelope {
        match self.dispatch_inner(op, &args).await {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::err(&e),
        }
    }

    pub(crate) async fn dispatch_inner(&self, op: &str, args: &Value) -> Result<Value> {
        match op {
            "GetSource" => self.get_source(args).await,
            "WriteSource" => self.write_source(args).await,
            "EditSource" => self.edit_source(args).await,
            "GrepObject" => self.grep_object(args).await,
            "GrepPackage" => self.grep_package(args).await,
            "SearchObject" => self.search_object(args).await,
            "QueryData" => self.query_data(args).await,
            "FindDefinition" => self.find_definition(args).await,
            "FindReferences" => self.find_references(args).await,
            "RunUnitTests" => self.run_unit_tests(args).await,
            "SyntaxCheck" => self.syntax_check(args).await,
            "LockObject" => self.lock_object(args).await,
            "UnlockObject" => self.unlock_object(args).await,
            _ if self.profile == Profile::Expert => expert::dispatch(self, op, args).await,
            _ => Err(Error::InvalidArgument(format!("unknown operation: {op}"))),
        }
    }

    fn identity_from_args(&self, args: &Value) -> Result<ObjectIdentity> {
        let kind = parse_kind(require_str(args, "kind")?)?;
        let name = require_str(args, "name")?;
        let mut id = ObjectIdentity::new(kind, name);
        if let Some(parent) = optional_str(args, "parent") {
            id = id.with_parent(parent);
        }
        if let Some(include) = optional_str(args, "include") {
            id = id.with_include(parse_include(include)?);
        }
        Ok(id)
    }

    async fn get_source(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let source = self.reader.get_source(&id).await?;
        Ok(json!({ "source": source }))
    }

    async fn write_source(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let mode = require_str(args, "mode")?;
        let create_if_missing = match mode {
            "create" => true,
            "update" => false,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "WriteSource requires mode: \"create\" or \"update\", got {other:?}"
                )))
            }
        };
        let source = require_str(args, "source")?;
        let include = id.include.unwrap_or(IncludeTag::Main);
        let options = WriteOptions {
            create_if_missing,
            transport_request: optional_str(args, "transport_request").map(str::to_string),
            activate: optional_bool(args, "activate", false),
            package_for_create: optional_str(args, "package").map(str::to_string),
        };
        let outcome = self
            .lifecycle
            .write_object(&id, &[(include, source.to_string())], &options)
            .await
            .map_err(write_failure_to_error)?;
        let (activated, messages) = match outcome.activation {
            Some(a) => (Some(a.success), activation_messages_to_json(&a.messages)),
            None => (None, Vec::new()),
        };
        Ok(json!({ "activated": activated, "messages": messages }))
    }

    async fn edit_source(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let include = id.include.unwrap_or(IncludeTag::Main);
        let source = require_str(args, "source")?;
        let lock_handle = require_str(args, "lock_handle")?;
        let transport_request = optional_str(args, "transport_request");
        let handle = wire::lock_handle_from_parts(&id, lock_handle, transport_request);
        self.lifecycle.edit_source(&id, include, source, &handle).await?;
        Ok(json!({}))
    }

    async fn grep_object(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let pattern = require_str(args, "pattern")?;
        let source = self.reader.get_source(&id).await?;
        let hits = wire::grep_lines(&id.name, &source, pattern);
        Ok(json!({ "hits": hits_to_json(&hits) }))
    }

    async fn grep_package(&self, args: &Value) -> Result<Value> {
        self.policy
            .check(OperationClass::Read, require_str(args, "package")?)
            .map_err(denied_to_error)?;
        let package = require_str(args, "package")?;
        let pattern = require_str(args, "pattern")?;
        let members = wire::list_package_members(&self.transport, package).await?;
        let mut hits = Vec::new();
        for (name, uri) in members {
            let source = match wire::fetch_plain_text(&self.transport, &uri).await {
                Ok(s) => s,
                Err(_) => continue,
            };
            hits.extend(wire::grep_lines(&name, &source, pattern));
        }
        Ok(json!({ "hits": hits_to_json(&hits) }))
    }

    async fn search_object(&self, args: &Value) -> Result<Value> {
        let query = require_str(args, "query")?;
        let max = optional_u32(args, "max").unwrap_or(50);
        let results = self.reader.search_object(query, max).await?;
        Ok(json!({
            "results": results.into_iter().map(|r| json!({"name": r.name, "type": r.object_type})).collect::<Vec<_>>(),
        }))
    }

    async fn query_data(&self, args: &Value) -> Result<Value> {
        self.policy
            .check_operation(OperationClass::Read)
            .map_err(denied_to_error)?;
        let query = require_str(args, "query")?;
        let rows = wire::query_data(&self.transport, query).await?;
        let rows: Vec<Value> = rows
            .into_iter()
            .map(|r| {
                let map: serde_json::Map<String, Value> = r
                    .columns
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                Value::Object(map)
            })
            .collect();
        Ok(json!({ "rows": rows }))
    }

    async fn find_definition(&self, args: &Value) -> Result<Value> {
        self.policy
            .check_operation(OperationClass::Read)
            .map_err(denied_to_error)?;
        let uri = require_str(args, "uri")?;
        let line = optional_u32(args, "line").unwrap_or(0);
        let column = optional_u32(args, "column").unwrap_or(0);
        let target = wire::find_definition(&self.transport, uri, line, column).await?;
        Ok(match target {
            Some(t) => json!({"uri": t.uri, "line": t.line, "column": t.column}),
            None => Value::Null,
        })
    }

    async fn find_references(&self, args: &Value) -> Result<Value> {
        self.policy
            .check_operation(OperationClass::Read)
            .map_err(denied_to_error)?;
        let uri = require_str(args, "uri")?;
        let refs = wire::find_references(&self.transport, uri).await?;
        Ok(json!({
            "references": refs.into_iter().map(|r| json!({"name": r.name, "type": r.object_type})).collect::<Vec<_>>(),
        }))
    }

    async fn run_unit_tests(&self, args: &Value) -> Result<Value> {
        let object_uri = require_str(args, "object_uri")?;
        let passed = self.analysis.run_unit_tests(object_uri).await?;
        Ok(json!({ "passed": passed }))
    }

    async fn syntax_check(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        self.policy
            .check(OperationClass::Read, &id.name)
            .map_err(denied_to_error)?;
        let source = require_str(args, "source")?;
        let messages = wire::syntax_check(&self.transport, &id, source).await?;
        Ok(json!({
            "ok": !messages.iter().any(|m| m.severity == "E" || m.severity == "A"),
            "messages": messages.into_iter().map(|m| json!({
                "severity": m.severity, "text": m.text, "object": m.object, "line": m.line,
            })).collect::<Vec<_>>(),
        }))
    }

    async fn lock_object(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let lock = self.lifecycle.lock(&id).await?;
        Ok(json!({
            "lock_handle": lock.lock_handle,
            "transport_request": lock.transport_request,
        }))
    }

    async fn unlock_object(&self, args: &Value) -> Result<Value> {
        let id = self.identity_from_args(args)?;
        let lock_handle = require_str(args, "lock_handle")?;
        let transport_request = optional_str(args, "transport_request");
        let handle = wire::lock_handle_from_parts(&id, lock_handle, transport_request);
        self.lifecycle.unlock(&handle).await?;
        Ok(json!({}))
    }
}

pub(crate) fn parse_kind(name: &str) -> Result<ObjectKind> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| Error::InvalidArgument(format!("unknown object kind: {name}")))
}

pub(crate) fn parse_include(name: &str) -> Result<IncludeTag> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| Error::InvalidArgument(format!("unknown include tag: {name}")))
}

pub(crate) fn denied_to_error(d: adt_domain::Denied) -> Error {
    Error::PermissionDenied {
        rule: d.rule.to_string(),
        message: d.message,
    }
}

fn write_failure_to_error(f: WriteFailure) -> Error {
    match f {
        WriteFailure::Error(e) => e,
        WriteFailure::PartialSuccess {
            updated_includes,
            cause,
            ..
        } => Error::InconsistentState(format!(
            "write partially applied ({} include(s) written) before failing: {cause}",
            updated_includes.len()
        )),
        WriteFailure::ActivationFailed { result } => Error::Malformed(format!(
            "activation failed with {} diagnostic message(s)",
            result.messages.len()
        )),
    }
}

fn hits_to_json(hits: &[wire::GrepHit]) -> Vec<Value> {
    hits.iter()
        .map(|h| json!({"object": h.object, "line": h.line, "text": h.text}))
        .collect()
}

fn activation_messages_to_json(messages: &[adt_lifecycle::activate::ActivationMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({"severity": m.severity, "text": m.text, "object": m.object, "line": m.line}))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_domain::{Config, SafetyMode};
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config {
            base_url: "http://127.0.0.1:1".into(),
            user: "DEVELOPER".into(),
            client: "100".into(),
            language: "EN".into(),
            tls_verify: true,
            cookie_overrides: HashMap::new(),
            credential: Default::default(),
            timeouts: adt_domain::config::TimeoutConfig::default(),
            logging: Default::default(),
            daemon: Default::default(),
            safety: Default::default(),
        }
    }

    fn dispatcher(mode: SafetyMode) -> Dispatcher {
        let config = test_config();
        let transport = Arc::new(Transport::new(&config, Some("secret".into())).expect("transport"));
        Dispatcher::new(transport, SafetyPolicy::new(mode), Profile::Focused)
    }

    #[tokio::test]
    async fn write_source_without_mode_is_invalid_argument() {
        let d = dispatcher(SafetyMode::Full);
        let env = d
            .dispatch(
                "WriteSource",
                json!({"kind": "program", "name": "ZTEST", "source": "REPORT ztest."}),
            )
            .await;
        assert!(!env.success);
        assert_eq!(env.error_kind, Some("invalid_argument"));
    }

    #[tokio::test]
    async fn write_source_in_read_only_mode_is_denied_before_any_network_call() {
        let d = dispatcher(SafetyMode::ReadOnly);
        let env = d
            .dispatch(
                "WriteSource",
                json!({"kind": "program", "name": "ZTEST", "mode": "update", "source": "REPORT ztest."}),
            )
            .await;
        assert!(!env.success);
        assert_eq!(env.error_kind, Some("permission_denied"));
    }

    #[tokio::test]
    async fn unknown_operation_is_invalid_argument() {
        let d = dispatcher(SafetyMode::Full);
        let env = d.dispatch("DoesNotExist", json!({})).await;
        assert!(!env.success);
        assert_eq!(env.error_kind, Some("invalid_argument"));
    }

    #[tokio::test]
    async fn expert_only_operation_is_rejected_under_focused_profile() {
        let d = dispatcher(SafetyMode::Full);
        let env = d.dispatch("ReadRaw", json!({"uri": "/sap/bc/adt/x"})).await;
        assert!(!env.success);
        assert_eq!(env.error_kind, Some("invalid_argument"));
    }

    #[test]
    fn query_data_expands_bare_identifiers_through_the_wire_module() {
        assert_eq!(wire::expand_query("ZCUSTOMERS"), "SELECT * FROM ZCUSTOMERS");
    }
}
