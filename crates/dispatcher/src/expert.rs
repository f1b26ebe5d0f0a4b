//! Expert-profile operations: a per-[`ObjectKind`] read/write variant of
//! `GetSource`/`WriteSource` for callers that already know an object's
//! kind and want a shorter op name than passing `kind` as an argument,
//! plus two raw atomics (`ReadRaw`/`WriteRaw`) that bypass
//! `adt-reader`/`adt-lifecycle` entirely for callers who need to hit an
//! arbitrary ADT URI the Focused profile doesn't model.
//!
//! Both raw atomics still run through [`SafetyPolicy`] first: a raw
//! write is still a `Write`, and the policy sees it as one.

use adt_domain::{Error, ObjectIdentity, ObjectKind, OperationClass, Result};
use adt_transport::RequestSpec;
use serde_json::{json, Value};

use crate::envelope::{optional_bool, optional_str, require_str};
use crate::{parse_kind, Dispatcher};

const KIND_PREFIXES: &[(&str, ObjectKind)] = &[
    ("GetProgramSource", ObjectKind::Program),
    ("GetClassSource", ObjectKind::Class),
    ("GetInterfaceSource", ObjectKind::Interface),
    ("GetFunctionModuleSource", ObjectKind::FunctionModule),
    ("GetTableSource", ObjectKind::Table),
    ("GetViewSource", ObjectKind::View),
    ("GetStructureSource", ObjectKind::Structure),
    ("GetDataDefinitionSource", ObjectKind::DataDefinition),
];

const WRITE_KIND_PREFIXES: &[(&str, ObjectKind)] = &[
    ("WriteProgramSource", ObjectKind::Program),
    ("WriteClassSource", ObjectKind::Class),
    ("WriteInterfaceSource", ObjectKind::Interface),
    ("WriteFunctionModuleSource", ObjectKind::FunctionModule),
    ("WriteTableSource", ObjectKind::Table),
    ("WriteViewSource", ObjectKind::View),
    ("WriteStructureSource", ObjectKind::Structure),
    ("WriteDataDefinitionSource", ObjectKind::DataDefinition),
];

pub async fn dispatch(dispatcher: &Dispatcher, op: &str, args: &Value) -> Result<Value> {
    if let Some((_, kind)) = KIND_PREFIXES.iter().find(|(name, _)| *name == op) {
        return get_kind_source(dispatcher, *kind, args).await;
    }
    if let Some((_, kind)) = WRITE_KIND_PREFIXES.iter().find(|(name, _)| *name == op) {
        return write_kind_source(dispatcher, *kind, args).await;
    }
    match op {
        "ReadRaw" => read_raw(dispatcher, args).await,
        "WriteRaw" => write_raw(dispatcher, args).await,
        _ => Err(Error::InvalidArgument(format!("unknown operation: {op}"))),
    }
}

async fn get_kind_source(dispatcher: &Dispatcher, kind: ObjectKind, args: &Value) -> Result<Value> {
    let name = require_str(args, "name")?;
    let mut id = ObjectIdentity::new(kind, name);
    if let Some(parent) = optional_str(args, "parent") {
        id = id.with_parent(parent);
    }
    let source = dispatcher.reader.get_source(&id).await?;
    Ok(json!({ "source": source }))
}

async fn write_kind_source(dispatcher: &Dispatcher, kind: ObjectKind, args: &Value) -> Result<Value> {
    let mut wrapped = args.clone();
    if let Value::Object(ref mut map) = wrapped {
        map.insert("kind".to_string(), json!(kind_to_wire_name(kind)));
    }
    dispatcher.dispatch_inner("WriteSource", &wrapped).await
}

fn kind_to_wire_name(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Program => "program",
        ObjectKind::Class => "class",
        ObjectKind::Interface => "interface",
        ObjectKind::FunctionModule => "function_module",
        ObjectKind::FunctionGroup => "function_group",
        ObjectKind::Include => "include",
        ObjectKind::Table => "table",
        ObjectKind::View => "view",
        ObjectKind::Structure => "structure",
        ObjectKind::DataDefinition => "data_definition",
        ObjectKind::BehaviorDefinition => "behavior_definition",
        ObjectKind::ServiceDefinition => "service_definition",
        ObjectKind::ServiceBinding => "service_binding",
        ObjectKind::MessageClass => "message_class",
        ObjectKind::Package => "package",
        ObjectKind::Transaction => "transaction",
    }
}

async fn read_raw(dispatcher: &Dispatcher, args: &Value) -> Result<Value> {
    dispatcher
        .policy
        .check_operation(OperationClass::Read)
        .map_err(crate::denied_to_error)?;
    let uri = require_str(args, "uri")?;
    let accept = optional_str(args, "accept").unwrap_or("application/xml");
    let resp = dispatcher
        .transport
        .request(RequestSpec::get(uri).with_accept(accept))
        .await?;
    Ok(json!({ "body": resp.text(), "status": resp.status }))
}

async fn write_raw(dispatcher: &Dispatcher, args: &Value) -> Result<Value> {
    dispatcher
        .policy
        .check_operation(OperationClass::Write)
        .map_err(crate::denied_to_error)?;
    let uri = require_str(args, "uri")?;
    let body = require_str(args, "body")?;
    let content_type = optional_str(args, "content_type").unwrap_or("application/xml");
    let is_post = optional_bool(args, "post", false);
    let method = if is_post {
        reqwest::Method::POST
    } else {
        reqwest::Method::PUT
    };
    let mut spec = RequestSpec::new(method, uri).with_body(body.as_bytes().to_vec(), content_type);
    if let Some(lock_handle) = optional_str(args, "lock_handle") {
        spec = spec.with_query("lockHandle", lock_handle);
    }
    let resp = dispatcher.transport.request(spec).await?;
    Ok(json!({ "body": resp.text(), "status": resp.status }))
}
