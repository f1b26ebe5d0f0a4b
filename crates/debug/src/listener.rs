//! The long-poll listener background task: wait for a debuggee, attach to
//! it, and seed the session's initial stack frame.

use std::sync::Arc;
use std::time::Duration;

use adt_domain::debug::{DebugStatus, StackFrame};
use adt_domain::Result;
use adt_transport::{RequestSpec, Transport};
use adt_xml::decode;
use tokio::sync::Mutex as AsyncMutex;

use crate::cancel::CancelToken;
use crate::SessionHandle;

const LISTENER_PATH: &str = "/sap/bc/adt/debugger/listeners";
const ATTACH_PATH: &str = "/sap/bc/adt/debugger/attach";
const STACK_PATH: &str = "/sap/bc/adt/debugger/stack";

/// Run once: issue the long-poll listener request, and on a catch, attach
/// and fetch the initial stack. Terminates the session in a terminal
/// status (`Timeout`, `Error`, or `AttachFailed`/`Attached`) either way.
/// Does not loop — a fresh session is required to listen again.
pub async fn run(
    transport: Arc<Transport>,
    session: SessionHandle,
    cancel: CancelToken,
    timeout: Duration,
) {
    if cancel.is_cancelled() {
        return;
    }

    match issue_listener(&transport, timeout).await {
        Ok(Some(debuggee_id)) => {
            set_status(&session, DebugStatus::Caught, |s| {
                s.debuggee_id = Some(debuggee_id.clone());
            })
            .await;

            if cancel.is_cancelled() {
                return;
            }

            match attach(&transport, &debuggee_id).await {
                Ok(()) => {
                    set_status(&session, DebugStatus::Attached, |_| {}).await;
                    seed_initial_stack(&transport, &session).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "debug listener: attach failed");
                    set_status(&session, DebugStatus::AttachFailed, |s| {
                        s.error = Some(e.to_string());
                    })
                    .await;
                }
            }
        }
        Ok(None) => {
            set_status(&session, DebugStatus::Timeout, |_| {}).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "debug listener: listener request failed");
            set_status(&session, DebugStatus::Error, |s| {
                s.error = Some(e.to_string());
            })
            .await;
        }
    }
}

async fn set_status(
    session: &AsyncMutex<adt_domain::debug::DebugSession>,
    status: DebugStatus,
    with: impl FnOnce(&mut adt_domain::debug::DebugSession),
) {
    let mut s = session.lock().await;
    s.status = status;
    with(&mut s);
}

/// `None` means the long-poll timed out with no debuggee caught.
async fn issue_listener(transport: &Transport, timeout: Duration) -> Result<Option<String>> {
    let resp = transport
        .request_with_timeout(
            RequestSpec::get(LISTENER_PATH)
                .with_query("debuggingMode", "user")
                .with_query("timeout", timeout.as_secs().to_string())
                .with_accept("application/xml"),
            timeout + Duration::from_secs(5),
        )
        .await;

    match resp {
        Ok(envelope) => {
            let root = decode::decode(&envelope.body)?;
            Ok(root.attr("debuggeeId").map(str::to_string))
        }
        // A long-poll that exceeds our own client-side timeout is treated
        // the same as a server-reported timeout, not a hard error.
        Err(adt_domain::Error::Cancelled(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn attach(transport: &Transport, debuggee_id: &str) -> Result<()> {
    transport
        .request(
            RequestSpec::new(reqwest::Method::POST, ATTACH_PATH)
                .with_query("debuggeeId", debuggee_id)
                .with_accept("application/xml"),
        )
        .await?;
    Ok(())
}

async fn seed_initial_stack(transport: &Transport, session: &AsyncMutex<adt_domain::debug::DebugSession>) {
    match fetch_stack(transport).await {
        Ok(stack) => {
            let mut s = session.lock().await;
            if let Some(frame0) = stack.first() {
                s.current_uri = Some(frame0.uri.clone());
                s.current_line = Some(frame0.line);
            }
            s.stack = stack;
        }
        Err(e) => {
            tracing::warn!(error = %e, "debug listener: initial stack fetch failed");
        }
    }
}

pub(crate) async fn fetch_stack(transport: &Transport) -> Result<Vec<StackFrame>> {
    let resp = transport
        .request(RequestSpec::get(STACK_PATH).with_accept("application/xml"))
        .await?;
    let root = decode::decode(&resp.body)?;
    let mut frames = Vec::new();
    root.find_all("stackFrame", &mut frames);
    Ok(frames
        .iter()
        .map(|el| StackFrame {
            uri: el.attr("uri").unwrap_or_default().to_string(),
            line: el.attr("line").and_then(|v| v.parse().ok()).unwrap_or(0),
            program: el.attr("program").map(str::to_string),
            include: el.attr("include").map(str::to_string),
        })
        .collect())
}
