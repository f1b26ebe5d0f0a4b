//! End-to-end debug session scenarios against a hand-rolled mock HTTP
//! server (same approach as `adt-lifecycle`'s `write_object` tests): a
//! real `DebugCoordinator`/`Transport` over loopback HTTP.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use adt_debug::DebugCoordinator;
use adt_domain::debug::DebugStatus;
use adt_domain::{Config, SafetyMode, SafetyPolicy};
use adt_transport::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct Scripted {
    status: u16,
    body: &'static str,
}

async fn spawn_mock(script: Vec<Scripted>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for resp in script {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf).await;

            let raw = format!(
                "HTTP/1.1 {} status\r\nX-CSRF-Token: tok\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                resp.status,
                resp.body.len(),
                resp.body
            );
            stream.write_all(raw.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    format!("http://{addr}")
}

fn config(base_url: String) -> Config {
    Config {
        base_url,
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

fn coordinator(base_url: String) -> DebugCoordinator {
    let transport = Arc::new(Transport::new(&config(base_url), Some("secret".into())).unwrap());
    DebugCoordinator::new(transport, SafetyPolicy::new(SafetyMode::Full))
}

const CAUGHT_BODY: &str = r#"<debugger:listener xmlns:debugger="http://www.sap.com/adt/debugger" debugger:debuggeeId="dbg-1"/>"#;
const NO_CATCH_BODY: &str = r#"<debugger:listener xmlns:debugger="http://www.sap.com/adt/debugger"/>"#;
const STACK_BODY: &str = r#"<debugger:stack xmlns:debugger="http://www.sap.com/adt/debugger">
  <stackFrame uri="/sap/bc/adt/programs/programs/ZTEST/source/main" line="12" program="ZTEST"/>
</debugger:stack>"#;

#[tokio::test]
async fn caught_debuggee_attaches_and_seeds_the_stack() {
    // listener (catch) is a GET and triggers no discovery; the attach
    // POST that follows is the first non-safe call, so it pulls the one
    // CSRF discovery fetch in front of itself. Then the stack GET.
    let script = vec![
        Scripted { status: 200, body: CAUGHT_BODY },
        Scripted { status: 200, body: "" },
        Scripted { status: 200, body: "" },
        Scripted { status: 200, body: STACK_BODY },
    ];
    let base_url = spawn_mock(script).await;
    let coord = coordinator(base_url);

    let started = coord.start_session("DEVELOPER", Some(1)).await.unwrap();
    assert_eq!(started.status, DebugStatus::Waiting);

    // Give the spawned listener task time to run the full sequence.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let session = coord.get_session().await.unwrap();
    assert_eq!(session.status, DebugStatus::Attached);
    assert_eq!(session.debuggee_id.as_deref(), Some("dbg-1"));
    assert_eq!(session.current_line, Some(12));
    assert_eq!(session.stack.len(), 1);
}

#[tokio::test]
async fn listener_timeout_leaves_session_in_timeout_status() {
    // A bare GET listener long-poll with no catch triggers no discovery
    // fetch at all: only one request is ever served.
    let script = vec![Scripted { status: 200, body: NO_CATCH_BODY }];
    let base_url = spawn_mock(script).await;
    let coord = coordinator(base_url);

    coord.start_session("DEVELOPER", Some(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let session = coord.get_session().await.unwrap();
    assert_eq!(session.status, DebugStatus::Timeout);
}

#[tokio::test]
async fn second_session_while_waiting_is_rejected_with_conflict() {
    // The second start_session call must be rejected before it ever
    // touches the transport, regardless of how far the first session's
    // listener has gotten.
    let script = vec![Scripted { status: 200, body: NO_CATCH_BODY }];
    let base_url = spawn_mock(script).await;
    let coord = coordinator(base_url);

    coord.start_session("DEVELOPER", Some(5)).await.unwrap();
    let err = coord.start_session("DEVELOPER", Some(5)).await.unwrap_err();
    assert!(matches!(err, adt_domain::Error::Conflict(_)));
}
