//! Exercises spec.md §8 property 8 against a hand-rolled single-purpose
//! mock HTTP server: a real `Transport` talking real HTTP over loopback,
//! not a trait-mocked client, so the CSRF retry-once behavior is verified
//! end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adt_domain::Config;
use adt_transport::{RequestSpec, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A scripted response: status, extra headers, body.
struct Scripted {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: &'static str,
}

/// Spawn a single-connection-at-a-time mock server that serves one
/// scripted response per accepted connection, then stops after
/// `script.len()` connections. Returns the bound address and a counter of
/// requests served.
async fn spawn_mock(script: Vec<Scripted>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = Arc::new(AtomicUsize::new(0));
    let served_clone = served.clone();

    tokio::spawn(async move {
        for resp in script {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 8192];
            // Read whatever the client sent; we don't need to parse it to
            // decide the scripted reply, only to drain the socket.
            let _ = stream.read(&mut buf).await;

            let mut raw = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                resp.status,
                status_text(resp.status),
                resp.body.len()
            );
            for (k, v) in &resp.headers {
                raw.push_str(&format!("{k}: {v}\r\n"));
            }
            raw.push_str("\r\n");
            raw.push_str(resp.body);

            stream.write_all(raw.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            served_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    (format!("http://{addr}"), served)
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        _ => "Unknown",
    }
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

#[tokio::test]
async fn csrf_expired_triggers_exactly_one_refetch_and_retry() {
    // Script: 1) discovery fetch for the initial POST, 2) the POST itself
    // returning 403 Required, 3) a refetch discovery GET, 4) the retried
    // POST succeeding.
    let script = vec![
        Scripted {
            status: 200,
            headers: vec![("X-CSRF-Token", "tok-initial".to_string())],
            body: "",
        },
        Scripted {
            status: 403,
            headers: vec![("X-CSRF-Token", "Required".to_string())],
            body: "",
        },
        Scripted {
            status: 200,
            headers: vec![("X-CSRF-Token", "tok-refreshed".to_string())],
            body: "",
        },
        Scripted {
            status: 200,
            headers: vec![],
            body: "<ok/>",
        },
    ];
    let (base_url, served) = spawn_mock(script).await;
    let transport = Transport::new(&config(base_url), Some("secret".into())).unwrap();

    let resp = transport
        .request(RequestSpec::new(reqwest::Method::POST, "/sap/bc/adt/programs/programs/ZTEST/source/main")
            .with_body(b"REPORT ztest.".to_vec(), "text/plain"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "<ok/>");
    assert_eq!(served.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn get_request_needs_no_csrf_token() {
    let script = vec![Scripted {
        status: 200,
        headers: vec![],
        body: "REPORT ztest.\nWRITE 'Hello World'.",
    }];
    let (base_url, served) = spawn_mock(script).await;
    let transport = Transport::new(&config(base_url), Some("secret".into())).unwrap();

    let resp = transport
        .request(RequestSpec::get("/sap/bc/adt/programs/programs/ZTEST/source/main"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "REPORT ztest.\nWRITE 'Hello World'.");
    assert_eq!(served.load(Ordering::SeqCst), 1);
}
