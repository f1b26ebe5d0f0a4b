//! End-to-end `Dispatcher` scenarios against a hand-rolled mock HTTP
//! server (same approach as `adt-lifecycle`'s `write_object.rs`): a real
//! `Dispatcher`/`Transport` over loopback HTTP, not a trait-mocked
//! double.

use std::collections::HashMap;
use std::sync::Arc;

use adt_domain::{Config, SafetyMode, SafetyPolicy};
use adt_dispatcher::{Dispatcher, Profile};
use adt_transport::Transport;
use serde_json::json;
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

fn dispatcher(base_url: String) -> Dispatcher {
    let transport = Arc::new(Transport::new(&config(base_url), Some("secret".into())).unwrap());
    Dispatcher::new(transport, SafetyPolicy::new(SafetyMode::Full), Profile::Focused)
}

const NODESTRUCTURE_BODY: &str = r#"<repository:nodestructure xmlns:repository="http://www.sap.com/adt/repository">
  <node name="ZFOO" uri="/sap/bc/adt/programs/programs/zfoo/source/main"/>
  <node name="ZBAR" uri="/sap/bc/adt/programs/programs/zbar/source/main"/>
</repository:nodestructure>"#;

#[tokio::test]
async fn grep_package_greps_every_member_source() {
    let base = spawn_mock(vec![
        Scripted { status: 200, body: NODESTRUCTURE_BODY },
        Scripted { status: 200, body: "REPORT zfoo.\nWRITE 'needle here'." },
        Scripted { status: 200, body: "REPORT zbar.\nWRITE 'nothing interesting'." },
    ])
    .await;
    let d = dispatcher(base);

    let env = d
        .dispatch("GrepPackage", json!({"package": "ZPKG", "pattern": "needle"}))
        .await;

    assert!(env.success);
    let hits = env.data.unwrap();
    let hits = hits["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["object"], "ZFOO");
}

#[tokio::test]
async fn search_object_returns_results_without_triggering_discovery() {
    let body = r#"<adtcore:objectReferences xmlns:adtcore="http://www.sap.com/adt/core">
  <objectReference name="ZCL_FOO" type="CLAS/OC"/>
</adtcore:objectReferences>"#;
    let base = spawn_mock(vec![Scripted { status: 200, body }]).await;
    let d = dispatcher(base);

    let env = d.dispatch("SearchObject", json!({"query": "ZCL*"})).await;

    assert!(env.success);
    let results = env.data.unwrap();
    let results = results["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "ZCL_FOO");
}

const DATA_PREVIEW_BODY: &str = r#"<dataPreview:dataPreview xmlns:dataPreview="http://www.sap.com/adt/dataPreview">
  <row><cell name="ID">1</cell><cell name="NAME">Ada</cell></row>
</dataPreview:dataPreview>"#;

#[tokio::test]
async fn query_data_expands_a_bare_identifier_and_returns_rows() {
    // POST triggers one discovery GET first, then the data preview POST.
    let base = spawn_mock(vec![
        Scripted { status: 200, body: "" },
        Scripted { status: 200, body: DATA_PREVIEW_BODY },
    ])
    .await;
    let d = dispatcher(base);

    let env = d.dispatch("QueryData", json!({"query": "ZCUSTOMERS"})).await;

    assert!(env.success);
    let rows = env.data.unwrap();
    let rows = rows["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["NAME"], "Ada");
}

#[tokio::test]
async fn write_source_requires_an_explicit_mode() {
    let base = spawn_mock(vec![]).await;
    let d = dispatcher(base);

    let env = d
        .dispatch("WriteSource", json!({"kind": "program", "name": "ZTEST", "source": "REPORT ztest."}))
        .await;

    assert!(!env.success);
    assert_eq!(env.error_kind, Some("invalid_argument"));
}
