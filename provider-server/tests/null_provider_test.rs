//! Lifecycle of the built-in null provider through a server loaded from a
//! configuration file

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use provider_server::{initialize_providers, ServerConfigError, ServerFile};
use serde_json::{json, Value};
use std::io::Write;
use tfengine::{serve_with_listener, ServerConfig};
use tokio::net::TcpListener;
use tokio_test::assert_ok;

const CONFIG: &str = r#"
operation_timeout = 10

provider "local" {
  builtin = "null"
  config {
    greeting = "${upper("hi")}"
  }
}
"#;

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(content: &str) -> Self {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let server_file = assert_ok!(ServerFile::load(file.path()));
        let config = server_file.server_config(ServerConfig::new());
        let providers = assert_ok!(initialize_providers(&server_file.providers).await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_with_listener(listener, providers, config));

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json::<Value>().await.unwrap())
    }
}

fn instance_info() -> Value {
    json!({"id": "null_resource.a", "modulePath": ["root"], "resourceName": "null_resource"})
}

#[tokio::test]
async fn index_lists_null_provider() {
    let server = TestServer::start(CONFIG).await;

    let body = server
        .client
        .get(format!("{}/", server.base))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();

    assert_eq!(
        body,
        json!({
            "providers": {
                "local": {
                    "resources": [{"name": "null_resource"}],
                    "dataSources": [{"name": "null_data_source"}]
                }
            }
        })
    );
}

#[tokio::test]
async fn create_replace_destroy() {
    let server = TestServer::start(CONFIG).await;

    // plan a create
    let (status, body) = server
        .post(
            "/local/diff",
            json!({
                "instanceInfo": instance_info(),
                "currentState": {},
                "newConfig": {"triggers": {"version": "${lower(\"V1\")}"}}
            }),
        )
        .await;
    assert_eq!(status, 200);
    let diff = body["diff"].clone();
    assert_eq!(diff["attributes"]["id"]["newIsComputed"], true);
    assert_eq!(diff["attributes"]["id"]["type"], "output");
    assert_eq!(diff["attributes"]["triggers.version"]["newValue"], "v1");

    // apply it
    let (status, body) = server
        .post(
            "/local/apply",
            json!({"instanceInfo": instance_info(), "currentState": {}, "diff": diff}),
        )
        .await;
    assert_eq!(status, 200);
    let state = body["newState"].clone();
    let id = state["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(state["attributes"]["triggers.version"], "v1");

    // refresh keeps it
    let (status, body) = server
        .post(
            "/local/refresh",
            json!({"instanceInfo": instance_info(), "currentState": state}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["newState"]["id"], id.as_str());

    // same triggers: nothing to do
    let (status, body) = server
        .post(
            "/local/diff",
            json!({
                "instanceInfo": instance_info(),
                "currentState": state,
                "newConfig": {"triggers": {"version": "v1"}}
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));

    // changed trigger forces a new instance
    let (status, body) = server
        .post(
            "/local/diff",
            json!({
                "instanceInfo": instance_info(),
                "currentState": state,
                "newConfig": {"triggers": {"version": "v2"}}
            }),
        )
        .await;
    assert_eq!(status, 200);
    let diff = body["diff"].clone();
    assert_eq!(diff["attributes"]["triggers.version"]["requiresNew"], true);

    let (_, body) = server
        .post(
            "/local/apply",
            json!({"instanceInfo": instance_info(), "currentState": state, "diff": diff}),
        )
        .await;
    let replaced = body["newState"].clone();
    assert_ne!(replaced["id"], id.as_str());
    assert_eq!(replaced["attributes"]["triggers.version"], "v2");

    // destroy
    let (status, body) = server
        .post(
            "/local/apply",
            json!({
                "instanceInfo": instance_info(),
                "currentState": replaced,
                "diff": {"destroy": true}
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn unresolved_reference_is_planned_as_computed() {
    let server = TestServer::start(CONFIG).await;

    let (status, body) = server
        .post(
            "/local/diff",
            json!({
                "instanceInfo": instance_info(),
                "currentState": {"id": "abc", "attributes": {"id": "abc", "triggers.%": "0"}},
                "newConfig": {"triggers": "${aws_instance.web.tags}"}
            }),
        )
        .await;

    assert_eq!(status, 200);
    let attr = &body["diff"]["attributes"]["triggers.%"];
    assert_eq!(attr["newIsComputed"], true);
    assert_eq!(attr["requiresNew"], true);
    assert_eq!(attr["oldValue"], "0");
}

#[tokio::test]
async fn validate_reports_schema_errors() {
    let server = TestServer::start(CONFIG).await;

    let (status, body) = server
        .post(
            "/local/validate",
            json!({"resourceName": "null_resource", "config": {"triggers": ["a"], "id": "x"}}),
        )
        .await;

    assert_eq!(status, 400);
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors
        .iter()
        .any(|e| e.contains("Value for unconfigurable attribute")));
    assert!(errors
        .iter()
        .any(|e| e.contains("Incorrect attribute value type")));
}

#[tokio::test]
async fn unknown_builtin_fails_startup() {
    let file = ServerFile::parse(r#"provider "x" { builtin = "aws" }"#).unwrap();

    let err = initialize_providers(&file.providers).await.err().unwrap();

    assert!(matches!(err, ServerConfigError::UnknownBuiltin(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServerFile::load(dir.path().join("absent.hcl")).unwrap_err();
    assert!(matches!(err, ServerConfigError::Io { .. }));
}
