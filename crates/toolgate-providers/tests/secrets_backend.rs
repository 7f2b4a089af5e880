// crates/toolgate-providers/tests/secrets_backend.rs
// ============================================================================
// Module: Secrets Backend Tests
// Description: Secrets Manager tools over an in-memory secrets seam.
// Purpose: Verify credential resolution, masking, and handler validation.
// Dependencies: toolgate-core, toolgate-providers
// ============================================================================

//! ## Overview
//! Uses [`MemoryConnector`] in place of the AWS SDK so handlers run against a
//! deterministic store. Credentials are always passed directly so the tests
//! never depend on the ambient environment.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use toolgate_core::BackendError;
use toolgate_core::Dispatcher;
use toolgate_core::DispatcherConfig;
use toolgate_core::ResponseEnvelope;
use toolgate_core::ToolGateway;
use toolgate_providers::SecretsBackend;
use toolgate_providers::SecretsManagerConfig;
use toolgate_providers::secrets::CredentialSource;

use crate::common::MemoryConnector;

/// Direct credentials used for init.
fn direct_credentials() -> Value {
    json!({
        "region": "eu-central-1",
        "accessKeyId": "AKIATESTTESTTEST",
        "secretAccessKey": "very-secret-access-key",
    })
}

/// Builds a dispatcher over a memory connector.
fn gateway(connector: &Arc<MemoryConnector>) -> Dispatcher<SecretsBackend> {
    let backend =
        SecretsBackend::with_connector(SecretsManagerConfig::default(), Arc::clone(connector) as _);
    Dispatcher::new(backend, DispatcherConfig::default()).unwrap()
}

/// Splits an envelope into headline and parsed body.
fn sections(envelope: &ResponseEnvelope) -> (String, Value) {
    let text = envelope.text().unwrap();
    let mut parts = text.split("\n\n");
    let headline = parts.next().unwrap().to_string();
    let body = serde_json::from_str(parts.next().unwrap()).unwrap();
    (headline, body)
}

#[tokio::test]
async fn init_verifies_and_summarizes_without_key_material() {
    let connector = MemoryConnector::new();
    let gateway = gateway(&connector);

    let init = gateway.call_tool("init_aws", direct_credentials()).await;
    assert!(!init.is_error, "{:?}", init.text());
    let (headline, summary) = sections(&init);
    assert_eq!(headline, "AWS Secrets Manager initialized successfully.");
    assert_eq!(summary["region"], "eu-central-1");
    assert_eq!(summary["credentialSource"], "direct");
    assert_eq!(summary["hasSessionToken"], false);
    let text = init.text().unwrap();
    assert!(!text.contains("AKIATEST"));
    assert!(!text.contains("very-secret"));

    let opened = connector.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].source, CredentialSource::Direct);
    let probes = connector.store.list_requests.lock().unwrap();
    assert_eq!(probes[0].max_results, Some(1));
}

#[tokio::test]
async fn failed_verification_keeps_session_closed() {
    let connector = MemoryConnector::new();
    *connector.store.fail_with.lock().unwrap() =
        Some(BackendError::Auth("AWS credentials are invalid or expired.".to_string()));
    let gateway = gateway(&connector);

    let init = gateway.call_tool("init", direct_credentials()).await;
    assert_eq!(
        init.text().unwrap(),
        "Error: Failed to initialize AWS Secrets Manager: AWS credentials are invalid or expired."
    );
    let listed = gateway.call_tool("list_secrets", json!({})).await;
    assert_eq!(
        listed.text().unwrap(),
        "Error: AWS Secrets Manager not initialized; call init first"
    );
}

#[tokio::test]
async fn get_secret_masks_value() {
    let connector = MemoryConnector::new();
    connector.store.insert("prod/db", "hunter2");
    let gateway = gateway(&connector);
    gateway.call_tool("init", direct_credentials()).await;

    let secret = gateway.call_tool("get_secret", json!({"secretId": "prod/db"})).await;
    assert!(!secret.is_error);
    let text = secret.text().unwrap();
    assert!(!text.contains("hunter2"));
    assert!(text.starts_with("Secret retrieved successfully:"));
    assert!(text.ends_with("Use with caution in your application."));
    let (_, body) = sections(&secret);
    assert_eq!(
        body["secretString"],
        "[REDACTED - Actual value retrieved but hidden for security]"
    );
    assert_eq!(body["versionStages"], json!(["AWSCURRENT"]));
}

#[tokio::test]
async fn create_update_describe_delete_lifecycle() {
    let connector = MemoryConnector::new();
    let gateway = gateway(&connector);
    gateway.call_tool("init", direct_credentials()).await;

    let created = gateway
        .call_tool("create_secret", json!({"name": "app/api-key", "secretValue": "v1"}))
        .await;
    assert!(!created.is_error, "{:?}", created.text());
    assert_eq!(sections(&created).0, "Secret created successfully:");

    let duplicate = gateway
        .call_tool("create_secret", json!({"name": "app/api-key", "secretValue": "v1"}))
        .await;
    assert_eq!(duplicate.text().unwrap(), "Error: Secret 'app/api-key' already exists");

    let updated = gateway
        .call_tool("update_secret", json!({"secretId": "app/api-key", "secretValue": "v2"}))
        .await;
    let (headline, body) = sections(&updated);
    assert_eq!(headline, "Secret updated successfully:");
    assert_eq!(body["versionId"], "v2");
    assert_eq!(connector.store.value("app/api-key").as_deref(), Some("v2"));

    let described = gateway.call_tool("describe_secret", json!({"secretId": "app/api-key"})).await;
    let (headline, body) = sections(&described);
    assert_eq!(headline, "Secret details:");
    assert_eq!(body["versions"]["v2"], json!(["AWSCURRENT"]));

    let deleted = gateway.call_tool("delete_secret", json!({"secretId": "app/api-key"})).await;
    let (headline, body) = sections(&deleted);
    assert_eq!(headline, "Secret deletion initiated:");
    assert_eq!(body["deletionDate"], "in 30 days");

    let missing = gateway.call_tool("describe_secret", json!({"secretId": "app/api-key"})).await;
    assert_eq!(missing.text().unwrap(), "Error: Secret 'app/api-key' not found");
}

#[tokio::test]
async fn invalid_names_and_windows_are_rejected() {
    let connector = MemoryConnector::new();
    let gateway = gateway(&connector);
    gateway.call_tool("init", direct_credentials()).await;

    let reserved = gateway
        .call_tool("create_secret", json!({"name": "aws/internal", "secretValue": "x"}))
        .await;
    assert!(reserved.text().unwrap().contains("reserved prefix"));

    let empty = gateway
        .call_tool("create_secret", json!({"name": "ok-name", "secretValue": ""}))
        .await;
    assert_eq!(empty.text().unwrap(), "Error: Secret value is required");

    let window = gateway
        .call_tool("delete_secret", json!({"secretId": "x", "recoveryWindowDays": 3}))
        .await;
    assert!(window.text().unwrap().starts_with("Error: Invalid arguments: "));
}

#[tokio::test]
async fn list_and_search_apply_defaults() {
    let connector = MemoryConnector::new();
    connector.store.insert("prod/db", "a");
    connector.store.insert("prod/cache", "b");
    connector.store.insert("dev/db", "c");
    let gateway = gateway(&connector);
    gateway.call_tool("init", direct_credentials()).await;

    let listed = gateway.call_tool("list_secrets", json!({})).await;
    let (headline, body) = sections(&listed);
    assert_eq!(headline, "Found 3 secrets:");
    assert_eq!(body["totalCount"], 3);

    let searched = gateway.call_tool("search_secrets", json!({"namePattern": "prod/"})).await;
    let (headline, body) = sections(&searched);
    assert_eq!(headline, "Search results (2 found):");
    assert_eq!(body["secrets"].as_array().unwrap().len(), 2);

    let requests = connector.store.list_requests.lock().unwrap();
    assert_eq!(requests[1].max_results, Some(100));
    assert_eq!(requests[2].max_results, Some(50));
    assert_eq!(requests[2].filters[0].key, "name");
}
