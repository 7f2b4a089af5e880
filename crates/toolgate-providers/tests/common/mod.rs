// crates/toolgate-providers/tests/common/mod.rs
// ============================================================================
// Module: Provider Test Helpers
// Description: Scripted HTTP servers and an in-memory secret store.
// Purpose: Exercise backends without reaching vendor services.
// Dependencies: tiny_http, toolgate-providers
// ============================================================================

//! ## Overview
//! [`MockServer`] answers a fixed script of HTTP responses on an ephemeral
//! loopback port and records each request. [`MemorySecrets`] implements the
//! secrets seam over a map so handler behavior can be asserted directly.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use async_trait::async_trait;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use toolgate_core::BackendError;
use toolgate_providers::SecretsApi;
use toolgate_providers::SecretsConnector;
use toolgate_providers::secrets::AwsSettings;
use toolgate_providers::secrets::CreateSecretRequest;
use toolgate_providers::secrets::DeletedSecret;
use toolgate_providers::secrets::DeletionMode;
use toolgate_providers::secrets::ListSecretsRequest;
use toolgate_providers::secrets::SecretDescription;
use toolgate_providers::secrets::SecretPage;
use toolgate_providers::secrets::SecretRef;
use toolgate_providers::secrets::SecretSummary;
use toolgate_providers::secrets::SecretValue;
use toolgate_providers::secrets::UpdateSecretRequest;

// ============================================================================
// SECTION: HTTP Mock
// ============================================================================

/// One scripted response.
#[derive(Clone)]
pub struct Scripted {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
}

impl Scripted {
    /// JSON response with status 200.
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }

    /// Plain response with an explicit status.
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
        }
    }

    /// Redirect to `location`.
    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            body: String::new(),
            headers: vec![("Location".to_string(), location.to_string())],
        }
    }
}

/// Request observed by the mock server.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// HTTP method.
    pub method: String,
    /// Request target (path and query).
    pub url: String,
    /// Authorization header value.
    pub authorization: Option<String>,
    /// Body text.
    pub body: String,
}

impl Recorded {
    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Loopback HTTP server replaying a response script.
pub struct MockServer {
    /// Base URL (`http://127.0.0.1:<port>`).
    pub base_url: String,
    /// Requests seen so far.
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Starts a server answering `script` in order.
    pub fn start(script: Vec<Scripted>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for scripted in script {
                let Ok(mut request) = server.recv() else {
                    return;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                seen.lock().unwrap().push(Recorded {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    body,
                });
                let mut response =
                    Response::from_string(scripted.body).with_status_code(scripted.status);
                for (name, value) in scripted.headers {
                    response = response
                        .with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
                }
                let _ = request.respond(response);
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Returns the requests seen so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

// ============================================================================
// SECTION: Secret Store Fake
// ============================================================================

/// Stored secret.
#[derive(Clone)]
struct StoredSecret {
    /// Value.
    value: String,
    /// Description.
    description: Option<String>,
    /// Version counter.
    version: u32,
}

/// In-memory secrets seam.
#[derive(Default)]
pub struct MemorySecrets {
    /// Secrets by name.
    secrets: Mutex<BTreeMap<String, StoredSecret>>,
    /// List requests observed.
    pub list_requests: Mutex<Vec<ListSecretsRequest>>,
    /// Error returned by every call when set.
    pub fail_with: Mutex<Option<BackendError>>,
}

impl MemorySecrets {
    /// Seeds one secret.
    pub fn insert(&self, name: &str, value: &str) {
        self.secrets.lock().unwrap().insert(
            name.to_string(),
            StoredSecret {
                value: value.to_string(),
                description: None,
                version: 1,
            },
        );
    }

    /// Returns the stored value for assertions.
    pub fn value(&self, name: &str) -> Option<String> {
        self.secrets.lock().unwrap().get(name).map(|secret| secret.value.clone())
    }

    /// Returns the configured failure, if any.
    fn check(&self) -> Result<(), BackendError> {
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Builds a reference for `name`.
    fn reference(name: &str, version: u32) -> SecretRef {
        SecretRef {
            name: Some(name.to_string()),
            arn: Some(format!("arn:aws:secretsmanager:us-east-1:000000000000:secret:{name}")),
            version_id: Some(format!("v{version}")),
        }
    }
}

#[async_trait]
impl SecretsApi for MemorySecrets {
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<SecretPage, BackendError> {
        self.check()?;
        let prefix = request
            .filters
            .iter()
            .find(|filter| filter.key == "name")
            .and_then(|filter| filter.values.first().cloned());
        let limit = usize::try_from(request.max_results.unwrap_or(100)).unwrap();
        let secrets = self
            .secrets
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| prefix.as_ref().is_none_or(|prefix| name.starts_with(prefix)))
            .take(limit)
            .map(|(name, secret)| SecretSummary {
                name: Some(name.clone()),
                arn: Self::reference(name, secret.version).arn,
                description: secret.description.clone(),
                last_changed_date: None,
                created_date: None,
                deleted_date: None,
                tags: Vec::new(),
            })
            .collect();
        self.list_requests.lock().unwrap().push(request);
        Ok(SecretPage {
            secrets,
            next_token: None,
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_stage: Option<&str>,
        _version_id: Option<&str>,
    ) -> Result<SecretValue, BackendError> {
        self.check()?;
        let secrets = self.secrets.lock().unwrap();
        let secret = secrets
            .get(secret_id)
            .ok_or_else(|| BackendError::NotFound(format!("Secret '{secret_id}' not found")))?;
        Ok(SecretValue {
            name: Some(secret_id.to_string()),
            arn: Self::reference(secret_id, secret.version).arn,
            version_id: Some(format!("v{}", secret.version)),
            secret_string: Some(secret.value.clone()),
            has_binary: false,
            version_stages: version_stage.map(str::to_string).into_iter().collect(),
            created_date: None,
        })
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> Result<SecretRef, BackendError> {
        self.check()?;
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(&request.name) {
            return Err(BackendError::Validation(format!(
                "Secret '{}' already exists",
                request.name
            )));
        }
        secrets.insert(
            request.name.clone(),
            StoredSecret {
                value: request.secret_string,
                description: request.description,
                version: 1,
            },
        );
        Ok(Self::reference(&request.name, 1))
    }

    async fn update_secret(&self, request: UpdateSecretRequest) -> Result<SecretRef, BackendError> {
        self.check()?;
        let mut secrets = self.secrets.lock().unwrap();
        let secret = secrets.get_mut(&request.secret_id).ok_or_else(|| {
            BackendError::NotFound(format!("Secret '{}' not found", request.secret_id))
        })?;
        secret.value = request.secret_string;
        secret.version += 1;
        if request.description.is_some() {
            secret.description = request.description;
        }
        Ok(Self::reference(&request.secret_id, secret.version))
    }

    async fn delete_secret(
        &self,
        secret_id: &str,
        mode: DeletionMode,
    ) -> Result<DeletedSecret, BackendError> {
        self.check()?;
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.remove(secret_id).is_none() {
            return Err(BackendError::NotFound(format!("Secret '{secret_id}' not found")));
        }
        let deletion_date = match mode {
            DeletionMode::Force => "1970-01-01T00:00:00Z".to_string(),
            DeletionMode::RecoveryWindow(days) => format!("in {days} days"),
        };
        Ok(DeletedSecret {
            name: Some(secret_id.to_string()),
            arn: None,
            deletion_date: Some(deletion_date),
        })
    }

    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription, BackendError> {
        self.check()?;
        let secrets = self.secrets.lock().unwrap();
        let secret = secrets
            .get(secret_id)
            .ok_or_else(|| BackendError::NotFound(format!("Secret '{secret_id}' not found")))?;
        let mut versions = BTreeMap::new();
        versions.insert(format!("v{}", secret.version), vec!["AWSCURRENT".to_string()]);
        Ok(SecretDescription {
            name: Some(secret_id.to_string()),
            arn: Self::reference(secret_id, secret.version).arn,
            description: secret.description.clone(),
            last_changed_date: None,
            last_accessed_date: None,
            next_rotation_date: None,
            rotation_enabled: Some(false),
            rotation_lambda_arn: None,
            rotation_rules: None,
            tags: Vec::new(),
            versions,
            owning_service: None,
            created_date: None,
            primary_region: Some("us-east-1".to_string()),
            deleted_date: None,
        })
    }
}

/// Connector handing out one shared [`MemorySecrets`].
pub struct MemoryConnector {
    /// Shared store.
    pub store: Arc<MemorySecrets>,
    /// Settings seen by `open`.
    pub opened: Mutex<Vec<AwsSettings>>,
}

impl MemoryConnector {
    /// Builds a connector over a fresh store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(MemorySecrets::default()),
            opened: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SecretsConnector for MemoryConnector {
    async fn open(&self, settings: &AwsSettings) -> Result<Arc<dyn SecretsApi>, BackendError> {
        self.opened.lock().unwrap().push(settings.clone());
        let store: Arc<dyn SecretsApi> = self.store.clone();
        Ok(store)
    }
}
