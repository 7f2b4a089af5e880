// crates/toolgate-providers/src/secrets.rs
// ============================================================================
// Module: Secrets Manager Backend
// Description: Secret-store tools backed by AWS Secrets Manager.
// Purpose: List, read (masked), create, update, delete, and describe secrets.
// Dependencies: toolgate-core, aws-config, aws-sdk-secretsmanager, time
// ============================================================================

//! ## Overview
//! Handlers talk to a [`SecretsApi`] trait object rather than the vendor SDK
//! directly. [`AwsSecretsApi`] is the production implementation; tests supply
//! an in-memory one through a custom [`SecretsConnector`].
//!
//! Security posture: secret values are fetched but never returned. Init
//! summaries report which credential source was used, never key material.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::config::Credentials;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::error::ProvideErrorMetadata;
use aws_sdk_secretsmanager::error::SdkError;
use aws_sdk_secretsmanager::primitives::DateTime;
use aws_sdk_secretsmanager::types::Filter;
use aws_sdk_secretsmanager::types::FilterNameStringType;
use aws_sdk_secretsmanager::types::SecretListEntry;
use aws_sdk_secretsmanager::types::Tag;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use toolgate_core::Backend;
use toolgate_core::BackendError;
use toolgate_core::Connected;
use toolgate_core::GatewayTool;
use toolgate_core::ToolDescriptor;
use toolgate_core::ToolOutput;
use toolgate_core::decode_arguments;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default AWS region.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
/// Default `list_secrets` page size.
const DEFAULT_LIST_MAX: i32 = 100;
/// Default `search_secrets` page size.
const DEFAULT_SEARCH_MAX: i32 = 50;
/// Default deletion recovery window in days.
const DEFAULT_RECOVERY_DAYS: i64 = 30;
/// Minimum deletion recovery window in days.
const MIN_RECOVERY_DAYS: i64 = 7;
/// Maximum deletion recovery window in days.
const MAX_RECOVERY_DAYS: i64 = 30;
/// Maximum secret name length.
const MAX_SECRET_NAME: usize = 512;
/// Maximum secret value size in bytes.
const MAX_SECRET_VALUE_BYTES: usize = 65_536;
/// Placeholder for masked string values.
const REDACTED_STRING: &str = "[REDACTED - Actual value retrieved but hidden for security]";
/// Placeholder for masked binary values.
const REDACTED_BINARY: &str = "[REDACTED - Binary data retrieved but hidden for security]";
/// Message for unusable credentials.
const CREDENTIALS_INVALID: &str = "AWS credentials not found or invalid. Configure credentials using environment variables, an AWS profile, or access keys.";

/// `[secrets_manager]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsManagerConfig {
    /// Region used when init and the environment supply none.
    pub region: String,
    /// Default named profile.
    pub profile: Option<String>,
    /// Endpoint override for local emulators.
    pub endpoint_url: Option<String>,
}

impl Default for SecretsManagerConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_AWS_REGION.to_string(),
            profile: None,
            endpoint_url: None,
        }
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Secrets Manager tool identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsTool {
    /// Resolve credentials and open the session.
    Init,
    /// List secrets.
    ListSecrets,
    /// Fetch a secret (value masked).
    GetSecret,
    /// Create a secret.
    CreateSecret,
    /// Put a new secret value.
    UpdateSecret,
    /// Schedule or force deletion.
    DeleteSecret,
    /// Describe secret metadata.
    DescribeSecret,
    /// Search secrets by name.
    SearchSecrets,
}

impl SecretsTool {
    /// Canonical catalogue order.
    const ALL: [Self; 8] = [
        Self::Init,
        Self::ListSecrets,
        Self::GetSecret,
        Self::CreateSecret,
        Self::UpdateSecret,
        Self::DeleteSecret,
        Self::DescribeSecret,
        Self::SearchSecrets,
    ];
}

impl fmt::Display for SecretsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl GatewayTool for SecretsTool {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ListSecrets => "list_secrets",
            Self::GetSecret => "get_secret",
            Self::CreateSecret => "create_secret",
            Self::UpdateSecret => "update_secret",
            Self::DeleteSecret => "delete_secret",
            Self::DescribeSecret => "describe_secret",
            Self::SearchSecrets => "search_secrets",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        if name == "init_aws" {
            return Some(Self::Init);
        }
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

/// Returns the Secrets Manager tool catalogue.
#[must_use]
pub fn secrets_descriptors() -> Vec<ToolDescriptor> {
    let secret_id = json!({"type": "string", "minLength": 1, "description": "The name or ARN of the secret"});
    vec![
        ToolDescriptor::new(
            SecretsTool::Init,
            "Initialize AWS configuration with credentials",
            json!({
                "type": "object",
                "properties": {
                    "region": {"type": "string", "description": "AWS region (default: us-east-1)"},
                    "accessKeyId": {"type": "string", "description": "AWS access key ID"},
                    "secretAccessKey": {"type": "string", "description": "AWS secret access key"},
                    "sessionToken": {"type": "string", "description": "AWS session token"},
                    "profile": {"type": "string", "description": "AWS profile name"}
                }
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::ListSecrets,
            "List all secrets in AWS Secrets Manager with optional filtering",
            json!({
                "type": "object",
                "properties": {
                    "filters": {
                        "type": "array",
                        "description": "Filters to apply (e.g., [{Key: \"name\", Values: [\"my-secret\"]}])",
                        "items": {
                            "type": "object",
                            "properties": {
                                "Key": {"type": "string"},
                                "Values": {"type": "array", "items": {"type": "string"}}
                            },
                            "required": ["Key", "Values"]
                        }
                    },
                    "maxResults": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Maximum number of results to return (default: 100)"
                    },
                    "nextToken": {"type": "string", "description": "Pagination token"},
                    "includePlannedDeletion": {
                        "type": "boolean",
                        "description": "Include secrets scheduled for deletion"
                    }
                }
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::GetSecret,
            "Get the value of a specific secret",
            json!({
                "type": "object",
                "properties": {
                    "secretId": secret_id,
                    "versionStage": {
                        "type": "string",
                        "description": "The version stage to retrieve (default: AWSCURRENT)"
                    },
                    "versionId": {"type": "string", "description": "Specific version id (optional)"}
                },
                "required": ["secretId"]
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::CreateSecret,
            "Create a new secret in AWS Secrets Manager",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "The name of the secret"},
                    "secretValue": {"type": "string", "description": "The secret value (JSON string or plain text)"},
                    "description": {"type": "string", "description": "Description of the secret"},
                    "tags": {
                        "type": "array",
                        "description": "Tags to apply to the secret",
                        "items": {
                            "type": "object",
                            "properties": {
                                "Key": {"type": "string"},
                                "Value": {"type": "string"}
                            },
                            "required": ["Key", "Value"]
                        }
                    }
                },
                "required": ["name", "secretValue"]
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::UpdateSecret,
            "Update an existing secret",
            json!({
                "type": "object",
                "properties": {
                    "secretId": secret_id,
                    "secretValue": {"type": "string", "description": "The new secret value"},
                    "description": {"type": "string", "description": "Updated description of the secret"}
                },
                "required": ["secretId", "secretValue"]
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::DeleteSecret,
            "Delete a secret from AWS Secrets Manager",
            json!({
                "type": "object",
                "properties": {
                    "secretId": secret_id,
                    "forceDelete": {
                        "type": "boolean",
                        "description": "Force immediate deletion without recovery window"
                    },
                    "recoveryWindowDays": {
                        "type": "integer",
                        "minimum": MIN_RECOVERY_DAYS,
                        "maximum": MAX_RECOVERY_DAYS,
                        "description": "Number of days for recovery window (default: 30)"
                    }
                },
                "required": ["secretId"]
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::DescribeSecret,
            "Get detailed information about a secret without retrieving its value",
            json!({
                "type": "object",
                "properties": {"secretId": secret_id},
                "required": ["secretId"]
            }),
        ),
        ToolDescriptor::new(
            SecretsTool::SearchSecrets,
            "Search for secrets by name pattern",
            json!({
                "type": "object",
                "properties": {
                    "namePattern": {"type": "string", "minLength": 1, "description": "Name prefix to search for"},
                    "maxResults": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Maximum number of results to return (default: 50)"
                    }
                },
                "required": ["namePattern"]
            }),
        ),
    ]
}

// ============================================================================
// SECTION: Domain Types
// ============================================================================

/// List filter, using the service's `Key`/`Values` wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFilter {
    /// Filter key (`name`, `description`, `tag-key`, ...).
    #[serde(rename = "Key")]
    pub key: String,
    /// Filter values.
    #[serde(rename = "Values")]
    pub values: Vec<String>,
}

/// Secret tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTag {
    /// Tag key.
    #[serde(rename = "Key")]
    pub key: String,
    /// Tag value.
    #[serde(rename = "Value")]
    pub value: String,
}

/// `ListSecrets` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsRequest {
    /// Filters.
    pub filters: Vec<SecretFilter>,
    /// Page size.
    pub max_results: Option<i32>,
    /// Pagination token.
    pub next_token: Option<String>,
    /// Include secrets pending deletion.
    pub include_planned_deletion: bool,
}

/// Secret list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSummary {
    /// Secret name.
    pub name: Option<String>,
    /// Secret ARN.
    pub arn: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Last change, RFC 3339.
    pub last_changed_date: Option<String>,
    /// Creation, RFC 3339.
    pub created_date: Option<String>,
    /// Scheduled deletion, RFC 3339.
    pub deleted_date: Option<String>,
    /// Tags.
    pub tags: Vec<SecretTag>,
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPage {
    /// Entries.
    pub secrets: Vec<SecretSummary>,
    /// Token for the next page.
    pub next_token: Option<String>,
}

/// Retrieved secret value.
///
/// Holds the plaintext only long enough to report its presence.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    /// Secret name.
    pub name: Option<String>,
    /// Secret ARN.
    pub arn: Option<String>,
    /// Version id.
    pub version_id: Option<String>,
    /// String payload.
    pub secret_string: Option<String>,
    /// True when a binary payload was returned.
    pub has_binary: bool,
    /// Version stages.
    pub version_stages: Vec<String>,
    /// Creation, RFC 3339.
    pub created_date: Option<String>,
}

/// Secret creation request.
#[derive(Clone, PartialEq, Eq)]
pub struct CreateSecretRequest {
    /// Secret name.
    pub name: String,
    /// Secret value.
    pub secret_string: String,
    /// Description.
    pub description: Option<String>,
    /// Tags.
    pub tags: Vec<SecretTag>,
}

/// Secret value update request.
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateSecretRequest {
    /// Secret name or ARN.
    pub secret_id: String,
    /// New value.
    pub secret_string: String,
    /// New description.
    pub description: Option<String>,
}

/// Reference to a created or updated version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Secret name.
    pub name: Option<String>,
    /// Secret ARN.
    pub arn: Option<String>,
    /// Version id.
    pub version_id: Option<String>,
}

/// Deletion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// Delete immediately without recovery.
    Force,
    /// Schedule deletion after a recovery window in days.
    RecoveryWindow(i64),
}

/// Deletion result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSecret {
    /// Secret name.
    pub name: Option<String>,
    /// Secret ARN.
    pub arn: Option<String>,
    /// Effective deletion date, RFC 3339.
    pub deletion_date: Option<String>,
}

/// Rotation schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRules {
    /// Rotation period in days.
    pub automatically_after_days: Option<i64>,
    /// Rotation window duration.
    pub duration: Option<String>,
    /// Cron or rate expression.
    pub schedule_expression: Option<String>,
}

/// Secret metadata without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretDescription {
    /// Secret name.
    pub name: Option<String>,
    /// Secret ARN.
    pub arn: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Last change, RFC 3339.
    pub last_changed_date: Option<String>,
    /// Last access, RFC 3339.
    pub last_accessed_date: Option<String>,
    /// Next rotation, RFC 3339.
    pub next_rotation_date: Option<String>,
    /// Whether rotation is enabled.
    pub rotation_enabled: Option<bool>,
    /// Rotation function ARN.
    #[serde(rename = "rotationLambdaARN")]
    pub rotation_lambda_arn: Option<String>,
    /// Rotation schedule.
    pub rotation_rules: Option<RotationRules>,
    /// Tags.
    pub tags: Vec<SecretTag>,
    /// Version ids mapped to their stages.
    pub versions: BTreeMap<String, Vec<String>>,
    /// Owning service, if managed.
    pub owning_service: Option<String>,
    /// Creation, RFC 3339.
    pub created_date: Option<String>,
    /// Primary region for replicated secrets.
    pub primary_region: Option<String>,
    /// Scheduled deletion, RFC 3339.
    pub deleted_date: Option<String>,
}

// ============================================================================
// SECTION: Service Seam
// ============================================================================

/// Secret-store operations used by the handlers.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    /// Lists secrets.
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<SecretPage, BackendError>;

    /// Reads a secret value.
    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_stage: Option<&str>,
        version_id: Option<&str>,
    ) -> Result<SecretValue, BackendError>;

    /// Creates a secret.
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<SecretRef, BackendError>;

    /// Puts a new secret value.
    async fn update_secret(&self, request: UpdateSecretRequest) -> Result<SecretRef, BackendError>;

    /// Deletes or schedules deletion of a secret.
    async fn delete_secret(
        &self,
        secret_id: &str,
        mode: DeletionMode,
    ) -> Result<DeletedSecret, BackendError>;

    /// Describes secret metadata.
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription, BackendError>;
}

/// Where credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Access keys passed to init.
    Direct,
    /// Named profile.
    Profile,
    /// `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` in the environment.
    Environment,
}

impl CredentialSource {
    /// Returns the summary label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Profile => "profile",
            Self::Environment => "environment",
        }
    }
}

/// Resolved connection settings.
///
/// Holds credential material; never rendered.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsSettings {
    /// Region.
    pub region: String,
    /// Named profile.
    pub profile: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Session token.
    pub session_token: Option<String>,
    /// Endpoint override.
    pub endpoint_url: Option<String>,
    /// Chosen credential source.
    pub source: CredentialSource,
}

impl AwsSettings {
    /// Returns the redacted summary shown to callers.
    #[must_use]
    pub fn summary(&self) -> Value {
        json!({
            "region": self.region,
            "profile": self.profile.as_deref().unwrap_or("default"),
            "hasAccessKeyId": self.access_key_id.is_some(),
            "hasSecretAccessKey": self.secret_access_key.is_some(),
            "hasSessionToken": self.session_token.is_some(),
            "credentialSource": self.source.as_str(),
        })
    }
}

/// Builds a [`SecretsApi`] from resolved settings.
#[async_trait]
pub trait SecretsConnector: Send + Sync + 'static {
    /// Opens a client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the client cannot be configured.
    async fn open(&self, settings: &AwsSettings) -> Result<Arc<dyn SecretsApi>, BackendError>;
}

/// Connector producing SDK-backed clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsSecretsConnector;

#[async_trait]
impl SecretsConnector for AwsSecretsConnector {
    async fn open(&self, settings: &AwsSettings) -> Result<Arc<dyn SecretsApi>, BackendError> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));
        match settings.source {
            CredentialSource::Direct => {
                if let (Some(id), Some(secret)) =
                    (settings.access_key_id.clone(), settings.secret_access_key.clone())
                {
                    loader = loader.credentials_provider(Credentials::new(
                        id,
                        secret,
                        settings.session_token.clone(),
                        None,
                        "toolgate-init",
                    ));
                }
            }
            CredentialSource::Profile => {
                if let Some(profile) = settings.profile.clone() {
                    loader = loader.profile_name(profile);
                }
            }
            CredentialSource::Environment => {}
        }
        if let Some(endpoint) = settings.endpoint_url.clone() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        Ok(Arc::new(AwsSecretsApi {
            client: Client::new(&shared_config),
        }))
    }
}

// ============================================================================
// SECTION: AWS Implementation
// ============================================================================

/// SDK-backed secrets client.
pub struct AwsSecretsApi {
    /// Underlying SDK client.
    client: Client,
}

#[async_trait]
impl SecretsApi for AwsSecretsApi {
    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<SecretPage, BackendError> {
        let filters: Vec<Filter> = request
            .filters
            .into_iter()
            .map(|filter| {
                Filter::builder()
                    .key(FilterNameStringType::from(filter.key.as_str()))
                    .set_values(Some(filter.values))
                    .build()
            })
            .collect();
        let output = self
            .client
            .list_secrets()
            .set_filters((!filters.is_empty()).then_some(filters))
            .set_max_results(request.max_results)
            .set_next_token(request.next_token)
            .include_planned_deletion(request.include_planned_deletion)
            .send()
            .await
            .map_err(|err| sdk_error("list secrets", None, err))?;
        Ok(SecretPage {
            secrets: output.secret_list().iter().map(summary_from_entry).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_stage: Option<&str>,
        version_id: Option<&str>,
    ) -> Result<SecretValue, BackendError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .set_version_stage(version_stage.map(str::to_string))
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await
            .map_err(|err| sdk_error("get secret value", Some(secret_id), err))?;
        Ok(SecretValue {
            name: output.name().map(str::to_string),
            arn: output.arn().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
            secret_string: output.secret_string().map(str::to_string),
            has_binary: output.secret_binary().is_some(),
            version_stages: output.version_stages().to_vec(),
            created_date: rfc3339(output.created_date()),
        })
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> Result<SecretRef, BackendError> {
        let tags: Vec<Tag> = request
            .tags
            .into_iter()
            .map(|tag| Tag::builder().key(tag.key).value(tag.value).build())
            .collect();
        let output = self
            .client
            .create_secret()
            .name(&request.name)
            .secret_string(request.secret_string)
            .set_description(request.description)
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await
            .map_err(|err| sdk_error("create secret", Some(&request.name), err))?;
        Ok(SecretRef {
            name: output.name().map(str::to_string),
            arn: output.arn().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn update_secret(&self, request: UpdateSecretRequest) -> Result<SecretRef, BackendError> {
        let output = self
            .client
            .update_secret()
            .secret_id(&request.secret_id)
            .secret_string(request.secret_string)
            .set_description(request.description)
            .send()
            .await
            .map_err(|err| sdk_error("update secret", Some(&request.secret_id), err))?;
        Ok(SecretRef {
            name: output.name().map(str::to_string),
            arn: output.arn().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn delete_secret(
        &self,
        secret_id: &str,
        mode: DeletionMode,
    ) -> Result<DeletedSecret, BackendError> {
        let request = self.client.delete_secret().secret_id(secret_id);
        let request = match mode {
            DeletionMode::Force => request.force_delete_without_recovery(true),
            DeletionMode::RecoveryWindow(days) => request.recovery_window_in_days(days),
        };
        let output =
            request.send().await.map_err(|err| sdk_error("delete secret", Some(secret_id), err))?;
        Ok(DeletedSecret {
            name: output.name().map(str::to_string),
            arn: output.arn().map(str::to_string),
            deletion_date: rfc3339(output.deletion_date()),
        })
    }

    async fn describe_secret(&self, secret_id: &str) -> Result<SecretDescription, BackendError> {
        let output = self
            .client
            .describe_secret()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| sdk_error("describe secret", Some(secret_id), err))?;
        Ok(SecretDescription {
            name: output.name().map(str::to_string),
            arn: output.arn().map(str::to_string),
            description: output.description().map(str::to_string),
            last_changed_date: rfc3339(output.last_changed_date()),
            last_accessed_date: rfc3339(output.last_accessed_date()),
            next_rotation_date: rfc3339(output.next_rotation_date()),
            rotation_enabled: output.rotation_enabled(),
            rotation_lambda_arn: output.rotation_lambda_arn().map(str::to_string),
            rotation_rules: output.rotation_rules().map(|rules| RotationRules {
                automatically_after_days: rules.automatically_after_days(),
                duration: rules.duration().map(str::to_string),
                schedule_expression: rules.schedule_expression().map(str::to_string),
            }),
            tags: output.tags().iter().map(tag_from_sdk).collect(),
            versions: output
                .version_ids_to_stages()
                .map(|versions| {
                    versions.iter().map(|(id, stages)| (id.clone(), stages.clone())).collect()
                })
                .unwrap_or_default(),
            owning_service: output.owning_service().map(str::to_string),
            created_date: rfc3339(output.created_date()),
            primary_region: output.primary_region().map(str::to_string),
            deleted_date: rfc3339(output.deleted_date()),
        })
    }
}

/// Converts an SDK list entry.
fn summary_from_entry(entry: &SecretListEntry) -> SecretSummary {
    SecretSummary {
        name: entry.name().map(str::to_string),
        arn: entry.arn().map(str::to_string),
        description: entry.description().map(str::to_string),
        last_changed_date: rfc3339(entry.last_changed_date()),
        created_date: rfc3339(entry.created_date()),
        deleted_date: rfc3339(entry.deleted_date()),
        tags: entry.tags().iter().map(tag_from_sdk).collect(),
    }
}

/// Converts an SDK tag.
fn tag_from_sdk(tag: &Tag) -> SecretTag {
    SecretTag {
        key: tag.key().unwrap_or_default().to_string(),
        value: tag.value().unwrap_or_default().to_string(),
    }
}

/// Formats an SDK timestamp as RFC 3339.
fn rfc3339(value: Option<&DateTime>) -> Option<String> {
    value.and_then(|value| format_epoch_seconds(value.secs()))
}

/// Formats epoch seconds as RFC 3339.
#[must_use]
pub fn format_epoch_seconds(secs: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(secs).ok()?.format(&Rfc3339).ok()
}

/// Maps an SDK failure onto the backend error taxonomy.
fn sdk_error<E, R>(operation: &str, subject: Option<&str>, err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => {
            return BackendError::Network(format!("Failed to {operation}: request timed out"));
        }
        SdkError::DispatchFailure(_) | SdkError::ConstructionFailure(_) => {
            let detail = DisplayErrorContext(&err).to_string();
            if detail.to_ascii_lowercase().contains("credential") {
                return BackendError::Auth(CREDENTIALS_INVALID.to_string());
            }
            return BackendError::Network(format!("Failed to {operation}: {detail}"));
        }
        _ => {}
    }
    let message = err.message().unwrap_or("unknown error").to_string();
    classify_aws_error(operation, subject, err.code(), &message)
}

/// Classifies a service error code.
#[must_use]
pub fn classify_aws_error(
    operation: &str,
    subject: Option<&str>,
    code: Option<&str>,
    message: &str,
) -> BackendError {
    let subject = subject.unwrap_or("secret");
    match code.unwrap_or_default() {
        "UnrecognizedClientException"
        | "InvalidClientTokenId"
        | "InvalidSignatureException"
        | "SignatureDoesNotMatch"
        | "MissingAuthenticationToken"
        | "CredentialsProviderError" => BackendError::Auth(CREDENTIALS_INVALID.to_string()),
        "ExpiredTokenException" | "InvalidTokenException" => BackendError::Auth(
            "AWS credentials are invalid or expired. Refresh your credentials.".to_string(),
        ),
        "AccessDeniedException" | "AccessDenied" => BackendError::Auth(
            "You do not have permission to perform this action. Check your IAM permissions."
                .to_string(),
        ),
        "ResourceNotFoundException" => BackendError::NotFound(format!("Secret '{subject}' not found")),
        "ResourceExistsException" => {
            BackendError::Validation(format!("Secret '{subject}' already exists"))
        }
        "InvalidParameterException" | "InvalidRequestException" | "ValidationException" => {
            BackendError::Validation(format!("Failed to {operation}: {message}"))
        }
        "DecryptionFailure" | "DecryptionFailureException" => BackendError::Api(
            "Secrets Manager cannot decrypt the protected secret text.".to_string(),
        ),
        _ => BackendError::Api(format!("Failed to {operation}: {message}")),
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Secrets Manager backend adapter.
pub struct SecretsBackend {
    /// Backend configuration.
    config: SecretsManagerConfig,
    /// Client factory.
    connector: Arc<dyn SecretsConnector>,
}

impl SecretsBackend {
    /// Builds a backend using the AWS SDK.
    #[must_use]
    pub fn new(config: SecretsManagerConfig) -> Self {
        Self::with_connector(config, Arc::new(AwsSecretsConnector))
    }

    /// Builds a backend with a custom client factory.
    #[must_use]
    pub fn with_connector(config: SecretsManagerConfig, connector: Arc<dyn SecretsConnector>) -> Self {
        Self {
            config,
            connector,
        }
    }

    /// Resolves connection settings from init arguments, environment, and config.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when no credential source exists.
    pub fn resolve_settings(&self, args: InitArgs) -> Result<AwsSettings, BackendError> {
        self.resolve_settings_with(args, |name| std::env::var(name).ok())
    }

    /// Resolves settings with an injectable environment lookup.
    fn resolve_settings_with(
        &self,
        args: InitArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AwsSettings, BackendError> {
        let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        let region = non_empty(args.region)
            .or_else(|| non_empty(env("AWS_REGION")))
            .unwrap_or_else(|| self.config.region.clone());
        let profile = non_empty(args.profile)
            .or_else(|| self.config.profile.clone())
            .or_else(|| non_empty(env("AWS_PROFILE")));
        let direct_id = non_empty(args.access_key_id);
        let direct_secret = non_empty(args.secret_access_key);
        let (source, access_key_id, secret_access_key, session_token) =
            if direct_id.is_some() && direct_secret.is_some() {
                (CredentialSource::Direct, direct_id, direct_secret, non_empty(args.session_token))
            } else if profile.is_some() {
                (CredentialSource::Profile, None, None, None)
            } else if non_empty(env("AWS_ACCESS_KEY_ID")).is_some()
                && non_empty(env("AWS_SECRET_ACCESS_KEY")).is_some()
            {
                (CredentialSource::Environment, None, None, None)
            } else {
                return Err(BackendError::Validation(
                    "AWS Configuration invalid: No AWS credentials found. Provide access keys, a profile, or configure environment variables".to_string(),
                ));
            };
        Ok(AwsSettings {
            region,
            profile,
            access_key_id,
            secret_access_key,
            session_token,
            endpoint_url: self.config.endpoint_url.clone(),
            source,
        })
    }
}

/// Init arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitArgs {
    /// Region override.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Session token.
    #[serde(default)]
    pub session_token: Option<String>,
    /// Named profile.
    #[serde(default)]
    pub profile: Option<String>,
}

#[async_trait]
impl Backend for SecretsBackend {
    type Client = Arc<dyn SecretsApi>;
    type Tool = SecretsTool;

    fn service_name(&self) -> &'static str {
        "AWS Secrets Manager"
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        secrets_descriptors()
    }

    async fn connect(
        &self,
        arguments: Value,
    ) -> Result<Connected<Arc<dyn SecretsApi>>, BackendError> {
        let args: InitArgs = decode_arguments(arguments)?;
        let settings = self.resolve_settings(args)?;
        let client = self.connector.open(&settings).await?;
        client
            .list_secrets(ListSecretsRequest {
                max_results: Some(1),
                ..ListSecretsRequest::default()
            })
            .await?;
        Ok(Connected {
            client,
            summary: ToolOutput::new(
                "AWS Secrets Manager initialized successfully.",
                settings.summary(),
            ),
        })
    }

    async fn call(
        &self,
        tool: SecretsTool,
        client: &Arc<dyn SecretsApi>,
        arguments: Value,
    ) -> Result<ToolOutput, BackendError> {
        let api = client.as_ref();
        match tool {
            SecretsTool::Init => {
                Err(BackendError::Internal("init is handled by the session".to_string()))
            }
            SecretsTool::ListSecrets => list_secrets(api, arguments).await,
            SecretsTool::GetSecret => get_secret(api, arguments).await,
            SecretsTool::CreateSecret => create_secret(api, arguments).await,
            SecretsTool::UpdateSecret => update_secret(api, arguments).await,
            SecretsTool::DeleteSecret => delete_secret(api, arguments).await,
            SecretsTool::DescribeSecret => describe_secret(api, arguments).await,
            SecretsTool::SearchSecrets => search_secrets(api, arguments).await,
        }
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// List arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    /// Filters.
    #[serde(default)]
    filters: Vec<SecretFilter>,
    /// Page size.
    #[serde(default)]
    max_results: Option<i32>,
    /// Pagination token.
    #[serde(default)]
    next_token: Option<String>,
    /// Include pending deletions.
    #[serde(default)]
    include_planned_deletion: bool,
}

/// Get arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetArgs {
    /// Secret name or ARN.
    secret_id: String,
    /// Version stage.
    #[serde(default)]
    version_stage: Option<String>,
    /// Version id.
    #[serde(default)]
    version_id: Option<String>,
}

/// Create arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    /// Secret name.
    name: String,
    /// Secret value.
    secret_value: String,
    /// Description.
    #[serde(default)]
    description: Option<String>,
    /// Tags.
    #[serde(default)]
    tags: Vec<SecretTag>,
}

/// Update arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    /// Secret name or ARN.
    secret_id: String,
    /// New value.
    secret_value: String,
    /// New description.
    #[serde(default)]
    description: Option<String>,
}

/// Delete arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteArgs {
    /// Secret name or ARN.
    secret_id: String,
    /// Skip the recovery window.
    #[serde(default)]
    force_delete: bool,
    /// Recovery window in days.
    #[serde(default)]
    recovery_window_days: Option<i64>,
}

/// Single-secret arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretIdArgs {
    /// Secret name or ARN.
    secret_id: String,
}

/// Search arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    /// Name prefix.
    name_pattern: String,
    /// Page size.
    #[serde(default)]
    max_results: Option<i32>,
}

/// Lists secrets.
async fn list_secrets(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: ListArgs = decode_arguments(arguments)?;
    let page = api
        .list_secrets(ListSecretsRequest {
            filters: args.filters,
            max_results: Some(args.max_results.unwrap_or(DEFAULT_LIST_MAX)),
            next_token: args.next_token,
            include_planned_deletion: args.include_planned_deletion,
        })
        .await?;
    let count = page.secrets.len();
    Ok(ToolOutput::new(format!("Found {count} secrets:"), page_body(page)))
}

/// Reads a secret and masks its value.
async fn get_secret(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: GetArgs = decode_arguments(arguments)?;
    let version_stage = if args.version_id.is_some() {
        args.version_stage
    } else {
        Some(args.version_stage.unwrap_or_else(|| "AWSCURRENT".to_string()))
    };
    let value = api
        .get_secret_value(&args.secret_id, version_stage.as_deref(), args.version_id.as_deref())
        .await?;
    Ok(ToolOutput::new("Secret retrieved successfully:", masked_value(&value)).with_footer(
        "Note: Actual secret value has been masked for security. Use with caution in your application.",
    ))
}

/// Creates a secret.
async fn create_secret(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: CreateArgs = decode_arguments(arguments)?;
    validate_secret_name(&args.name)?;
    validate_secret_value(&args.secret_value)?;
    let created = api
        .create_secret(CreateSecretRequest {
            name: args.name,
            secret_string: args.secret_value,
            description: args.description,
            tags: args.tags,
        })
        .await?;
    Ok(ToolOutput::new("Secret created successfully:", to_body(&created)?))
}

/// Puts a new secret value.
async fn update_secret(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: UpdateArgs = decode_arguments(arguments)?;
    validate_secret_value(&args.secret_value)?;
    let updated = api
        .update_secret(UpdateSecretRequest {
            secret_id: args.secret_id,
            secret_string: args.secret_value,
            description: args.description,
        })
        .await?;
    Ok(ToolOutput::new("Secret updated successfully:", to_body(&updated)?))
}

/// Deletes or schedules deletion of a secret.
async fn delete_secret(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: DeleteArgs = decode_arguments(arguments)?;
    let mode = deletion_mode(args.force_delete, args.recovery_window_days)?;
    let deleted = api.delete_secret(&args.secret_id, mode).await?;
    Ok(ToolOutput::new("Secret deletion initiated:", to_body(&deleted)?))
}

/// Describes secret metadata.
async fn describe_secret(
    api: &dyn SecretsApi,
    arguments: Value,
) -> Result<ToolOutput, BackendError> {
    let args: SecretIdArgs = decode_arguments(arguments)?;
    let description = api.describe_secret(&args.secret_id).await?;
    Ok(ToolOutput::new("Secret details:", to_body(&description)?))
}

/// Searches secrets by name.
async fn search_secrets(api: &dyn SecretsApi, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: SearchArgs = decode_arguments(arguments)?;
    let page = api
        .list_secrets(ListSecretsRequest {
            filters: vec![SecretFilter {
                key: "name".to_string(),
                values: vec![args.name_pattern],
            }],
            max_results: Some(args.max_results.unwrap_or(DEFAULT_SEARCH_MAX)),
            ..ListSecretsRequest::default()
        })
        .await?;
    let count = page.secrets.len();
    Ok(ToolOutput::new(format!("Search results ({count} found):"), page_body(page)))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a list page.
fn page_body(page: SecretPage) -> Value {
    let count = page.secrets.len();
    json!({
        "secrets": page.secrets,
        "nextToken": page.next_token,
        "totalCount": count,
    })
}

/// Serializes a response body.
fn to_body<T: Serialize>(value: &T) -> Result<Value, BackendError> {
    serde_json::to_value(value)
        .map_err(|err| BackendError::Internal(format!("response encode failed: {err}")))
}

/// Renders a secret value with its payload masked.
#[must_use]
pub fn masked_value(value: &SecretValue) -> Value {
    json!({
        "name": value.name,
        "arn": value.arn,
        "versionId": value.version_id,
        "secretString": value.secret_string.as_ref().map(|_| REDACTED_STRING),
        "secretBinary": value.has_binary.then_some(REDACTED_BINARY),
        "versionStages": value.version_stages,
        "createdDate": value.created_date,
    })
}

/// Resolves the deletion mode.
///
/// # Errors
///
/// Returns [`BackendError::Validation`] for a window outside 7..=30 days.
pub fn deletion_mode(force: bool, window: Option<i64>) -> Result<DeletionMode, BackendError> {
    if force {
        return Ok(DeletionMode::Force);
    }
    let days = window.unwrap_or(DEFAULT_RECOVERY_DAYS);
    if !(MIN_RECOVERY_DAYS ..= MAX_RECOVERY_DAYS).contains(&days) {
        return Err(BackendError::Validation(format!(
            "recoveryWindowDays must be between {MIN_RECOVERY_DAYS} and {MAX_RECOVERY_DAYS}"
        )));
    }
    Ok(DeletionMode::RecoveryWindow(days))
}

/// Checks a secret name against service naming rules.
///
/// # Errors
///
/// Returns [`BackendError::Validation`] listing every violated rule.
pub fn validate_secret_name(name: &str) -> Result<(), BackendError> {
    let mut problems = Vec::new();
    if name.is_empty() || name.len() > MAX_SECRET_NAME {
        problems.push(format!("Secret name must be between 1 and {MAX_SECRET_NAME} characters"));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || "_/+=.@-".contains(ch)) {
        problems.push(
            "Secret name can only contain alphanumeric characters and _/+=.@-".to_string(),
        );
    }
    if name.starts_with("aws/") {
        problems.push("Secret name cannot start with \"aws/\" (reserved prefix)".to_string());
    }
    if name.ends_with('/') {
        problems.push("Secret name cannot end with a forward slash".to_string());
    }
    if problems.is_empty() { Ok(()) } else { Err(BackendError::Validation(problems.join("; "))) }
}

/// Checks a secret value is present and within size limits.
fn validate_secret_value(value: &str) -> Result<(), BackendError> {
    if value.is_empty() {
        return Err(BackendError::Validation("Secret value is required".to_string()));
    }
    if value.len() > MAX_SECRET_VALUE_BYTES {
        return Err(BackendError::Validation(format!(
            "Secret value cannot exceed {MAX_SECRET_VALUE_BYTES} bytes"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
