// crates/toolgate-providers/src/linear.rs
// ============================================================================
// Module: Linear Backend
// Description: Issue-tracker tools backed by the Linear GraphQL API.
// Purpose: Expose team, issue, project, and member queries as gateway tools.
// Dependencies: toolgate-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The Linear backend sends GraphQL documents over HTTPS with the caller's
//! personal API key. The key is verified with a `viewer` query during init
//! and only a masked prefix is ever echoed back.
//!
//! Filters are always passed as GraphQL variables; caller input is never
//! spliced into query text.
//!
//! Security posture: the API key is credential material and must not reach
//! logs, summaries, or error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
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

/// Default Linear GraphQL endpoint.
pub const DEFAULT_LINEAR_API_URL: &str = "https://api.linear.app/graphql";
/// Default environment variable holding the API key.
pub const DEFAULT_LINEAR_API_KEY_ENV: &str = "LINEAR_API_KEY";
/// Default page size for issue queries.
const DEFAULT_ISSUE_PAGE: u32 = 50;
/// Default priority for new issues (Normal).
const DEFAULT_PRIORITY: u8 = 3;
/// Number of leading key characters shown in the init summary.
const VISIBLE_KEY_CHARS: usize = 10;

/// `[linear]` configuration section.
///
/// # Invariants
/// - `api_url` is an absolute `http(s)` URL.
/// - `timeout_ms` bounds each GraphQL round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,
    /// Environment variable consulted when init omits `apiKey`.
    pub api_key_env: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LINEAR_API_URL.to_string(),
            api_key_env: DEFAULT_LINEAR_API_KEY_ENV.to_string(),
            timeout_ms: 10_000,
            user_agent: "toolgate/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Linear tool identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearTool {
    /// Verify an API key and open the session.
    Init,
    /// List workspace teams.
    QueryTeams,
    /// Query issues with optional filters.
    QueryIssues,
    /// Create an issue.
    CreateIssue,
    /// Fetch one issue with comments.
    GetIssue,
    /// Update an issue.
    UpdateIssue,
    /// Search issue titles and descriptions.
    SearchIssues,
    /// List workflow states for a team.
    GetTeamStates,
    /// List projects, optionally scoped to a team.
    GetProjects,
    /// List members of a team.
    GetTeamMembers,
}

impl LinearTool {
    /// Canonical catalogue order.
    const ALL: [Self; 10] = [
        Self::Init,
        Self::QueryTeams,
        Self::QueryIssues,
        Self::CreateIssue,
        Self::GetIssue,
        Self::UpdateIssue,
        Self::SearchIssues,
        Self::GetTeamStates,
        Self::GetProjects,
        Self::GetTeamMembers,
    ];
}

impl fmt::Display for LinearTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl GatewayTool for LinearTool {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::QueryTeams => "query_teams",
            Self::QueryIssues => "query_issues",
            Self::CreateIssue => "create_issue",
            Self::GetIssue => "get_issue",
            Self::UpdateIssue => "update_issue",
            Self::SearchIssues => "search_issues",
            Self::GetTeamStates => "get_team_states",
            Self::GetProjects => "get_projects",
            Self::GetTeamMembers => "get_team_members",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        if name == "init_linear" {
            return Some(Self::Init);
        }
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

/// Returns the Linear tool catalogue.
#[must_use]
pub fn linear_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            LinearTool::Init,
            "Initialize Linear API connection with your API key",
            json!({
                "type": "object",
                "properties": {
                    "apiKey": {
                        "type": "string",
                        "description": "Linear Personal API Key (starts with lin_api_); falls back to the configured environment variable"
                    }
                }
            }),
        ),
        ToolDescriptor::new(
            LinearTool::QueryTeams,
            "Query all teams in your Linear workspace",
            json!({"type": "object", "properties": {}}),
        ),
        ToolDescriptor::new(
            LinearTool::QueryIssues,
            "Query issues with optional filtering by team and other criteria",
            json!({
                "type": "object",
                "properties": {
                    "teamId": {"type": "string", "description": "Team ID to filter issues (optional)"},
                    "first": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 250,
                        "description": "Number of issues to return (default: 50)"
                    },
                    "after": {"type": "string", "description": "Pagination cursor (optional)"},
                    "filter": {
                        "type": "object",
                        "description": "Filter criteria; string leaves match by equality (optional)",
                        "properties": {
                            "state": {
                                "type": ["object", "string"],
                                "properties": {
                                    "type": {
                                        "type": "string",
                                        "enum": ["backlog", "unstarted", "started", "completed", "canceled"]
                                    }
                                }
                            },
                            "priority": {
                                "type": "object",
                                "properties": {
                                    "gte": {"type": "number", "minimum": 0, "maximum": 4},
                                    "lte": {"type": "number", "minimum": 0, "maximum": 4}
                                }
                            },
                            "assignee": {
                                "type": "object",
                                "properties": {"id": {"type": "string"}}
                            }
                        }
                    }
                }
            }),
        ),
        ToolDescriptor::new(
            LinearTool::CreateIssue,
            "Create a new Linear issue",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "minLength": 1, "description": "Issue title"},
                    "description": {"type": "string", "description": "Issue description (supports Markdown)"},
                    "teamId": {"type": "string", "description": "Team ID where the issue should be created"},
                    "priority": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 4,
                        "default": 3,
                        "description": "Issue priority (0=No priority, 1=Urgent, 2=High, 3=Normal, 4=Low)"
                    },
                    "assigneeId": {"type": "string", "description": "User ID to assign the issue to (optional)"},
                    "stateId": {"type": "string", "description": "State ID to set the issue to (optional)"},
                    "projectId": {"type": "string", "description": "Project ID to associate the issue with (optional)"},
                    "labelIds": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Label IDs to apply (optional)"
                    },
                    "dueDate": {"type": "string", "description": "Due date in ISO format (optional)"}
                },
                "required": ["title", "teamId"]
            }),
        ),
        ToolDescriptor::new(
            LinearTool::GetIssue,
            "Get detailed information about a specific issue",
            json!({
                "type": "object",
                "properties": {
                    "issueId": {"type": "string", "description": "Issue ID or identifier (e.g., \"ENG-123\")"}
                },
                "required": ["issueId"]
            }),
        ),
        ToolDescriptor::new(
            LinearTool::UpdateIssue,
            "Update an existing issue",
            json!({
                "type": "object",
                "properties": {
                    "issueId": {"type": "string", "description": "Issue ID or identifier"},
                    "title": {"type": "string", "description": "New issue title (optional)"},
                    "description": {"type": "string", "description": "New issue description (optional)"},
                    "stateId": {"type": "string", "description": "New state ID (optional)"},
                    "assigneeId": {
                        "type": ["string", "null"],
                        "description": "New assignee ID (optional, null to unassign)"
                    },
                    "priority": {"type": "integer", "minimum": 0, "maximum": 4, "description": "New priority (0-4) (optional)"},
                    "dueDate": {"type": "string", "description": "New due date in ISO format (optional)"}
                },
                "required": ["issueId"],
                "additionalProperties": false
            }),
        ),
        ToolDescriptor::new(
            LinearTool::SearchIssues,
            "Search issues by title or description",
            json!({
                "type": "object",
                "properties": {
                    "searchTerm": {"type": "string", "minLength": 1, "description": "Search term to look for in issue titles"},
                    "teamId": {"type": "string", "description": "Team ID to limit search to (optional)"}
                },
                "required": ["searchTerm"]
            }),
        ),
        ToolDescriptor::new(
            LinearTool::GetTeamStates,
            "Get all available states for a team",
            team_schema("Team ID to get states for"),
        ),
        ToolDescriptor::new(
            LinearTool::GetProjects,
            "Get projects with optional team filtering",
            json!({
                "type": "object",
                "properties": {
                    "teamId": {"type": "string", "description": "Team ID to filter projects (optional)"}
                }
            }),
        ),
        ToolDescriptor::new(
            LinearTool::GetTeamMembers,
            "Get all members of a team",
            team_schema("Team ID to get members for"),
        ),
    ]
}

/// Schema for tools keyed by a required team id.
fn team_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {"teamId": {"type": "string", "description": description}},
        "required": ["teamId"]
    })
}

// ============================================================================
// SECTION: GraphQL Documents
// ============================================================================

/// Identity probe used to verify the API key.
const VIEWER_QUERY: &str = "query { viewer { id name email } }";

/// Team listing.
const TEAMS_QUERY: &str = "query {
  teams { nodes { id name key description createdAt updatedAt } }
}";

/// Paginated issue listing with a variable filter.
const ISSUES_QUERY: &str = "query($first: Int, $after: String, $filter: IssueFilter) {
  issues(first: $first, after: $after, filter: $filter) {
    nodes {
      id identifier title description
      state { id name type color }
      assignee { id name email avatarUrl }
      creator { id name email }
      priority createdAt updatedAt dueDate completedAt url
      project { id name state }
      labels { nodes { id name color } }
    }
    pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
  }
}";

/// Issue creation.
const CREATE_ISSUE_MUTATION: &str = "mutation CreateIssue($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue {
      id identifier title description
      state { id name type color }
      assignee { id name email }
      priority createdAt url
    }
  }
}";

/// Issue update.
const UPDATE_ISSUE_MUTATION: &str = "mutation UpdateIssue($id: String!, $input: IssueUpdateInput!) {
  issueUpdate(id: $id, input: $input) {
    success
    issue {
      id identifier title description
      state { id name type color }
      assignee { id name email }
      priority updatedAt url
    }
  }
}";

/// Single issue with comments.
const ISSUE_QUERY: &str = "query($id: String!) {
  issue(id: $id) {
    id identifier title description
    state { id name type color }
    assignee { id name email avatarUrl }
    creator { id name email }
    priority createdAt updatedAt dueDate completedAt url
    project { id name state }
    labels { nodes { id name color } }
    comments { nodes { id body user { name email } createdAt } }
  }
}";

/// Workflow states for a team.
const TEAM_STATES_QUERY: &str = "query($teamId: String!) {
  team(id: $teamId) { states { nodes { id name type color position } } }
}";

/// Project listing with owning teams.
const PROJECTS_QUERY: &str = "query {
  projects {
    nodes {
      id name description state priority startDate targetDate createdAt updatedAt url
      teams { nodes { id name key } }
    }
  }
}";

/// Team membership.
const TEAM_MEMBERS_QUERY: &str = "query($teamId: String!) {
  team(id: $teamId) { members { nodes { id name email avatarUrl active admin guest } } }
}";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Authenticated GraphQL client installed into the session.
pub struct LinearClient {
    /// Shared HTTP client.
    http: Client,
    /// GraphQL endpoint.
    api_url: String,
    /// Personal API key.
    api_key: String,
}

/// GraphQL response envelope.
#[derive(Deserialize)]
struct GraphqlResponse {
    /// Result data.
    #[serde(default)]
    data: Option<Value>,
    /// GraphQL errors, if any.
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

impl LinearClient {
    /// Executes one GraphQL document.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, BackendError> {
        let body = serde_json::to_vec(&json!({"query": query, "variables": variables}))
            .map_err(|err| BackendError::Internal(format!("graphql encode failed: {err}")))?;
        let response = self
            .http
            .post(&self.api_url)
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Auth(format!(
                "Linear API request failed: HTTP {}",
                status.as_u16()
            )));
        }
        let bytes = response.bytes().await.map_err(network_error)?;
        let payload: GraphqlResponse = serde_json::from_slice(&bytes).map_err(|err| {
            if status.is_success() {
                BackendError::Api(format!("Linear API returned invalid JSON: {err}"))
            } else {
                BackendError::Api(format!("Linear API request failed: HTTP {}", status.as_u16()))
            }
        })?;
        if let Some(errors) = payload.errors.filter(|errors| !errors.is_empty()) {
            let rendered = serde_json::to_string(&errors).unwrap_or_default();
            return Err(BackendError::Api(format!("GraphQL Error: {rendered}")));
        }
        if !status.is_success() {
            return Err(BackendError::Api(format!(
                "Linear API request failed: HTTP {}",
                status.as_u16()
            )));
        }
        payload
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| BackendError::Api("Linear API returned no data".to_string()))
    }
}

/// Classifies transport failures.
fn network_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Network("Linear API request timed out".to_string())
    } else {
        BackendError::Network(format!("Linear API request failed: {err}"))
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Linear backend adapter.
pub struct LinearBackend {
    /// Backend configuration.
    config: LinearConfig,
    /// HTTP client shared by every session client.
    http: Client,
}

impl LinearBackend {
    /// Builds the backend and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] when the HTTP client cannot be built.
    pub fn new(config: LinearConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| BackendError::Internal(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            http,
        })
    }

    /// Resolves the API key from arguments or the configured environment.
    fn resolve_api_key(&self, provided: Option<String>) -> Result<String, BackendError> {
        provided
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.config.api_key_env).ok().filter(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| {
                BackendError::Validation(format!(
                    "Linear API key is required (pass apiKey or set {})",
                    self.config.api_key_env
                ))
            })
    }
}

/// Init arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitArgs {
    /// Personal API key.
    #[serde(default)]
    api_key: Option<String>,
}

#[async_trait]
impl Backend for LinearBackend {
    type Client = LinearClient;
    type Tool = LinearTool;

    fn service_name(&self) -> &'static str {
        "Linear"
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        linear_descriptors()
    }

    async fn connect(&self, arguments: Value) -> Result<Connected<LinearClient>, BackendError> {
        let args: InitArgs = decode_arguments(arguments)?;
        let api_key = self.resolve_api_key(args.api_key)?;
        let client = LinearClient {
            http: self.http.clone(),
            api_url: self.config.api_url.clone(),
            api_key,
        };
        let data = client
            .execute(VIEWER_QUERY, json!({}))
            .await
            .map_err(|err| err.with_context("Invalid API key"))?;
        let viewer = data.get("viewer").filter(|viewer| !viewer.is_null()).ok_or_else(|| {
            BackendError::Auth("Invalid API key: No viewer data returned from Linear API".to_string())
        })?;
        let name = viewer.get("name").and_then(Value::as_str).unwrap_or("unknown");
        let email = viewer.get("email").and_then(Value::as_str).unwrap_or("unknown");
        let summary = ToolOutput::message("Linear API initialized successfully.").with_footer(
            format!("User: {name} ({email})\nAPI Key: {}", mask_api_key(&client.api_key)),
        );
        Ok(Connected {
            client,
            summary,
        })
    }

    async fn call(
        &self,
        tool: LinearTool,
        client: &LinearClient,
        arguments: Value,
    ) -> Result<ToolOutput, BackendError> {
        match tool {
            LinearTool::Init => {
                Err(BackendError::Internal("init is handled by the session".to_string()))
            }
            LinearTool::QueryTeams => {
                query_teams(client).await.map_err(|err| err.with_context("Failed to query teams"))
            }
            LinearTool::QueryIssues => query_issues(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to query issues")),
            LinearTool::CreateIssue => create_issue(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to create issue")),
            LinearTool::GetIssue => {
                get_issue(client, arguments).await.map_err(|err| err.with_context("Failed to get issue"))
            }
            LinearTool::UpdateIssue => update_issue(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to update issue")),
            LinearTool::SearchIssues => search_issues(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to search issues")),
            LinearTool::GetTeamStates => get_team_states(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to get team states")),
            LinearTool::GetProjects => get_projects(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to get projects")),
            LinearTool::GetTeamMembers => get_team_members(client, arguments)
                .await
                .map_err(|err| err.with_context("Failed to get team members")),
        }
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Issue query arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryIssuesArgs {
    /// Team scope.
    #[serde(default)]
    team_id: Option<String>,
    /// Page size.
    #[serde(default)]
    first: Option<u32>,
    /// Pagination cursor.
    #[serde(default)]
    after: Option<String>,
    /// Caller filter.
    #[serde(default)]
    filter: Option<Map<String, Value>>,
}

/// Issue creation arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIssueArgs {
    /// Title.
    title: String,
    /// Markdown description.
    #[serde(default)]
    description: Option<String>,
    /// Owning team.
    team_id: String,
    /// Priority 0..=4.
    #[serde(default)]
    priority: Option<u8>,
    /// Assignee.
    #[serde(default)]
    assignee_id: Option<String>,
    /// Initial state.
    #[serde(default)]
    state_id: Option<String>,
    /// Project.
    #[serde(default)]
    project_id: Option<String>,
    /// Labels.
    #[serde(default)]
    label_ids: Option<Vec<String>>,
    /// Due date.
    #[serde(default)]
    due_date: Option<String>,
}

/// Single-issue arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueArgs {
    /// Issue id or identifier.
    issue_id: String,
}

/// Search arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    /// Case-insensitive needle.
    search_term: String,
    /// Team scope.
    #[serde(default)]
    team_id: Option<String>,
}

/// Team-scoped arguments.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamArgs {
    /// Team id.
    team_id: String,
}

/// Optional team scope.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalTeamArgs {
    /// Team id.
    #[serde(default)]
    team_id: Option<String>,
}

/// Lists workspace teams.
async fn query_teams(client: &LinearClient) -> Result<ToolOutput, BackendError> {
    let data = client.execute(TEAMS_QUERY, json!({})).await?;
    let teams = nodes(&data, "/teams/nodes")?;
    let count = teams.len();
    Ok(ToolOutput::new(
        format!("Found {count} teams:"),
        json!({"teams": teams, "totalCount": count}),
    ))
}

/// Queries one page of issues.
async fn query_issues(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: QueryIssuesArgs = decode_arguments(arguments)?;
    let (issues, page_info) = fetch_issues(
        client,
        args.filter,
        args.team_id.as_deref(),
        args.first.unwrap_or(DEFAULT_ISSUE_PAGE),
        args.after,
    )
    .await?;
    let count = issues.len();
    Ok(ToolOutput::new(
        format!("Found {count} issues:"),
        json!({"issues": issues, "pageInfo": page_info, "totalCount": count}),
    ))
}

/// Fetches issues and their page info.
async fn fetch_issues(
    client: &LinearClient,
    filter: Option<Map<String, Value>>,
    team_id: Option<&str>,
    first: u32,
    after: Option<String>,
) -> Result<(Vec<Value>, Value), BackendError> {
    let variables = json!({
        "first": first,
        "after": after,
        "filter": build_issue_filter(filter, team_id),
    });
    let data = client.execute(ISSUES_QUERY, variables).await?;
    let issues = nodes(&data, "/issues/nodes")?;
    let page_info = data.pointer("/issues/pageInfo").cloned().unwrap_or(Value::Null);
    Ok((issues, page_info))
}

/// Creates an issue.
async fn create_issue(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: CreateIssueArgs = decode_arguments(arguments)?;
    let mut input = Map::new();
    input.insert("title".to_string(), Value::String(args.title));
    input.insert("description".to_string(), Value::String(args.description.unwrap_or_default()));
    input.insert("teamId".to_string(), Value::String(args.team_id));
    input.insert("priority".to_string(), json!(args.priority.unwrap_or(DEFAULT_PRIORITY)));
    let optional = [
        ("assigneeId", args.assignee_id),
        ("stateId", args.state_id),
        ("projectId", args.project_id),
        ("dueDate", args.due_date),
    ];
    for (key, value) in optional {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            input.insert(key.to_string(), Value::String(value));
        }
    }
    if let Some(labels) = args.label_ids.filter(|labels| !labels.is_empty()) {
        input.insert("labelIds".to_string(), json!(labels));
    }
    let data = client.execute(CREATE_ISSUE_MUTATION, json!({"input": input})).await?;
    let issue = mutation_issue(&data, "issueCreate")?;
    Ok(issue_output("Issue created successfully:", issue))
}

/// Fetches one issue.
async fn get_issue(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: IssueArgs = decode_arguments(arguments)?;
    let data = client.execute(ISSUE_QUERY, json!({"id": args.issue_id})).await?;
    match data.get("issue") {
        Some(issue) if !issue.is_null() => Ok(ToolOutput::new("Issue details:", issue.clone())),
        _ => Err(BackendError::NotFound(format!("Issue {} not found", args.issue_id))),
    }
}

/// Updates an issue with every supplied field except `issueId`.
async fn update_issue(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let Value::Object(mut input) = arguments else {
        return Err(BackendError::Validation("arguments must be an object".to_string()));
    };
    let issue_id = match input.remove("issueId") {
        Some(Value::String(id)) => id,
        _ => return Err(BackendError::Validation("issueId is required".to_string())),
    };
    if input.is_empty() {
        return Err(BackendError::Validation("no fields to update".to_string()));
    }
    let data =
        client.execute(UPDATE_ISSUE_MUTATION, json!({"id": issue_id, "input": input})).await?;
    let issue = mutation_issue(&data, "issueUpdate")?;
    Ok(issue_output("Issue updated successfully:", issue))
}

/// Searches recent issues by title or description.
async fn search_issues(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: SearchArgs = decode_arguments(arguments)?;
    let (issues, page_info) =
        fetch_issues(client, None, args.team_id.as_deref(), DEFAULT_ISSUE_PAGE, None).await?;
    let matches = filter_issues(issues, &args.search_term);
    let count = matches.len();
    Ok(ToolOutput::new(
        format!("Search results for \"{}\" ({count} found):", args.search_term),
        json!({"issues": matches, "totalCount": count, "pageInfo": page_info}),
    ))
}

/// Lists workflow states for a team.
async fn get_team_states(
    client: &LinearClient,
    arguments: Value,
) -> Result<ToolOutput, BackendError> {
    let args: TeamArgs = decode_arguments(arguments)?;
    let data = client.execute(TEAM_STATES_QUERY, json!({"teamId": args.team_id})).await?;
    require_team(&data, &args.team_id)?;
    let states = nodes(&data, "/team/states/nodes")?;
    let count = states.len();
    Ok(ToolOutput::new(
        format!("Team states ({count} found):"),
        json!({"states": states, "totalCount": count}),
    ))
}

/// Lists projects, optionally scoped to a team.
async fn get_projects(client: &LinearClient, arguments: Value) -> Result<ToolOutput, BackendError> {
    let args: OptionalTeamArgs = decode_arguments(arguments)?;
    let data = client.execute(PROJECTS_QUERY, json!({})).await?;
    let mut projects = nodes(&data, "/projects/nodes")?;
    if let Some(team_id) = args.team_id.as_deref() {
        projects.retain(|project| project_has_team(project, team_id));
    }
    let count = projects.len();
    Ok(ToolOutput::new(
        format!("Projects ({count} found):"),
        json!({"projects": projects, "totalCount": count}),
    ))
}

/// Lists members of a team.
async fn get_team_members(
    client: &LinearClient,
    arguments: Value,
) -> Result<ToolOutput, BackendError> {
    let args: TeamArgs = decode_arguments(arguments)?;
    let data = client.execute(TEAM_MEMBERS_QUERY, json!({"teamId": args.team_id})).await?;
    require_team(&data, &args.team_id)?;
    let members = nodes(&data, "/team/members/nodes")?;
    let count = members.len();
    Ok(ToolOutput::new(
        format!("Team members ({count} found):"),
        json!({"members": members, "totalCount": count}),
    ))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Comparator keys passed through unchanged when building filters.
const FILTER_COMPARATORS: &[&str] = &[
    "eq",
    "neq",
    "in",
    "nin",
    "lt",
    "lte",
    "gt",
    "gte",
    "contains",
    "notContains",
    "containsIgnoreCase",
    "startsWith",
    "endsWith",
    "null",
];

/// Builds an `IssueFilter` variable from caller input and a team scope.
///
/// String leaves become `{eq: value}`; a bare `state` string matches the
/// state type. Returns `None` when no criteria apply.
#[must_use]
pub fn build_issue_filter(filter: Option<Map<String, Value>>, team_id: Option<&str>) -> Option<Value> {
    let mut built: Map<String, Value> = filter
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let converted = filter_value(&key, value);
            (key, converted)
        })
        .collect();
    if let Some(team_id) = team_id {
        built.insert("team".to_string(), json!({"id": {"eq": team_id}}));
    }
    (!built.is_empty()).then_some(Value::Object(built))
}

/// Converts one filter entry.
fn filter_value(key: &str, value: Value) -> Value {
    if FILTER_COMPARATORS.contains(&key) {
        return value;
    }
    match value {
        Value::String(text) if key == "state" => json!({"type": {"eq": text}}),
        Value::String(text) => json!({"eq": text}),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(child, nested)| {
                    let converted = filter_value(&child, nested);
                    (child, converted)
                })
                .collect(),
        ),
        other => other,
    }
}

/// Keeps issues whose title or description contains the term, ignoring case.
fn filter_issues(issues: Vec<Value>, term: &str) -> Vec<Value> {
    let needle = term.to_lowercase();
    issues
        .into_iter()
        .filter(|issue| {
            ["title", "description"].iter().any(|field| {
                issue
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        })
        .collect()
}

/// Returns true when a project lists the team.
fn project_has_team(project: &Value, team_id: &str) -> bool {
    project
        .pointer("/teams/nodes")
        .and_then(Value::as_array)
        .is_some_and(|teams| {
            teams.iter().any(|team| team.get("id").and_then(Value::as_str) == Some(team_id))
        })
}

/// Extracts a node list at a JSON pointer.
fn nodes(data: &Value, pointer: &str) -> Result<Vec<Value>, BackendError> {
    data.pointer(pointer).and_then(Value::as_array).cloned().ok_or_else(|| {
        BackendError::Api(format!("unexpected Linear response: missing {pointer}"))
    })
}

/// Fails when a team lookup returned null.
fn require_team(data: &Value, team_id: &str) -> Result<(), BackendError> {
    match data.get("team") {
        Some(team) if !team.is_null() => Ok(()),
        _ => Err(BackendError::NotFound(format!("Team {team_id} not found"))),
    }
}

/// Extracts the issue from a mutation payload, checking `success`.
fn mutation_issue(data: &Value, field: &str) -> Result<Value, BackendError> {
    let payload = data
        .get(field)
        .ok_or_else(|| BackendError::Api(format!("unexpected Linear response: missing {field}")))?;
    if payload.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(BackendError::Api("Linear reported the mutation as unsuccessful".to_string()));
    }
    Ok(payload.get("issue").cloned().unwrap_or(Value::Null))
}

/// Renders an issue with its URL footer.
fn issue_output(headline: &str, issue: Value) -> ToolOutput {
    let url = issue.get("url").and_then(Value::as_str).map(str::to_string);
    let output = ToolOutput::new(headline, issue);
    match url {
        Some(url) => output.with_footer(format!("URL: {url}")),
        None => output,
    }
}

/// Masks an API key to its leading characters.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.chars().count() <= VISIBLE_KEY_CHARS {
        return "***".to_string();
    }
    let prefix: String = key.chars().take(VISIBLE_KEY_CHARS).collect();
    format!("{prefix}...")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
