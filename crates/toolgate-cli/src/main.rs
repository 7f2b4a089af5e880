// crates/toolgate-cli/src/main.rs
// ============================================================================
// Module: Toolgate CLI Entry Point
// Description: Command dispatcher for the toolgate MCP server.
// Purpose: Launch the server, validate configuration, and list tool catalogues.
// Dependencies: clap, serde_json, tokio, toolgate-config, toolgate-mcp
// ============================================================================

//! ## Overview
//! `toolgate serve` runs one backend over stdio or HTTP, `toolgate config
//! validate` checks a configuration file, and `toolgate tools list` prints a
//! backend catalogue as pretty JSON. stdout carries protocol traffic in stdio
//! mode, so every diagnostic goes to stderr.
//!
//! Security posture: inputs are untrusted; HTTP binds are loopback-only unless
//! explicitly allowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use toolgate_cli::serve_policy::ALLOW_NON_LOOPBACK_ENV;
use toolgate_cli::serve_policy::BindOutcome;
use toolgate_cli::serve_policy::enforce_local_only;
use toolgate_cli::serve_policy::resolve_allow_non_loopback;
use toolgate_config::BackendKind;
use toolgate_config::ServerTransport;
use toolgate_config::ToolgateConfig;
use toolgate_mcp::McpServer;
use toolgate_mcp::tool_catalogue;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "toolgate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the toolgate MCP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Tool catalogue utilities.
    Tools {
        /// Selected tools subcommand.
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to toolgate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the configured backend.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
    /// Override the configured transport.
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,
    /// Override the HTTP bind address.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
    /// Allow binding the HTTP transport to non-loopback addresses.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a toolgate configuration file.
    Validate(ConfigValidateCommand),
}

/// Configuration for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to toolgate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Tools subcommands.
#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// Print a backend's tool catalogue as JSON.
    List(ToolsListCommand),
}

/// Configuration for `tools list`.
#[derive(Args, Debug)]
struct ToolsListCommand {
    /// Backend whose catalogue to print (defaults to the configured backend).
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
    /// Optional config file path used when `--backend` is omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Backend selector.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    /// Linear GraphQL API.
    Linear,
    /// AWS Secrets Manager.
    #[value(name = "secrets_manager", alias = "secrets-manager")]
    SecretsManager,
    /// Backstage documentation.
    Docs,
}

impl From<BackendArg> for BackendKind {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Linear => Self::Linear,
            BackendArg::SecretsManager => Self::SecretsManager,
            BackendArg::Docs => Self::Docs,
        }
    }
}

/// Transport selector.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TransportArg {
    /// JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over `POST /rpc`.
    Http,
}

impl From<TransportArg> for ServerTransport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug)]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Tools {
            command,
        } => command_tools(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = ToolgateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    apply_serve_overrides(&mut config, &command);
    config.validate().map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;

    let allow_non_loopback = resolve_allow_non_loopback(command.allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    let bind_outcome = enforce_local_only(&config, allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    warn_network_exposure(&bind_outcome)?;

    let server = McpServer::from_config(config)
        .map_err(|err| CliError::new(format!("failed to start server: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Applies command-line overrides on top of file configuration.
fn apply_serve_overrides(config: &mut ToolgateConfig, command: &ServeCommand) {
    if let Some(backend) = command.backend {
        config.backend.kind = backend.into();
    }
    if let Some(transport) = command.transport {
        config.server.transport = transport.into();
    }
    if let Some(bind) = &command.bind {
        config.server.bind = Some(bind.clone());
    }
}

/// Emits a warning banner when the HTTP transport is network-exposed.
fn warn_network_exposure(outcome: &BindOutcome) -> CliResult<()> {
    if !outcome.network_exposed {
        return Ok(());
    }
    let Some(addr) = outcome.bind_addr else {
        return Ok(());
    };
    let audit = if outcome.audit_enabled { "enabled" } else { "disabled" };
    let message = format!(
        "warning: serving on non-loopback address {addr} without authentication \
         ({ALLOW_NON_LOOPBACK_ENV} or --allow-non-loopback set); audit logging {audit}"
    );
    write_stderr_line(&message).map_err(|err| CliError::new(output_error("stderr", &err)))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = ToolgateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let message = format!(
        "config valid: backend={} transport={}",
        config.backend.kind.as_str(),
        config.server.transport.as_str()
    );
    write_stdout_line(&message).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Tools Commands
// ============================================================================

/// Dispatches tools subcommands.
fn command_tools(command: ToolsCommand) -> CliResult<ExitCode> {
    match command {
        ToolsCommand::List(command) => command_tools_list(&command),
    }
}

/// Prints the tool catalogue for a backend.
fn command_tools_list(command: &ToolsListCommand) -> CliResult<ExitCode> {
    let kind = match command.backend {
        Some(backend) => backend.into(),
        None => {
            ToolgateConfig::load(command.config.as_deref())
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?
                .backend
                .kind
        }
    };
    let rendered = serde_json::to_string_pretty(&tool_catalogue(kind))
        .map_err(|err| CliError::new(format!("failed to render catalogue: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================
