//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use crestron_config::ConfigError;
use crestron_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the hub: {reason}")]
    #[diagnostic(
        code(crestron::connection_failed),
        help(
            "Check that the hub is powered and reachable from this machine.\n\
             Try: crestron rooms --host <hub-ip> -v"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(crestron::auth_failed),
        help(
            "The hub rejected the API token. Generate a new one in the Crestron Home\n\
             setup app (Settings > System control options > Web API) and run:\n\
             crestron config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No hub token configured for profile '{profile}'")]
    #[diagnostic(
        code(crestron::no_credentials),
        help(
            "Configure one with: crestron config init\n\
             Or set the CRESTRON_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(crestron::not_found),
        help("Run: crestron {list_command} to see available devices")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Hub responses ────────────────────────────────────────────────

    #[error("Hub error: {message}")]
    #[diagnostic(code(crestron::hub_error))]
    HubError { message: String },

    #[error("Command failed for device(s) {failed:?}: {message}")]
    #[diagnostic(
        code(crestron::partial_failure),
        help("The other targets accepted the command. The next poll will show their state.")
    )]
    PartialFailure { failed: Vec<u32>, message: String },

    #[error("'{operation}' is not supported by {target}")]
    #[diagnostic(code(crestron::unsupported))]
    Unsupported { operation: String, target: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crestron::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(crestron::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: crestron config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No hub configured")]
    #[diagnostic(
        code(crestron::no_config),
        help(
            "Create a profile with: crestron config init\n\
             Or pass --host and --token. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(crestron::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(crestron::keyring))]
    Keyring(String),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(crestron::timeout),
        help("Increase timeout with --timeout or check hub responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. }
            | Self::Unsupported { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connectivity { reason } => CliError::ConnectionFailed { reason },

            CoreError::BridgeDisconnected => CliError::ConnectionFailed {
                reason: "bridge is not connected".into(),
            },

            CoreError::Authentication { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { kind, id } => CliError::NotFound {
                list_command: format!("devices list --kind {kind}"),
                resource_type: kind,
                identifier: id.to_string(),
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::PartialCommandFailure { failed, message } => {
                CliError::PartialFailure { failed, message }
            }

            CoreError::Unsupported { operation, kind } => CliError::Unsupported {
                operation,
                target: kind,
            },

            CoreError::Vendor {
                kind,
                status,
                message,
            } => CliError::HubError {
                message: format!("{kind} (HTTP {status}): {message}"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Keyring(e) => CliError::Keyring(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
        }
    }
}
