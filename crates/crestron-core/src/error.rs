// ── Core error types ──
//
// User-facing errors from crestron-core. Consumers never see raw HTTP
// statuses or JSON failures; the `From<crestron_api::Error>` impl folds
// transport-layer errors into the bridge's taxonomy.

use crestron_api::VendorErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach Crestron hub: {reason}")]
    Connectivity { reason: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Hub request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Bridge is not connected")]
    BridgeDisconnected,

    // ── Command errors ───────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Command partially failed for device(s) {failed:?}: {message}")]
    PartialCommandFailure { failed: Vec<u32>, message: String },

    #[error("Operation not supported: {operation} on {kind}")]
    Unsupported { operation: String, kind: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {kind} {id}")]
    DeviceNotFound { kind: String, id: u32 },

    #[error("Hub reported {kind} (HTTP {status}): {message}")]
    Vendor {
        kind: VendorErrorKind,
        status: u16,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<crestron_api::Error> for CoreError {
    fn from(err: crestron_api::Error) -> Self {
        use crestron_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::Authentication { message },
            Api::SessionExpired { status } => CoreError::Authentication {
                message: format!("session key rejected (HTTP {status}) even after re-login"),
            },
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout { timeout_secs: 0 },
            Api::Transport(e) => CoreError::Connectivity {
                reason: e.to_string(),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(msg) => CoreError::Connectivity {
                reason: format!("TLS error: {msg}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Vendor {
                status,
                kind,
                source_code,
                message,
            } => CoreError::Vendor {
                kind,
                status,
                message: match source_code {
                    Some(code) => format!("{message} (errorSource {code})"),
                    None => message,
                },
            },
            Api::NotFound { resource, id } => CoreError::DeviceNotFound {
                kind: resource.to_owned(),
                id,
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
