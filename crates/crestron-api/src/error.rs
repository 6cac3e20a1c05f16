use thiserror::Error;

/// Top-level error type for the `crestron-api` crate.
///
/// Covers every failure mode of the hub's REST surface: login, session
/// expiry, transport, vendor error payloads, and malformed responses.
/// `crestron-core` maps these into the bridge's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected, or the hub answered without a session key.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The hub rejected the session key (HTTP 401 or 511).
    #[error("Session expired (HTTP {status}) -- re-authentication required")]
    SessionExpired { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Vendor ──────────────────────────────────────────────────────
    /// Non-2xx response, optionally carrying the hub's `errorSource` code.
    #[error("Crestron API error (HTTP {status}): {message}")]
    Vendor {
        status: u16,
        kind: VendorErrorKind,
        source_code: Option<i64>,
        message: String,
    },

    /// A detail endpoint answered with an empty wrapper.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: u32 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Coarse classification of a vendor error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorErrorKind {
    InvalidRequest,
    Forbidden,
    NotFound,
    Device,
    Server,
    Unknown,
}

impl VendorErrorKind {
    /// Classify a failed response by HTTP status and optional `errorSource`.
    pub fn classify(status: u16, source_code: Option<i64>) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500..=599 => Self::Server,
            _ if source_code.is_some() => Self::Device,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for VendorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InvalidRequest => "invalid request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::Device => "device error",
            Self::Server => "server error",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Returns `true` if the session key was rejected and a fresh login
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if the hub could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout { .. } | Self::Tls(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Vendor { kind, .. } => *kind == VendorErrorKind::Server,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Vendor { kind, .. } => *kind == VendorErrorKind::NotFound,
            _ => false,
        }
    }
}
