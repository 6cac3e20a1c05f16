// ── Runtime bridge configuration ──
//
// Describes *how* to reach one hub and what to reconcile. Carries the
// credential and tuning knobs but never touches disk: the CLI (or any
// other host) builds a `BridgeConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::model::CategorySet;

/// Polls faster than this eat into the hub's idle-session budget.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_ROOM_SYNC_EVERY: u32 = 10;
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(480);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Hubs ship with a self-signed certificate.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one hub.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Hub URL (e.g. `https://192.168.1.20`).
    pub url: Url,
    /// Long-lived token exchanged for session keys at login.
    pub auth_token: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Categories to fetch and surface.
    pub categories: CategorySet,
    /// Re-fetch rooms every N cycles.
    pub room_sync_every: u32,
    /// Proactively re-login once the session key is this old.
    pub session_max_age: Duration,
    /// Name/subtype patterns (`%` wildcards) for devices to keep hidden.
    pub ignored_devices: Vec<String>,
}

impl BridgeConfig {
    pub fn new(url: Url, auth_token: SecretString) -> Self {
        Self {
            url,
            auth_token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            categories: CategorySet::all(),
            room_sync_every: DEFAULT_ROOM_SYNC_EVERY,
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            ignored_devices: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(CoreError::config(format!(
                "poll interval must be at least {}s (got {}s)",
                MIN_POLL_INTERVAL.as_secs(),
                self.poll_interval.as_secs()
            )));
        }
        if self.session_max_age.is_zero()
            || self.session_max_age >= crestron_api::session::IDLE_TIMEOUT
        {
            return Err(CoreError::config(format!(
                "session max age must be between 1s and {}s",
                crestron_api::session::IDLE_TIMEOUT.as_secs() - 1
            )));
        }
        if self.room_sync_every == 0 {
            return Err(CoreError::config("room sync cadence must be at least 1 cycle"));
        }
        if self.categories.is_empty() {
            return Err(CoreError::config("at least one device category must be enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> BridgeConfig {
        BridgeConfig::new(
            "https://10.0.0.5".parse().unwrap(),
            SecretString::from("t".to_string()),
        )
    }

    #[test]
    fn defaults_are_valid() {
        config().validate().unwrap();
    }

    #[test]
    fn rejects_fast_polling() {
        let mut cfg = config();
        cfg.poll_interval = Duration::from_secs(5);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn rejects_session_age_past_idle_timeout() {
        let mut cfg = config();
        cfg.session_max_age = Duration::from_secs(600);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_categories() {
        let mut cfg = config();
        cfg.categories = CategorySet::empty();
        assert!(cfg.validate().is_err());
    }
}
