//! Shared configuration for the Crestron Home CLI and other hosts.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `crestron_core::BridgeConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crestron_core::config::{DEFAULT_POLL_INTERVAL, DEFAULT_ROOM_SYNC_EVERY, DEFAULT_SESSION_MAX_AGE};
use crestron_core::{BridgeConfig, CategorySet, DeviceKind, TlsVerification};

/// Keyring service every profile token is stored under.
pub const KEYRING_SERVICE: &str = "crestron";

/// Comma-separated ignore patterns used when a profile lists none.
pub const IGNORED_DEVICES_ENV: &str = "IGNORED_DEVICE_NAMES";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no hub token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named hub profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Hub host or full URL (e.g., "192.168.1.20" or "https://hub.local").
    pub host: String,

    /// Scheme used when `host` carries none.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Hub API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept the hub's self-signed certificate. Defaults to true when no
    /// `ca_cert` is configured.
    pub insecure: Option<bool>,

    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,

    /// Seconds between poll cycles (minimum 10).
    pub poll_interval: Option<u64>,

    /// Categories to poll; all eight when unset.
    pub categories: Option<Vec<String>>,

    /// Re-fetch rooms every N cycles.
    pub room_sync_every: Option<u32>,

    /// Seconds before a session key is proactively replaced.
    pub session_max_age: Option<u64>,

    /// Name / subtype patterns (`%` wildcards) for devices to hide.
    #[serde(default)]
    pub ignored_devices: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            host: String::new(),
            scheme: default_scheme(),
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            poll_interval: None,
            categories: None,
            room_sync_every: None,
            session_max_age: None,
            ignored_devices: Vec::new(),
        }
    }
}

fn default_scheme() -> String {
    "https".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "crestron", "crestron").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("crestron");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, still layering `CRESTRON_` variables
/// (nested keys separated by `__`, e.g. `CRESTRON_DEFAULTS__OUTPUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRESTRON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution (without CLI flags) ────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the hub token from the credential chain (no CLI flag step).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's token in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    debug!(profile = profile_name, "token stored in keyring");
    Ok(())
}

// ── Field translation ───────────────────────────────────────────────

/// Build the hub URL from `host` + `scheme`. A `host` that already has a
/// scheme is used as-is.
pub fn profile_url(profile: &Profile) -> Result<Url, ConfigError> {
    let host = profile.host.trim();
    if host.is_empty() {
        return Err(invalid("host", "no hub host configured"));
    }
    let raw = if host.contains("://") {
        host.to_owned()
    } else {
        format!("{}://{host}", profile.scheme)
    };
    raw.parse()
        .map_err(|e| invalid("host", format!("invalid URL '{raw}': {e}")))
}

/// Parse category names (`lights`, `door_lock`, `media`, ...).
pub fn parse_categories<S: AsRef<str>>(names: &[S]) -> Result<CategorySet, ConfigError> {
    names
        .iter()
        .map(|n| {
            let n = n.as_ref().trim();
            DeviceKind::from_str(n).map_err(|_| invalid("categories", format!("unknown category '{n}'")))
        })
        .collect()
}

/// Split a comma-separated pattern list, dropping blanks.
pub fn parse_ignored(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// The profile's ignore patterns, or `IGNORED_DEVICE_NAMES` when it lists none.
pub fn resolve_ignored(profile: &Profile) -> Vec<String> {
    if !profile.ignored_devices.is_empty() {
        return profile.ignored_devices.clone();
    }
    std::env::var(IGNORED_DEVICES_ENV)
        .map(|raw| parse_ignored(&raw))
        .unwrap_or_default()
}

fn tls_for(profile: &Profile) -> TlsVerification {
    match (profile.insecure, &profile.ca_cert) {
        (Some(true), _) => TlsVerification::DangerAcceptInvalid,
        (_, Some(ca)) => TlsVerification::CustomCa(ca.clone()),
        (Some(false), None) => TlsVerification::SystemDefaults,
        // Factory hubs serve a self-signed certificate.
        (None, None) => TlsVerification::DangerAcceptInvalid,
    }
}

/// Build a `BridgeConfig` from a profile with an already-resolved token.
pub fn profile_with_token(profile: &Profile, token: SecretString) -> Result<BridgeConfig, ConfigError> {
    let url = profile_url(profile)?;
    let mut cfg = BridgeConfig::new(url, token);

    cfg.tls = tls_for(profile);
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));
    cfg.poll_interval = profile
        .poll_interval
        .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs);
    cfg.room_sync_every = profile.room_sync_every.unwrap_or(DEFAULT_ROOM_SYNC_EVERY);
    cfg.session_max_age = profile
        .session_max_age
        .map_or(DEFAULT_SESSION_MAX_AGE, Duration::from_secs);
    if let Some(ref names) = profile.categories {
        cfg.categories = parse_categories(names)?;
    }
    cfg.ignored_devices = resolve_ignored(profile);

    cfg.validate()
        .map_err(|e| invalid("profile", e.to_string()))?;
    Ok(cfg)
}

/// Build a `BridgeConfig` from a profile, no CLI flag overrides.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<BridgeConfig, ConfigError> {
    let token = resolve_token(profile, profile_name)?;
    profile_with_token(profile, token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(host: &str) -> Profile {
        Profile {
            host: host.into(),
            token: Some("plain-token".into()),
            ignored_devices: vec!["%Test".into()],
            ..Profile::default()
        }
    }

    #[test]
    fn bare_host_gets_scheme() {
        let url = profile_url(&profile("192.168.1.20")).unwrap();
        assert_eq!(url.as_str(), "https://192.168.1.20/");

        let mut p = profile("hub.local:8080");
        p.scheme = "http".into();
        assert_eq!(profile_url(&p).unwrap().as_str(), "http://hub.local:8080/");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(
            profile_url(&profile("  ")),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn profile_fields_reach_bridge_config() {
        let p = Profile {
            poll_interval: Some(30),
            room_sync_every: Some(4),
            session_max_age: Some(300),
            categories: Some(vec!["lights".into(), "DoorLocks".into()]),
            ..profile("hub")
        };
        let cfg = profile_with_token(&p, SecretString::from("t".to_string())).unwrap();

        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.room_sync_every, 4);
        assert_eq!(cfg.session_max_age, Duration::from_secs(300));
        assert!(cfg.categories.contains(DeviceKind::Light));
        assert!(cfg.categories.contains(DeviceKind::Lock));
        assert!(!cfg.categories.contains(DeviceKind::Scene));
        assert_eq!(cfg.ignored_devices, vec!["%Test".to_string()]);
        assert!(matches!(cfg.tls, TlsVerification::DangerAcceptInvalid));
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let p = Profile {
            poll_interval: Some(2),
            ..profile("hub")
        };
        assert!(profile_with_token(&p, SecretString::from("t".to_string())).is_err());

        let p = Profile {
            session_max_age: Some(900),
            ..profile("hub")
        };
        assert!(profile_with_token(&p, SecretString::from("t".to_string())).is_err());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = parse_categories(&["lights", "sprinklers"]).unwrap_err();
        assert!(err.to_string().contains("sprinklers"));
    }

    #[test]
    fn ignored_patterns_split_on_commas() {
        assert_eq!(
            parse_ignored(" %Test , Spare%,,"),
            vec!["%Test".to_string(), "Spare%".to_string()]
        );
    }

    #[test]
    fn tls_mode_follows_profile() {
        let mut p = profile("hub");
        p.insecure = Some(false);
        assert!(matches!(tls_for(&p), TlsVerification::SystemDefaults));
        p.ca_cert = Some("/etc/hub-ca.pem".into());
        assert!(matches!(tls_for(&p), TlsVerification::CustomCa(_)));
        p.insecure = Some(true);
        assert!(matches!(tls_for(&p), TlsVerification::DangerAcceptInvalid));
    }

    #[test]
    fn config_file_round_trips_through_figment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), profile("10.0.0.5"));
        cfg.default_profile = Some("home".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile.as_deref(), Some("home"));
        let home = &loaded.profiles["home"];
        assert_eq!(home.host, "10.0.0.5");
        assert_eq!(home.scheme, "https");
        assert_eq!(loaded.defaults.output, "table");
    }
}
