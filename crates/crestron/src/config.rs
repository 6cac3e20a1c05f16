//! CLI configuration: thin wrapper around `crestron_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--host, --token, etc.).

use std::time::Duration;

use secrecy::SecretString;

use crestron_core::{BridgeConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use crestron_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `BridgeConfig` from the config file, active profile, and flags.
pub fn build_bridge_config(global: &GlobalOpts) -> Result<BridgeConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global);
    }

    // No profile: --host and --token alone must be enough.
    let Some(host) = global.host.clone() else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };
    if global.token.is_none() {
        return Err(CliError::NoCredentials {
            profile: profile_name,
        });
    }
    let profile = Profile {
        host,
        ..Profile::default()
    };
    resolve_profile(&profile, &profile_name, global)
}

/// Translate a `Profile` + global flags into a `BridgeConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<BridgeConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }

    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => crestron_config::resolve_token(&profile, profile_name)?,
    };

    let mut bridge = crestron_config::profile_with_token(&profile, token)?;
    if global.insecure {
        bridge.tls = TlsVerification::DangerAcceptInvalid;
    }
    // The flag only wins when the profile leaves the timeout unset.
    if profile.timeout.is_none() {
        bridge.timeout = Duration::from_secs(global.timeout);
    }
    Ok(bridge)
}
