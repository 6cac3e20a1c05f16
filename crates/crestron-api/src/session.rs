// Session key lifecycle
//
// The hub hands out a session key from `GET /login` in exchange for the
// long-lived auth token. Keys die after ten minutes of inactivity, so the
// client refreshes proactively once a key reaches `SessionPolicy::max_age`
// and reactively when a call comes back 401/511.
//
// The session slot lives behind an async mutex that is held across the
// login round-trip: concurrent callers that find the slot empty or stale
// queue up behind a single login and then reuse its key.

use std::time::Duration;

use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::CrestronClient;
use crate::error::Error;

/// Header carrying the long-lived token on `/login`.
pub const AUTH_TOKEN_HEADER: &str = "Crestron-RestAPI-AuthToken";
/// Header carrying the session key on every other call.
pub const AUTH_KEY_HEADER: &str = "Crestron-RestAPI-AuthKey";

/// Hub-side inactivity timeout for a session key.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// When to proactively replace the current session key.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Re-login once the key is at least this old. Must stay under
    /// [`IDLE_TIMEOUT`]; zero forces a login before every call.
    pub max_age: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(480),
        }
    }
}

/// An acquired session key.
pub(crate) struct Session {
    key: SecretString,
    acquired_at: Instant,
    version: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "AuthKey", alias = "authKey")]
    authkey: Option<String>,
    version: Option<String>,
}

impl CrestronClient {
    /// Return a usable session key, logging in first if there is none or the
    /// current one has reached the refresh age.
    pub async fn ensure_session(&self) -> Result<SecretString, Error> {
        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_ref() {
            let age = session.acquired_at.elapsed();
            if age < self.policy.max_age {
                return Ok(session.key.clone());
            }
            debug!(age_secs = age.as_secs(), "session key aged out, logging in again");
        }

        let session = self.perform_login().await?;
        let key = session.key.clone();
        *slot = Some(session);
        Ok(key)
    }

    /// Force a fresh login, replacing any current session.
    pub async fn login(&self) -> Result<(), Error> {
        let mut slot = self.session.lock().await;
        *slot = Some(self.perform_login().await?);
        Ok(())
    }

    /// Drop the session, but only if it still holds `stale`.
    ///
    /// A caller that saw its key rejected must not clobber a newer key
    /// another task already obtained.
    pub async fn invalidate_session(&self, stale: &SecretString) {
        let mut slot = self.session.lock().await;
        if slot
            .as_ref()
            .is_some_and(|s| s.key.expose_secret() == stale.expose_secret())
        {
            debug!("discarding rejected session key");
            *slot = None;
        }
    }

    /// Best-effort `GET /logout`. The local session is cleared regardless.
    pub async fn logout(&self) -> Result<(), Error> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let url = self.url("logout")?;
        debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .header(AUTH_KEY_HEADER, session.key.expose_secret())
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "logout was not acknowledged");
        }
        Ok(())
    }

    /// Age of the current session key, if one is held.
    pub async fn session_age(&self) -> Option<Duration> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.acquired_at.elapsed())
    }

    /// API version reported by the hub at the last login.
    pub async fn hub_version(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.version.clone())
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn perform_login(&self) -> Result<Session, Error> {
        let url = self.url("login")?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTH_TOKEN_HEADER, self.auth_token.expose_secret())
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {})", status.as_u16()),
            });
        }

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("login response: {e}"),
                body: body.clone(),
            })?;

        let key = parsed
            .authkey
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no session key".into(),
            })?;

        info!(
            version = parsed.version.as_deref().unwrap_or("unknown"),
            "logged in to Crestron hub"
        );

        Ok(Session {
            key: SecretString::from(key),
            acquired_at: Instant::now(),
            version: parsed.version,
        })
    }
}
