// Crestron Home REST client
//
// Wraps `reqwest::Client` with the hub's URL layout (`/cws/api/...`), session
// key injection, and the one-shot re-login on 401/511. Endpoint groups
// (catalog reads, device actions) are inherent methods in sibling modules so
// this file stays focused on transport mechanics.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::{Error, VendorErrorKind};
use crate::session::{AUTH_KEY_HEADER, Session, SessionPolicy};
use crate::transport::TransportConfig;

const API_ROOT: &str = "cws/api";

/// Async client for one Crestron Home hub.
///
/// Holds the long-lived auth token and at most one session key. Every
/// request goes through [`ensure_session`](Self::ensure_session) first; a
/// request rejected with 401 or 511 triggers exactly one re-login and one
/// retry before the error is surfaced.
pub struct CrestronClient {
    pub(crate) http: reqwest::Client,
    base_url: Url,
    pub(crate) auth_token: SecretString,
    pub(crate) policy: SessionPolicy,
    pub(crate) session: Mutex<Option<Session>>,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VendorErrorBody {
    error_source: Option<i64>,
    error_message: Option<String>,
    message: Option<String>,
}

impl CrestronClient {
    /// Create a client for the hub at `hub_url`.
    ///
    /// `hub_url` may be a bare origin (`https://192.168.1.20`) or already
    /// include the `/cws/api` root.
    pub fn new(
        hub_url: &str,
        auth_token: SecretString,
        transport: &TransportConfig,
        policy: SessionPolicy,
    ) -> Result<Self, Error> {
        let base_url = api_base(hub_url)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, auth_token, policy).with_timeout(transport.timeout))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// `base_url` must already point at the API root.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        auth_token: SecretString,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            auth_token,
            policy,
            session: Mutex::new(None),
            timeout: TransportConfig::default().timeout,
        }
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The API root every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The active session policy.
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// GET `path` and deserialize the body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let body = self.call_raw::<()>(Method::GET, path, None).await?;
        parse_body(&body)
    }

    /// POST `body` to `path` and return the raw response text.
    pub(crate) async fn post_raw<B>(&self, path: &str, body: Option<&B>) -> Result<String, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.call_raw(Method::POST, path, body).await
    }

    /// Issue an authenticated request, re-logging in once if the key is rejected.
    pub(crate) async fn call_raw<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let key = self.ensure_session().await?;

        match self.send(method.clone(), path, body, &key).await {
            Err(e) if e.is_auth_expired() => {
                debug!(path, "session key rejected, re-authenticating");
                self.invalidate_session(&key).await;
                let key = self.ensure_session().await?;
                self.send(method, path, body, &key).await
            }
            other => other,
        }
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        key: &SecretString,
    ) -> Result<String, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let mut req = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(AUTH_KEY_HEADER, key.expose_secret());
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| self.map_transport(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_transport(e))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(parse_error(status, &text))
        }
    }

    pub(crate) fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Normalize a hub URL to the `/cws/api/` root with a trailing slash.
pub fn api_base(hub_url: &str) -> Result<Url, Error> {
    let mut url = Url::parse(hub_url)?;
    let path = url.path().trim_end_matches('/').to_owned();
    let path = if path.ends_with(API_ROOT) {
        format!("{path}/")
    } else {
        format!("{path}/{API_ROOT}/")
    };
    url.set_path(&path);
    Ok(url)
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

fn parse_error(status: StatusCode, body: &str) -> Error {
    let code = status.as_u16();
    if code == 401 || code == 511 {
        return Error::SessionExpired { status: code };
    }

    let parsed: Option<VendorErrorBody> = serde_json::from_str(body).ok();
    let source_code = parsed.as_ref().and_then(|b| b.error_source);
    let message = parsed
        .and_then(|b| b.error_message.or(b.message))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("error").to_owned()
            } else {
                body.chars().take(200).collect()
            }
        });

    debug!(status = code, ?source_code, %message, "hub returned an error");

    Error::Vendor {
        status: code,
        kind: VendorErrorKind::classify(code, source_code),
        source_code,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_base_appends_root() {
        assert_eq!(
            api_base("https://10.0.0.5").unwrap().as_str(),
            "https://10.0.0.5/cws/api/"
        );
        assert_eq!(
            api_base("https://hub.local/cws/api/").unwrap().as_str(),
            "https://hub.local/cws/api/"
        );
    }

    #[test]
    fn session_statuses_map_to_expired() {
        assert!(parse_error(StatusCode::UNAUTHORIZED, "").is_auth_expired());
        assert!(parse_error(StatusCode::NETWORK_AUTHENTICATION_REQUIRED, "").is_auth_expired());
    }

    #[test]
    fn vendor_error_carries_source_code() {
        let err = parse_error(
            StatusCode::CONFLICT,
            r#"{"errorSource": 5001, "errorMessage": "device busy"}"#,
        );
        match err {
            Error::Vendor {
                status,
                kind,
                source_code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(kind, VendorErrorKind::Device);
                assert_eq!(source_code, Some(5001));
                assert_eq!(message, "device busy");
            }
            other => panic!("expected Vendor, got {other:?}"),
        }
    }
}
