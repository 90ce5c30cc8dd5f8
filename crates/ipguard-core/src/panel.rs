//! Panel API client.
//!
//! Talks to the VPN panel over HTTP: bearer-token login, online-session
//! polling, and the disable action the enforcer triggers for over-limit
//! users. Credentials are read from the config document on every call,
//! so reconfiguring the panel through the bot takes effect without a
//! restart. Access tokens are short-lived and cached with a TTL.

use crate::config::{BotConfig, ConfigError, ConfigStore};
use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, warn};

/// Cached access tokens outlive one enforcement cycle but stay well
/// under the panel's session lifetime.
const TOKEN_TTL_SECS: u64 = 3000;
const HTTP_TIMEOUT_SECS: u64 = 30;
const LOGIN_RETRIES: usize = 3;
const LOGIN_INITIAL_BACKOFF_MS: u64 = 250;
const LOGIN_MAX_BACKOFF_MS: u64 = 5000;

/// Errors that can occur while talking to the panel.
#[derive(Error, Debug)]
pub enum PanelError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The config document could not be read.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Panel connection data has not been configured yet.
    #[error("panel credentials are not configured")]
    NotConfigured,
    /// The panel rejected the configured credentials.
    #[error("panel rejected credentials: {0}")]
    Auth(String),
    /// The panel returned a non-success status.
    #[error("panel API error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },
}

/// Panel connection data extracted from the config document.
#[derive(Debug, Clone)]
pub struct PanelCredentials {
    /// Panel address, `host:port` or a full URL.
    pub domain: String,
    /// Panel admin username.
    pub username: String,
    /// Panel admin password.
    pub password: String,
}

impl PanelCredentials {
    /// Extract credentials from a config document, if fully present.
    #[must_use]
    pub fn from_config(cfg: &BotConfig) -> Option<Self> {
        Some(Self {
            domain: cfg.panel_domain.clone()?,
            username: cfg.panel_username.clone()?,
            password: cfg.panel_password.clone()?,
        })
    }
}

/// One user's connections as reported by the panel.
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineSession {
    /// Panel account name.
    pub username: String,
    /// IP addresses observed for the account in this poll.
    #[serde(default)]
    pub ips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// The seam the enforcer uses to disable an over-limit user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Disabler: Send + Sync {
    /// Disable the named user on the panel.
    async fn disable_user(&self, username: &str) -> Result<(), PanelError>;
}

/// HTTP client for the panel API.
pub struct PanelClient {
    config: Arc<ConfigStore>,
    http: reqwest::Client,
    tokens: Cache<String, Arc<String>>,
}

impl PanelClient {
    /// Create a client reading credentials from `config`.
    #[must_use]
    pub fn new(config: Arc<ConfigStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let tokens = Cache::builder()
            .max_capacity(4)
            .time_to_live(Duration::from_secs(TOKEN_TTL_SECS))
            .build();
        Self {
            config,
            http,
            tokens,
        }
    }

    /// Poll the panel for the currently online sessions.
    ///
    /// # Errors
    ///
    /// Returns a `PanelError` if credentials are missing or the request
    /// fails.
    pub async fn online_sessions(&self) -> Result<Vec<OnlineSession>, PanelError> {
        let creds = self.credentials().await?;
        let token = self.token(&creds).await?;
        let url = format!("{}/api/connections", base_url(&creds.domain));
        let resp = self.http.get(&url).bearer_auth(token.as_str()).send().await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate(&token_key(&creds)).await;
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn credentials(&self) -> Result<PanelCredentials, PanelError> {
        let cfg = self.config.load().await?;
        PanelCredentials::from_config(&cfg).ok_or(PanelError::NotConfigured)
    }

    async fn token(&self, creds: &PanelCredentials) -> Result<Arc<String>, PanelError> {
        let key = token_key(creds);
        if let Some(token) = self.tokens.get(&key).await {
            return Ok(token);
        }
        let strategy = ExponentialBackoff::from_millis(LOGIN_INITIAL_BACKOFF_MS)
            .max_delay(Duration::from_millis(LOGIN_MAX_BACKOFF_MS))
            .map(jitter)
            .take(LOGIN_RETRIES);
        let token = Retry::spawn(strategy, || {
            login(&self.http, &creds.domain, &creds.username, &creds.password)
        })
        .await?;
        debug!("Obtained a fresh panel access token");
        let token = Arc::new(token);
        self.tokens.insert(key, token.clone()).await;
        Ok(token)
    }
}

#[async_trait]
impl Disabler for PanelClient {
    async fn disable_user(&self, username: &str) -> Result<(), PanelError> {
        let creds = self.credentials().await?;
        let token = self.token(&creds).await?;
        let url = format!("{}/api/user/{username}", base_url(&creds.domain));
        let resp = self
            .http
            .put(&url)
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({ "status": "disabled" }))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate(&token_key(&creds)).await;
            warn!("Panel token expired while disabling {username}");
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        Ok(())
    }
}

/// Check panel connection data by performing a login.
///
/// Used by the bot's configuration dialogue before saving credentials.
///
/// # Errors
///
/// Returns a `PanelError` if the panel is unreachable or rejects the
/// credentials.
pub async fn verify_credentials(
    domain: &str,
    username: &str,
    password: &str,
) -> Result<(), PanelError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    login(&http, domain, username, password).await.map(|_| ())
}

async fn login(
    http: &reqwest::Client,
    domain: &str,
    username: &str,
    password: &str,
) -> Result<String, PanelError> {
    let url = format!("{}/api/admin/token", base_url(domain));
    let resp = http
        .post(&url)
        .form(&[
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
        ])
        .send()
        .await?;
    if resp.status() == reqwest::StatusCode::UNAUTHORIZED
        || resp.status() == reqwest::StatusCode::FORBIDDEN
    {
        let body = resp.text().await.unwrap_or_default();
        return Err(PanelError::Auth(body));
    }
    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }
    let token: TokenResponse = resp.json().await?;
    Ok(token.access_token)
}

async fn api_error(resp: reqwest::Response) -> PanelError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    PanelError::Api { status, body }
}

fn token_key(creds: &PanelCredentials) -> String {
    format!("{}@{}", creds.username, creds.domain)
}

fn base_url(domain: &str) -> String {
    let trimmed = domain.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_adds_scheme_when_missing() {
        assert_eq!(base_url("sub.domain.com:8333"), "https://sub.domain.com:8333");
        assert_eq!(base_url("http://10.0.0.1:443/"), "http://10.0.0.1:443");
        assert_eq!(base_url("https://panel.example"), "https://panel.example");
    }

    #[test]
    fn credentials_require_all_fields() {
        let mut cfg = BotConfig {
            panel_domain: Some("panel.example".to_string()),
            panel_username: Some("admin".to_string()),
            ..BotConfig::default()
        };
        assert!(PanelCredentials::from_config(&cfg).is_none());

        cfg.panel_password = Some("secret".to_string());
        let creds = PanelCredentials::from_config(&cfg).expect("complete");
        assert_eq!(creds.domain, "panel.example");
    }
}
