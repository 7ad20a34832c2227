use crate::services::{IdentityProvider, LoginFlow, UserStore};
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_SCOPES: &str = "openid email profile";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:10000";
const DEFAULT_SESSION_HOURS: i64 = 6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not found")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Url,
    /// Where a freshly logged-in user lands.
    pub login_redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: Url,
    pub token_url: Url,
    pub tokeninfo_url: Url,
    pub bind_addr: SocketAddr,
    pub session_secure_cookie: bool,
    pub session_inactivity_hours: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_url", &self.redirect_url.as_str())
            .field("login_redirect_url", &self.login_redirect_url)
            .field("scopes", &self.scopes)
            .field("bind_addr", &self.bind_addr)
            .field("session_secure_cookie", &self.session_secure_cookie)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        use dotenvy::dotenv;
        use std::env;

        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let client_id = require("GOOGLE_CLIENT_ID")?;
        let client_secret = require("GOOGLE_CLIENT_SECRET")?;
        let redirect_url = parse_url("GOOGLE_REDIRECT_URI", &require("GOOGLE_REDIRECT_URI")?)?;

        let login_redirect_url = get("LOGIN_REDIRECT_URL").unwrap_or_else(|| "/".to_string());

        let scopes: Vec<String> = get("GOOGLE_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let auth_url = parse_url(
            "GOOGLE_AUTH_URL",
            &get("GOOGLE_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        )?;
        let token_url = parse_url(
            "GOOGLE_TOKEN_URL",
            &get("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        )?;
        let tokeninfo_url = parse_url(
            "GOOGLE_TOKENINFO_URL",
            &get("GOOGLE_TOKENINFO_URL").unwrap_or_else(|| DEFAULT_TOKENINFO_URL.to_string()),
        )?;

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let session_secure_cookie = match get("SESSION_SECURE_COOKIE") {
            Some(raw) => parse_bool("SESSION_SECURE_COOKIE", &raw)?,
            None => false,
        };

        let session_inactivity_hours = match get("SESSION_INACTIVITY_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SESSION_INACTIVITY_HOURS",
                        reason: format!("expected a positive number of hours, got {raw:?}"),
                    });
                }
            },
            None => DEFAULT_SESSION_HOURS,
        };

        Ok(Self {
            client_id,
            client_secret,
            redirect_url,
            login_redirect_url,
            scopes,
            auth_url,
            token_url,
            tokeninfo_url,
            bind_addr,
            session_secure_cookie,
            session_inactivity_hours,
        })
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub login: LoginFlow,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            login: LoginFlow::new(identity, users.clone()),
            users,
        }
    }
}
