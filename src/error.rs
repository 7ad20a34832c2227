use crate::services::user_store::UserStoreError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Everything that can go wrong between "Login with Google" and a logged-in session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("secure random source unavailable: {0}")]
    Entropy(#[from] rand::Error),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("no login in progress for this session")]
    MissingPendingLogin,

    #[error("state parameter does not match this login attempt")]
    InvalidState,

    #[error("authorization code missing from callback")]
    MissingCode,

    #[error("Google refused authorization: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("authorization code rejected: {0}")]
    InvalidCode(String),

    #[error("ID token rejected: {0}")]
    InvalidToken(String),

    #[error("could not reach Google: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Google returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error(transparent)]
    UserStore(#[from] UserStoreError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingPendingLogin
            | AuthError::InvalidState
            | AuthError::MissingCode
            | AuthError::ProviderDenied { .. }
            | AuthError::InvalidCode(_)
            | AuthError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            AuthError::UserStore(UserStoreError::EmailTaken(_)) => StatusCode::CONFLICT,
            AuthError::Network(_) | AuthError::Provider { .. } => StatusCode::BAD_GATEWAY,
            AuthError::Entropy(_) | AuthError::Session(_) | AuthError::UserStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show the browser; server-side failures stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AuthError::ProviderDenied {
                error,
                description: Some(description),
            } => format!("Google refused authorization ({error}): {description}"),
            AuthError::Network(_) | AuthError::Provider { .. } => {
                "Could not complete sign-in with Google. Please try again shortly.".to_string()
            }
            e if e.status_code().is_server_error() => "Internal error during sign-in.".to_string(),
            e => e.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "login failed");
        } else {
            tracing::warn!(error = %self, "login rejected");
        }

        let body = Html(format!(
            "<h1>Error</h1><p>{}</p>\
             <p><a href=\"/login\">Back to Login</a></p>",
            escape_html(&self.public_message())
        ));

        (status, body).into_response()
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
