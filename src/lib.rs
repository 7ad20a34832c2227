//! "Login with Google" for an axum application: OAuth2 authorization code flow
//! with CSRF state and PKCE, provisioning local users from verified ID tokens.

pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;
pub mod telemetry;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{callback_handler, home_handler, login_handler, login_page_handler, logout_handler};
use models::AppState;
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

pub const CALLBACK_PATH: &str = "/login/callback";

pub fn app(app_state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_expiry = Expiry::OnInactivity(Duration::hours(
        app_state.config.session_inactivity_hours,
    ));
    // Lax, not Strict: the callback is a cross-site top-level navigation from Google.
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.session_secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(session_expiry);

    Router::new()
        .route("/", get(home_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route(CALLBACK_PATH, get(callback_handler))
        .route("/logout", post(logout_handler))
        .layer(session_layer)
        .with_state(app_state)
}
