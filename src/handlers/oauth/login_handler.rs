use crate::error::AuthError;
use crate::models::oauth::PENDING_LOGIN_KEY;
use crate::models::user::SESSION_USER_KEY;
use crate::models::{AppState, SessionUser};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect},
};
use tower_sessions::Session;

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Log in</title></head>
<body>
    <h1>Log in</h1>
    <form method="post" action="/login">
        <button type="submit">Log in with Google</button>
    </form>
</body>
</html>
"#;

pub async fn login_page_handler(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AuthError> {
    let user: Option<SessionUser> = session.get(SESSION_USER_KEY).await?;

    if let Some(user) = user {
        tracing::debug!(user_id = %user.id, "already logged in, skipping login page");
        return Ok(Redirect::to(&app_state.config.login_redirect_url).into_response());
    }

    Ok(Html(LOGIN_PAGE).into_response())
}

/// Starts the Google flow: remembers state + verifier in the session and redirects out.
pub async fn login_handler(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Redirect, AuthError> {
    let start = app_state.login.start_login()?;

    session.insert(PENDING_LOGIN_KEY, &start.pending).await?;
    session.save().await?;

    tracing::info!(session_id = ?session.id(), "redirecting to Google for authorization");
    Ok(Redirect::to(start.redirect_url.as_str()))
}
