use crate::error::AuthError;
use crate::models::oauth::{CallbackParams, PENDING_LOGIN_KEY, PendingLogin};
use crate::models::user::SESSION_USER_KEY;
use crate::models::{AppState, SessionUser};
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use tower_sessions::Session;

pub async fn callback_handler(
    Query(params): Query<CallbackParams>,
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Redirect, AuthError> {
    // Taken up front so a state can never be used twice, whatever happens below.
    let pending: Option<PendingLogin> = session.remove(PENDING_LOGIN_KEY).await?;
    tracing::debug!(
        session_id = ?session.id(),
        pending = pending.is_some(),
        "OAuth callback received"
    );

    let user = app_state.login.handle_callback(pending, &params).await?;

    session.cycle_id().await?;
    session
        .insert(SESSION_USER_KEY, SessionUser::from(&user))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user logged in with Google");
    Ok(Redirect::to(&app_state.config.login_redirect_url))
}
