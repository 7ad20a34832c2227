use crate::error::{AuthError, escape_html};
use crate::models::user::SESSION_USER_KEY;
use crate::models::{AppState, SessionUser};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tower_sessions::Session;

const ANONYMOUS_PAGE: &str = "<h1>Hello!</h1><p><a href=\"/login\">Log in with Google</a></p>";

pub async fn home_handler(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AuthError> {
    let Some(session_user) = session.get::<SessionUser>(SESSION_USER_KEY).await? else {
        return Ok(Html(ANONYMOUS_PAGE.to_string()));
    };

    // The account may have been removed since the session was issued.
    let Some(user) = app_state.users.find_by_id(session_user.id).await? else {
        tracing::info!(user_id = %session_user.id, "session user no longer exists, logging out");
        session.flush().await?;
        return Ok(Html(ANONYMOUS_PAGE.to_string()));
    };

    let user = SessionUser::from(&user);
    Ok(Html(format!(
        "<h1>Hello, {}!</h1>\
         <p>Signed in as {}.</p>\
         <form method=\"post\" action=\"/logout\"><button type=\"submit\">Log out</button></form>",
        escape_html(&user.display_name),
        escape_html(&user.email)
    )))
}
