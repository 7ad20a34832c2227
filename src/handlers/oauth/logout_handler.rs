use crate::error::AuthError;
use axum::response::Redirect;
use tower_sessions::Session;

pub async fn logout_handler(session: Session) -> Result<Redirect, AuthError> {
    session.flush().await?;
    Ok(Redirect::to("/"))
}
