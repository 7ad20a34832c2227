//! Framework-free orchestration of the authorization code + PKCE flow.
//!
//! [`LoginFlow::start_login`] produces the redirect target and the
//! [`PendingLogin`] the caller must keep until the callback arrives;
//! [`LoginFlow::handle_callback`] turns that pending login plus the callback
//! query into a local [`User`]. Session storage stays with the caller.

use crate::error::AuthError;
use crate::models::User;
use crate::models::oauth::{CallbackParams, PendingLogin};
use crate::security;
use crate::services::{IdentityProvider, UserStore};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone)]
pub struct LoginStart {
    pub redirect_url: Url,
    pub pending: PendingLogin,
}

#[derive(Clone)]
pub struct LoginFlow {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
}

impl LoginFlow {
    pub fn new(identity: Arc<dyn IdentityProvider>, users: Arc<dyn UserStore>) -> Self {
        Self { identity, users }
    }

    pub fn start_login(&self) -> Result<LoginStart, AuthError> {
        let state = CsrfToken::new(security::generate_state()?);
        let pkce = security::generate_pkce_pair()?;

        let redirect_url = self.identity.authorization_url(&state, &pkce.code_challenge);

        Ok(LoginStart {
            redirect_url,
            pending: PendingLogin {
                state: state.secret().clone(),
                code_verifier: pkce.code_verifier,
            },
        })
    }

    /// `pending` must already be removed from the session so it cannot be replayed.
    pub async fn handle_callback(
        &self,
        pending: Option<PendingLogin>,
        params: &CallbackParams,
    ) -> Result<User, AuthError> {
        if let Some(error) = &params.error {
            return Err(AuthError::ProviderDenied {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        let pending = pending.ok_or(AuthError::MissingPendingLogin)?;

        match params.state.as_deref() {
            Some(state) if security::constant_time_eq(state, &pending.state) => {}
            _ => return Err(AuthError::InvalidState),
        }

        let code = params
            .code
            .clone()
            .filter(|c| !c.is_empty())
            .map(AuthorizationCode::new)
            .ok_or(AuthError::MissingCode)?;

        if !security::is_valid_code_verifier(&pending.code_verifier) {
            tracing::warn!(
                len = pending.code_verifier.len(),
                "stored code verifier is corrupt, discarding pending login"
            );
            return Err(AuthError::MissingPendingLogin);
        }
        let code_verifier = PkceCodeVerifier::new(pending.code_verifier);

        let tokens = self.identity.exchange_code(&code, &code_verifier).await?;

        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| AuthError::InvalidToken("token response has no id_token".into()))?;

        let info = self.identity.verify_id_token(id_token).await?;
        tracing::debug!(sub = %info.sub, "ID token verified");

        Ok(self.users.get_or_create_google_user(&info).await?)
    }
}
