//! Google OAuth 2.0 endpoints: authorization URL, code exchange and ID token checks.

use crate::error::AuthError;
use crate::models::AppConfig;
use crate::models::oauth::{GoogleUserInfo, ProviderErrorResponse, TokenInfoClaims, TokenResponse};
use async_trait::async_trait;
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier};
use time::OffsetDateTime;
use url::Url;

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// The identity provider seen by the login flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorization_url(&self, state: &CsrfToken, code_challenge: &str) -> Url;

    async fn exchange_code(
        &self,
        code: &AuthorizationCode,
        code_verifier: &PkceCodeVerifier,
    ) -> Result<TokenResponse, AuthError>;

    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleUserInfo, AuthError>;
}

#[derive(Clone)]
pub struct GoogleClient {
    client_id: String,
    client_secret: String,
    redirect_url: Url,
    scopes: Vec<String>,
    auth_url: Url,
    token_url: Url,
    tokeninfo_url: Url,
    http: reqwest::Client,
}

impl GoogleClient {
    pub fn new(config: &AppConfig, http: reqwest::Client) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            scopes: config.scopes.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            tokeninfo_url: config.tokeninfo_url.clone(),
            http,
        }
    }

    fn check_claims(&self, claims: TokenInfoClaims, now: i64) -> Result<GoogleUserInfo, AuthError> {
        if claims.aud != self.client_id {
            return Err(AuthError::InvalidToken(format!(
                "audience {} is not this client",
                claims.aud
            )));
        }
        if !GOOGLE_ISSUERS.contains(&claims.iss.as_str()) {
            return Err(AuthError::InvalidToken(format!(
                "unexpected issuer {}",
                claims.iss
            )));
        }
        if i64::try_from(claims.exp).unwrap_or(i64::MAX) <= now {
            return Err(AuthError::InvalidToken("token expired".to_string()));
        }
        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("no email claim".to_string()))?;
        if !claims.email_verified {
            return Err(AuthError::InvalidToken(format!("email {email} is not verified")));
        }

        Ok(GoogleUserInfo {
            sub: claims.sub,
            email,
            name: claims.name,
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleClient {
    fn authorization_url(&self, state: &CsrfToken, code_challenge: &str) -> Url {
        let mut url = self.auth_url.clone();

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_url.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state.secret())
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "online")
            .append_pair("prompt", "select_account");

        url
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &AuthorizationCode,
        code_verifier: &PkceCodeVerifier,
    ) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code.secret().as_str()),
            ("code_verifier", code_verifier.secret().as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "token exchange failed");

            return Err(match serde_json::from_str::<ProviderErrorResponse>(&body) {
                Ok(err) if err.error == "invalid_grant" => AuthError::InvalidCode(
                    err.error_description.unwrap_or(err.error),
                ),
                Ok(err) => AuthError::Provider {
                    status: status.as_u16(),
                    message: match err.error_description {
                        Some(description) => format!("{}: {}", err.error, description),
                        None => err.error,
                    },
                },
                Err(_) => AuthError::Provider {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<TokenResponse>(&body).map_err(|e| AuthError::Provider {
            status: status.as_u16(),
            message: format!("unparseable token response: {e}"),
        })
    }

    #[tracing::instrument(skip_all)]
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleUserInfo, AuthError> {
        let response = self
            .http
            .get(self.tokeninfo_url.clone())
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ProviderErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| format!("tokeninfo returned HTTP {}", status.as_u16()));
            return Err(AuthError::InvalidToken(reason));
        }

        let body = response.text().await?;
        let claims: TokenInfoClaims = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidToken(format!("malformed claims: {e}")))?;

        self.check_claims(claims, OffsetDateTime::now_utc().unix_timestamp())
    }
}
