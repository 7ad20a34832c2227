use serde::{Deserialize, Deserializer, Serialize};

/// Session key holding the [`PendingLogin`] of an in-flight authorization request.
pub const PENDING_LOGIN_KEY: &str = "google_oauth";

/// What must survive the round trip to Google: the state we sent and the
/// verifier behind the challenge we sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingLogin {
    pub state: String,
    pub code_verifier: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Claims returned by Google's tokeninfo endpoint. Numbers and booleans arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub exp: u64,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub email_verified: bool,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// A Google identity after every ID token check has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOr<T> {
    Value(T),
    Text(String),
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOr::<bool>::deserialize(deserializer)? {
        StringOr::Value(b) => Ok(b),
        StringOr::Text(s) => Ok(s.eq_ignore_ascii_case("true")),
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOr::<u64>::deserialize(deserializer)? {
        StringOr::Value(n) => Ok(n),
        StringOr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
