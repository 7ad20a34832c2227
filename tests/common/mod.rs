#![allow(dead_code)]

use googler_server::models::AppConfig;

pub const CLIENT_ID: &str = "client-123.apps.googleusercontent.com";

/// Config pointing every Google endpoint at a mock server.
pub fn config_for(server_url: &str) -> AppConfig {
    let server_url = server_url.to_string();
    AppConfig::from_lookup(move |key| {
        let value = match key {
            "GOOGLE_CLIENT_ID" => CLIENT_ID.to_string(),
            "GOOGLE_CLIENT_SECRET" => "test-secret".to_string(),
            "GOOGLE_REDIRECT_URI" => "http://localhost:10000/login/callback".to_string(),
            "LOGIN_REDIRECT_URL" => "/dashboard".to_string(),
            "GOOGLE_AUTH_URL" => format!("{server_url}/auth"),
            "GOOGLE_TOKEN_URL" => format!("{server_url}/token"),
            "GOOGLE_TOKENINFO_URL" => format!("{server_url}/tokeninfo"),
            _ => return None,
        };
        Some(value)
    })
    .expect("test config")
}

pub fn token_body(id_token: &str) -> String {
    format!(
        r#"{{"access_token":"ya29.access","expires_in":3599,"id_token":"{id_token}","scope":"openid email profile","token_type":"Bearer"}}"#
    )
}

pub fn tokeninfo_body(aud: &str, email_verified: &str) -> String {
    format!(
        r#"{{"iss":"https://accounts.google.com","aud":"{aud}","sub":"110169484474386276334","email":"grace@example.com","email_verified":"{email_verified}","exp":"9999999999","name":"Grace Hopper","given_name":"Grace","family_name":"Hopper"}}"#
    )
}
