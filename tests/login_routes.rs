mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use common::{CLIENT_ID, config_for, token_body, tokeninfo_body};
use async_trait::async_trait;
use googler_server::app;
use googler_server::models::oauth::GoogleUserInfo;
use googler_server::models::{AppState, User};
use googler_server::services::{GoogleClient, InMemoryUserStore, UserStore, UserStoreError};
use mockito::{Matcher, Server, ServerGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower::ServiceExt;
use url::{Url, form_urlencoded};
use uuid::Uuid;

fn test_app(server: &ServerGuard) -> Router {
    app_with_store(server, Arc::new(InMemoryUserStore::new()))
}

fn app_with_store(server: &ServerGuard, users: Arc<dyn UserStore>) -> Router {
    let config = config_for(&server.url());
    let google = GoogleClient::new(&config, reqwest::Client::new());
    app(AppState::new(config, Arc::new(google), users))
}

/// In-memory store whose lookups can be made to miss, as if the account was deleted.
#[derive(Default)]
struct ForgetfulStore {
    inner: InMemoryUserStore,
    forget: AtomicBool,
}

#[async_trait]
impl UserStore for ForgetfulStore {
    async fn get_or_create_google_user(
        &self,
        info: &GoogleUserInfo,
    ) -> Result<User, UserStoreError> {
        self.inner.get_or_create_google_user(info).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        if self.forget.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_id(id).await
    }
}

fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn callback_uri(code: &str, state: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("state", state)
        .finish();
    format!("/login/callback?{query}")
}

/// POST /login and return (session cookie, state, code_challenge) from the redirect.
async fn start_login(app: &Router) -> (String, String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);
    let redirect = Url::parse(&location(&response)).unwrap();
    let param = |name: &str| {
        redirect
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| panic!("missing {name}"))
    };

    assert_eq!(param("client_id"), CLIENT_ID);
    assert_eq!(param("code_challenge_method"), "S256");
    assert_eq!(param("response_type"), "code");

    (cookie, param("state"), param("code_challenge"))
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn login_page_offers_google_button() {
    let server = Server::new_async().await;
    let app = test_app(&server);

    let response = get(&app, "/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Log in with Google"));
}

#[tokio::test]
async fn login_redirects_to_google_with_state_and_challenge() {
    let server = Server::new_async().await;
    let app = test_app(&server);

    let (_, state, challenge) = start_login(&app).await;

    assert_eq!(state.len(), 24);
    assert_eq!(challenge.len(), 43);
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[tokio::test]
async fn full_round_trip_logs_the_user_in() {
    let mut server = Server::new_async().await;
    let app = test_app(&server);

    let (cookie, state, _) = start_login(&app).await;

    let token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("code".into(), "4/auth-code".into()),
            Matcher::Regex("code_verifier=[A-Za-z0-9_-]{54}".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("id-token-abc"))
        .expect(1)
        .create_async()
        .await;
    let tokeninfo_mock = server
        .mock("GET", "/tokeninfo")
        .match_query(Matcher::UrlEncoded("id_token".into(), "id-token-abc".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tokeninfo_body(CLIENT_ID, "true"))
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, &callback_uri("4/auth-code", &state), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let logged_in_cookie = session_cookie(&response);
    assert_ne!(logged_in_cookie, cookie, "session id must change on login");

    token_mock.assert_async().await;
    tokeninfo_mock.assert_async().await;

    let home = get(&app, "/", Some(&logged_in_cookie)).await;
    assert_eq!(home.status(), StatusCode::OK);
    let body = body_text(home).await;
    assert!(body.contains("Grace Hopper"), "{body}");
    assert!(body.contains("grace@example.com"), "{body}");

    let login_page = get(&app, "/login", Some(&logged_in_cookie)).await;
    assert_eq!(login_page.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&login_page), "/dashboard");
}

#[tokio::test]
async fn forged_state_is_rejected_without_calling_google() {
    let mut server = Server::new_async().await;
    let app = test_app(&server);

    let token_mock = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let (cookie, _state, _) = start_login(&app).await;
    let response = get(&app, &callback_uri("4/auth-code", "forged-state"), Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("state parameter"));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn callback_without_login_is_rejected() {
    let server = Server::new_async().await;
    let app = test_app(&server);

    let response = get(&app, &callback_uri("4/auth-code", "whatever"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn state_cannot_be_replayed() {
    let mut server = Server::new_async().await;
    let app = test_app(&server);

    let _token_mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#)
        .create_async()
        .await;

    let (cookie, state, _) = start_login(&app).await;

    let first = get(&app, &callback_uri("4/stale", &state), Some(&cookie)).await;
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(first).await.contains("authorization code rejected"));

    let second = get(&app, &callback_uri("4/stale", &state), Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(second).await.contains("no login in progress"));
}

#[tokio::test]
async fn google_outage_is_a_bad_gateway() {
    let mut server = Server::new_async().await;
    let app = test_app(&server);

    let _token_mock = server
        .mock("POST", "/token")
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let (cookie, state, _) = start_login(&app).await;
    let response = get(&app, &callback_uri("4/auth-code", &state), Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn user_denial_is_reported() {
    let server = Server::new_async().await;
    let app = test_app(&server);

    let (cookie, _, _) = start_login(&app).await;
    let response = get(&app, "/login/callback?error=access_denied", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("access_denied"));
}

#[tokio::test]
async fn logout_clears_the_session() {
    let server = Server::new_async().await;
    let app = test_app(&server);

    let (cookie, _, _) = start_login(&app).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let home = get(&app, "/", Some(&cookie)).await;
    assert!(body_text(home).await.contains("Log in with Google"));
}

#[tokio::test]
async fn deleted_user_is_logged_out() {
    let mut server = Server::new_async().await;
    let store = Arc::new(ForgetfulStore::default());
    let app = app_with_store(&server, store.clone());

    let _token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("id-token-abc"))
        .create_async()
        .await;
    let _tokeninfo_mock = server
        .mock("GET", "/tokeninfo")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tokeninfo_body(CLIENT_ID, "true"))
        .create_async()
        .await;

    let (cookie, state, _) = start_login(&app).await;
    let response = get(&app, &callback_uri("4/auth-code", &state), Some(&cookie)).await;
    let logged_in_cookie = session_cookie(&response);

    let home = get(&app, "/", Some(&logged_in_cookie)).await;
    assert!(body_text(home).await.contains("Grace Hopper"));

    store.forget.store(true, Ordering::SeqCst);
    let home = get(&app, "/", Some(&logged_in_cookie)).await;
    assert_eq!(home.status(), StatusCode::OK);
    let body = body_text(home).await;
    assert!(body.contains("Log in with Google"), "{body}");
    assert!(!body.contains("Grace Hopper"), "{body}");

    let login_page = get(&app, "/login", Some(&logged_in_cookie)).await;
    assert_eq!(login_page.status(), StatusCode::OK);
}
