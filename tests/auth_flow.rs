//! End-to-end tests of the auth routes, the tracks route and the session
//! layer against mock Spotify token and Web API endpoints.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spotify_session::middleware::{
    SessionAuth, SessionAuthConfig, auth_routes, require_session, security_headers, tracks_routes,
};
use spotify_session::{
    AccessToken, Clock, CookiePolicy, OAuthConfig, Session, SessionCodec, Signer, SystemClock,
};

const SECRET: &str = "integration-test-secret";
// base64("client:secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50OnNlY3JldA==";

fn auth(server: &MockServer) -> SessionAuth {
    auth_with_timeout(server, Duration::from_secs(2))
}

fn auth_with_timeout(server: &MockServer, timeout: Duration) -> SessionAuth {
    let oauth = OAuthConfig::new(
        "client",
        "secret",
        "http://localhost:3000/api/auth/callback".parse().unwrap(),
    )
    .with_auth_url(format!("{}/authorize", server.uri()).parse().unwrap())
    .with_token_url(format!("{}/api/token", server.uri()).parse().unwrap());

    SessionAuthConfig::new(oauth, Signer::new(SECRET).unwrap())
        .with_secure_cookies(false)
        .with_refresh_timeout(timeout)
        .with_api_url(format!("{}/v1", server.uri()).parse().unwrap())
        .build()
        .unwrap()
}

async fn me(token: AccessToken) -> String {
    token.to_string()
}

fn app(auth: SessionAuth) -> Router {
    Router::new()
        .route("/api/me", get(me))
        .layer(from_fn_with_state(auth.clone(), require_session))
        .merge(tracks_routes(auth.clone()))
        .merge(auth_routes(auth))
        .layer(from_fn(security_headers))
}

fn codec() -> SessionCodec {
    SessionCodec::new(Signer::new(SECRET).unwrap(), CookiePolicy::new(false))
}

fn session_header(expires_at: i64) -> String {
    codec()
        .encode(&Session {
            access_token: "AT1".into(),
            refresh_token: "RT1".into(),
            expires_at,
        })
        .to_request_header()
}

async fn get_with_cookie(app: Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Turn `Set-Cookie` values into the `Cookie` header a browser would send.
fn as_request_cookies(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

fn location(response: &Response<Body>) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// The only cookie set is the expired `sp_state`: no session was issued and
/// the state cannot be replayed.
fn assert_state_consumed(response: &Response<Body>) {
    let cookies = set_cookies(response);
    assert_eq!(cookies.len(), 1, "{cookies:?}");
    assert!(cookies[0].starts_with("sp_state=;"));
    assert!(cookies[0].contains("Max-Age=0"));
}

async fn mount_token(server: &MockServer, grant: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains(grant))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn forbid_token_calls(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

// ── Login ──────────────────────────────────────────────────────────

#[tokio::test]
async fn login_sets_state_cookie_and_redirects() {
    let server = MockServer::start().await;
    let response = get_with_cookie(app(auth(&server)), "/api/auth/login", None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response).to_string();
    assert!(target.starts_with(&format!("{}/authorize?", server.uri())));
    assert!(target.contains("response_type=code"));
    assert!(target.contains("client_id=client"));

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    let state_cookie = &cookies[0];
    assert!(state_cookie.starts_with("sp_state="));
    assert!(state_cookie.contains("HttpOnly"));
    assert!(state_cookie.contains("Max-Age=600"));

    let state = state_cookie["sp_state=".len()..].split(';').next().unwrap();
    assert!(target.contains(&format!("state={state}")));
}

// ── Callback ───────────────────────────────────────────────────────

#[tokio::test]
async fn callback_state_mismatch_rejected_before_exchange() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?code=abc&state=forged",
        Some("sp_state=expected"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=state_mismatch");
    assert_state_consumed(&response);
}

#[tokio::test]
async fn callback_without_state_cookie_rejected() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?code=abc&state=anything",
        None,
    )
    .await;

    assert_eq!(location(&response), "/?error=state_mismatch");
}

#[tokio::test]
async fn callback_provider_error_redirects() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?error=access_denied&state=s",
        Some("sp_state=s"),
    )
    .await;

    assert_eq!(location(&response), "/?error=access_denied");
}

#[tokio::test]
async fn callback_missing_code_redirects() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?state=s",
        Some("sp_state=s"),
    )
    .await;

    assert_eq!(location(&response), "/?error=missing_code");
}

#[tokio::test]
async fn callback_exchange_failure_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?code=stale&state=s",
        Some("sp_state=s"),
    )
    .await;

    assert_eq!(location(&response), "/?error=callback_failed");
    assert_state_consumed(&response);
}

#[tokio::test]
async fn callback_success_issues_session() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        "grant_type=authorization_code",
        json!({
            "access_token": "AT1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "RT1",
            "scope": "user-read-private"
        }),
    )
    .await;

    let before = SystemClock.now_millis();
    let response = get_with_cookie(
        app(auth(&server)),
        "/api/auth/callback?code=good&state=s",
        Some("sp_state=s"),
    )
    .await;
    let after = SystemClock.now_millis();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 5);
    assert!(cookies.iter().any(|c| c.starts_with("sp_state=;")));

    let session_cookies: Vec<String> = cookies
        .into_iter()
        .filter(|c| !c.starts_with("sp_state="))
        .collect();
    let session = codec()
        .decode(&as_request_cookies(&session_cookies))
        .expect("issued cookies should verify");

    assert_eq!(session.access_token, "AT1");
    assert_eq!(session.refresh_token, "RT1");
    assert!(session.expires_at >= before + 3_600_000);
    assert!(session.expires_at <= after + 3_600_000);
}

// ── Session layer ──────────────────────────────────────────────────

#[tokio::test]
async fn fresh_session_passes_without_refresh() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let cookie = session_header(SystemClock.now_millis() + 3_600_000);
    let response = get_with_cookie(app(auth(&server)), "/api/me", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_string(response).await, "AT1");
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        "refresh_token=RT1",
        json!({ "access_token": "AT2", "token_type": "Bearer", "expires_in": 3600 }),
    )
    .await;

    let cookie = session_header(SystemClock.now_millis() - 1_000);
    let response = get_with_cookie(app(auth(&server)), "/api/me", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let reissued = set_cookies(&response);
    assert_eq!(reissued.len(), 4);

    let session = codec().decode(&as_request_cookies(&reissued)).unwrap();
    assert_eq!(session.access_token, "AT2");
    assert_eq!(session.refresh_token, "RT1");
    assert_eq!(body_string(response).await, "AT2");
}

#[tokio::test]
async fn refresh_rejection_is_unauthenticated_and_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cookie = session_header(SystemClock.now_millis() - 1_000);
    let response = get_with_cookie(app(auth(&server)), "/api/me", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 4);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    assert!(!body_string(response).await.contains("revoked"));
}

#[tokio::test]
async fn refresh_timeout_is_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "AT2", "expires_in": 3600 }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let cookie = session_header(SystemClock.now_millis() - 1_000);
    let app = app(auth_with_timeout(&server, Duration::from_millis(100)));
    let response = get_with_cookie(app, "/api/me", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn tampered_session_is_unauthenticated() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let cookie = session_header(SystemClock.now_millis() + 3_600_000).replace("AT1", "AT9");
    let response = get_with_cookie(app(auth(&server)), "/api/me", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn missing_and_tampered_look_identical() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let missing = get_with_cookie(app(auth(&server)), "/api/me", None).await;
    let tampered_cookie = session_header(SystemClock.now_millis() + 3_600_000)
        .replace("sp_sig=", "sp_sig=0");
    let tampered = get_with_cookie(app(auth(&server)), "/api/me", Some(&tampered_cookie)).await;

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tampered.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(missing).await, body_string(tampered).await);
}

// ── Tracks ─────────────────────────────────────────────────────────

async fn mount_saved_tracks(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/me/tracks"))
        .and(query_param("limit", "20"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn tracks_returns_saved_tracks() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;
    mount_saved_tracks(
        &server,
        "AT1",
        ResponseTemplate::new(200).set_body_json(json!({ "items": [], "total": 0 })),
    )
    .await;

    let cookie = session_header(SystemClock.now_millis() + 3_600_000);
    let response = get_with_cookie(app(auth(&server)), "/api/tracks", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, json!({ "items": [], "total": 0 }));
}

#[tokio::test]
async fn tracks_after_refresh_reissues_cookies() {
    let server = MockServer::start().await;
    mount_token(
        &server,
        "refresh_token=RT1",
        json!({ "access_token": "AT2", "expires_in": 3600, "refresh_token": "RT2" }),
    )
    .await;
    mount_saved_tracks(
        &server,
        "AT2",
        ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "track": { "id": "t1" } }] })),
    )
    .await;

    let cookie = session_header(SystemClock.now_millis() - 1_000);
    let response = get_with_cookie(app(auth(&server)), "/api/tracks", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let reissued = set_cookies(&response);
    assert_eq!(reissued.len(), 4);
    let session = codec().decode(&as_request_cookies(&reissued)).unwrap();
    assert_eq!(session.access_token, "AT2");
    assert_eq!(session.refresh_token, "RT2");
    assert!(body_string(response).await.contains("t1"));
}

#[tokio::test]
async fn tracks_fetch_failure_is_500() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;
    mount_saved_tracks(&server, "AT1", ResponseTemplate::new(502)).await;

    let cookie = session_header(SystemClock.now_millis() + 3_600_000);
    let response = get_with_cookie(app(auth(&server)), "/api/tracks", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "failed_fetch");
    assert!(body["detail"].as_str().unwrap().contains("502"));
}

#[tokio::test]
async fn tracks_without_session_is_401_json() {
    let server = MockServer::start().await;
    forbid_token_calls(&server).await;

    let response = get_with_cookie(app(auth(&server)), "/api/tracks", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, r#"{"error":"unauthorized"}"#);
}

#[tokio::test]
async fn tracks_refresh_failure_is_401_and_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .expect(1)
        .mount(&server)
        .await;

    let cookie = session_header(SystemClock.now_millis() - 1_000);
    let response = get_with_cookie(app(auth(&server)), "/api/tracks", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(body_string(response).await, r#"{"error":"unauthorized"}"#);
}

// ── Logout ─────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_clears_session_cookies() {
    let server = MockServer::start().await;
    let cookie = session_header(SystemClock.now_millis() + 3_600_000);

    let response = get_with_cookie(app(auth(&server)), "/api/auth/logout", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cleared = set_cookies(&response);
    assert_eq!(cleared.len(), 4);
    for name in ["sp_at=;", "sp_rt=;", "sp_at_exp=;", "sp_sig=;"] {
        assert!(cleared.iter().any(|c| c.starts_with(name)), "{name} not cleared");
    }
    assert!(codec().decode(&as_request_cookies(&cleared)).is_none());
}

// ── Security headers ───────────────────────────────────────────────

#[tokio::test]
async fn security_headers_on_every_response() {
    let server = MockServer::start().await;
    let response = get_with_cookie(app(auth(&server)), "/api/me", None).await;
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(
        headers["strict-transport-security"],
        "max-age=63072000; includeSubDomains; preload"
    );
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .starts_with("default-src 'self'")
    );
}
