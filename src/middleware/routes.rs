use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::state::SessionAuth;
use crate::csrf;

/// Create the login/callback/logout router.
pub fn auth_routes(auth: SessionAuth) -> Router {
    let auth_path = auth.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/login"), get(login))
        .route(&format!("{auth_path}/callback"), get(callback))
        .route(&format!("{auth_path}/logout"), get(logout).post(logout))
        .with_state(auth)
}

// ── Login ──────────────────────────────────────────────────────────

/// `302 Found` to the provider's authorize page, with the state cookie set.
async fn login(State(auth): State<SessionAuth>, jar: CookieJar) -> (CookieJar, Response) {
    let state = csrf::generate_state();
    let url = auth.manager.provider().authorization_url(&state);
    let cookie = csrf::state_cookie(&state, auth.settings.secure_cookies);

    (jar.add(cookie), (StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback(
    State(auth): State<SessionAuth>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), Response> {
    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "OAuth2 error from provider");
        return Err(login_error(&auth, error));
    }

    let code = params
        .code
        .ok_or_else(|| login_error(&auth, "missing_code"))?;

    // The state is single-use from here on, whatever the outcome.
    let stored_state = jar.get(csrf::STATE_COOKIE_NAME).map(|c| c.value().to_string());
    let jar = jar.add(csrf::clear_state_cookie());

    if csrf::verify_state(stored_state.as_deref(), params.state.as_deref()).is_err() {
        tracing::warn!("OAuth state mismatch");
        return Err((jar, login_error(&auth, "state_mismatch")).into_response());
    }

    let (session, cookies) = match auth.manager.login(&code).await {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            return Err((jar, login_error(&auth, "callback_failed")).into_response());
        }
    };

    let jar = cookies.into_iter().fold(jar, CookieJar::add);

    tracing::info!(expires_at = session.expires_at, "Spotify OAuth2 login successful");

    Ok((
        jar,
        Redirect::to(&auth.settings.redirect_url(&auth.settings.login_redirect)),
    ))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(State(auth): State<SessionAuth>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = auth.manager.clear().into_iter().fold(jar, CookieJar::add);
    (
        jar,
        Redirect::to(&auth.settings.redirect_url(&auth.settings.logout_redirect)),
    )
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(auth: &SessionAuth, code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    let target = auth.settings.redirect_url(&auth.settings.error_redirect);
    Redirect::to(&format!("{target}?error={encoded}")).into_response()
}
