use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::json;

use super::extractor::{append_cookies, resolve_session};
use super::state::SessionAuth;
use crate::api::SAVED_TRACKS_LIMIT;

/// `GET /api/tracks`: the signed-in user's saved tracks.
///
/// Resolves the session itself instead of sitting behind
/// [`require_session`](super::require_session), so failures answer with JSON:
///
/// - no session, or the refresh failed: `401 {"error":"unauthorized"}`
/// - the Web API call failed: `500 {"error":"failed_fetch","detail":...}`
///
/// Cookies reissued by a refresh are attached to the response either way.
pub fn tracks_routes(auth: SessionAuth) -> Router {
    Router::new()
        .route("/api/tracks", get(saved_tracks))
        .with_state(auth)
}

async fn saved_tracks(State(auth): State<SessionAuth>, headers: HeaderMap) -> Response {
    let fresh = match resolve_session(&*auth.manager, &headers).await {
        Ok(Some(fresh)) => fresh,
        Ok(None) => return unauthorized(),
        Err(e) => {
            tracing::debug!(error = %e, "Clearing session after failed refresh");
            let mut response = unauthorized();
            append_cookies(response.headers_mut(), &auth.manager.clear());
            return response;
        }
    };

    let page = auth
        .api
        .saved_tracks(&fresh.access_token, SAVED_TRACKS_LIMIT)
        .await;
    let mut response = match page {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Fetching saved tracks failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed_fetch", "detail": e.to_string() })),
            )
                .into_response()
        }
    };

    if let Some(cookies) = &fresh.reissued {
        append_cookies(response.headers_mut(), cookies);
    }
    response
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}
