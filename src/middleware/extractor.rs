use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::AuthError;
use super::state::SessionAuth;
use crate::clock::Clock;
use crate::codec::SessionCookies;
use crate::error::Error;
use crate::refresh::{FreshToken, SessionManager, TokenEndpoint};
use crate::session::AccessToken;

/// Resolve the request's session into a usable access token.
///
/// - `Ok(None)`: no valid session (missing or tampered cookies).
/// - `Ok(Some(_))`: usable token, with reissued cookies if it was refreshed.
/// - `Err(_)`: the session was stale and the refresh failed.
///
/// # Errors
///
/// Returns the provider error from a failed refresh.
pub async fn resolve_session<P: TokenEndpoint, C: Clock>(
    manager: &SessionManager<P, C>,
    headers: &HeaderMap,
) -> Result<Option<FreshToken>, Error> {
    let cookie_header = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let Some(session) = manager.decode(&cookie_header) else {
        return Ok(None);
    };

    manager.ensure_fresh(&session).await.map(Some)
}

/// Axum middleware requiring a valid, fresh session.
///
/// Inserts [`AccessToken`] into request extensions and attaches refreshed
/// cookies to the response. A failed refresh answers `401` and clears the
/// session cookies, so the dead refresh token is not tried again.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/api/tracks", get(tracks))
///     .layer(axum::middleware::from_fn_with_state(auth.clone(), require_session));
/// ```
pub async fn require_session(
    State(auth): State<SessionAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let fresh = match resolve_session(&*auth.manager, &headers).await {
        Ok(Some(fresh)) => fresh,
        Ok(None) => return AuthError::Unauthenticated.into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Clearing session after failed refresh");
            let mut response = AuthError::Unauthenticated.into_response();
            append_cookies(response.headers_mut(), &auth.manager.clear());
            return response;
        }
    };

    request
        .extensions_mut()
        .insert(AccessToken::from(fresh.access_token));

    let mut response = next.run(request).await;
    if let Some(cookies) = &fresh.reissued {
        append_cookies(response.headers_mut(), cookies);
    }
    response
}

/// Append `Set-Cookie` headers for the whole set.
pub fn append_cookies(headers: &mut HeaderMap, cookies: &SessionCookies) {
    for value in cookies.header_values() {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.append(SET_COOKIE, value);
        }
    }
}

/// Access token placed by [`require_session`].
///
/// Use as an Axum extractor behind the session layer. Returns
/// `401 Unauthorized` if the layer did not run.
///
/// ```rust,ignore
/// async fn tracks(State(auth): State<SessionAuth>, token: AccessToken) -> impl IntoResponse {
///     auth.api().saved_tracks(token.as_str(), 20).await.map(Json).map_err(AuthError::from)
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn home(token: Option<AccessToken>) -> impl IntoResponse { /* ... */ }
/// ```
impl<S: Send + Sync> FromRequestParts<S> for AccessToken {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessToken>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for AccessToken {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AccessToken>().cloned())
    }
}
