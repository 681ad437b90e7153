use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the middleware layer.
///
/// Missing, tampered and unrefreshable sessions all surface as
/// [`AuthError::Unauthenticated`]; the reason is only logged.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable session.
    #[error("Not authenticated")]
    Unauthenticated,

    /// OAuth2 flow error (state mismatch, token exchange failure, etc.)
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::OAuth(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::OAuth(other.to_string()),
        }
    }
}
