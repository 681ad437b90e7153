use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The provider answered, but not with a usable token response.
    #[error("OAuth2 {operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    /// A Spotify Web API call was answered with a non-success status.
    #[error("Spotify API {operation} failed (status {status}): {detail}")]
    Api {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[cfg(feature = "oauth")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("OAuth state mismatch")]
    StateMismatch,
}
