use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Spotify Web API base URL.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Page size used by the saved-tracks route.
pub const SAVED_TRACKS_LIMIT: u32 = 20;

/// Minimal Spotify Web API client, authenticated per call with a user's
/// access token.
///
/// ```rust,ignore
/// let api = SpotifyApi::new(Duration::from_secs(5))?;
/// let page = api.saved_tracks(token.as_str(), 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SpotifyApi {
    base_url: String,
    http: reqwest::Client,
}

impl SpotifyApi {
    /// Create a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: DEFAULT_API_URL.into(),
            http,
        })
    }

    /// Point the client at another API root (a mock server in tests).
    #[must_use]
    pub fn with_api_url(mut self, url: &Url) -> Self {
        self.base_url = url.as_str().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /me/tracks`: one page of the user's saved tracks, as returned by
    /// Spotify.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or an unreadable body, and
    /// [`Error::Api`] when Spotify answers with a non-success status.
    pub async fn saved_tracks(&self, access_token: &str, limit: u32) -> Result<Value, Error> {
        let response = self
            .http
            .get(format!("{}/me/tracks", self.base_url))
            .bearer_auth(access_token)
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                operation: "saved tracks",
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}
