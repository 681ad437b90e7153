use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::refresh::TokenEndpoint;
use crate::session::{RefreshedToken, TokenGrant};

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: [&str; 3] = [
    "user-read-private",
    "playlist-read-private",
    "user-library-read",
];

/// Timeout applied to every request made by the default HTTP client.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Spotify `OAuth2` configuration.
///
/// Required fields are constructor parameters, so there are no runtime "missing field" errors.
///
/// ```rust,ignore
/// use spotify_session::OAuthConfig;
///
/// let redirect_uri = "https://my-app.com/api/auth/callback".parse()?;
/// let config = OAuthConfig::new("client-id", "client-secret", redirect_uri);
/// // Optional overrides via chaining:
/// let config = config.with_token_url("http://localhost:9000/api/token".parse()?);
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) http_timeout: Duration,
}

impl OAuthConfig {
    /// Create a new OAuth2 configuration.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_url: "https://accounts.spotify.com/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://accounts.spotify.com/api/token"
                .parse()
                .expect("valid default URL"),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the per-request timeout of the default HTTP client.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Token response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// `OAuth2` client for the provider's authorize and token endpoints.
#[derive(Debug)]
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a client with a bounded-timeout HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorize URL the browser is redirected to.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state);

        url.into()
    }

    /// Post a grant to the token endpoint with HTTP Basic client credentials.
    async fn token_request(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await?;

        let response = ensure_success(response, operation).await?;
        let body = response.text().await?;
        serde_json::from_str::<TokenResponse>(&body).map_err(|e| Error::OAuth {
            operation,
            status: None,
            detail: format!("malformed token response: {e}"),
        })
    }
}

/// Checks HTTP response status; returns the response on success or an error with details.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::OAuth {
        operation,
        status: Some(status),
        detail: body,
    })
}

impl TokenEndpoint for AuthClient {
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::OAuth`] if the
    /// token endpoint returns an error or omits the refresh token.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let token = self.token_request(&params, "token exchange").await?;
        let refresh_token = token.refresh_token.ok_or_else(|| Error::OAuth {
            operation: "token exchange",
            status: None,
            detail: "response has no refresh_token".into(),
        })?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token,
            expires_in: token.expires_in,
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::OAuth`] if the
    /// provider rejects the refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, Error> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let token = self.token_request(&params, "token refresh").await?;
        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}
