use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::error::AuthError;
use super::state::SessionAuth;
use crate::api::SpotifyApi;
use crate::codec::SessionCodec;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::policy::CookiePolicy;
use crate::refresh::{DEFAULT_REFRESH_TIMEOUT, DEFAULT_SKEW, SessionManager};
use crate::signer::Signer;

/// Route and redirect settings shared by config and runtime state.
#[derive(Debug, Clone)]
pub(crate) struct AuthSettings {
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) base_url: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
    pub(crate) skew: Duration,
    pub(crate) refresh_timeout: Duration,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            secure_cookies: true,
            auth_path: "/api/auth".into(),
            base_url: String::new(),
            login_redirect: "/dashboard".into(),
            logout_redirect: "/".into(),
            error_redirect: "/".into(),
            skew: DEFAULT_SKEW,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Absolute (or root-relative) redirect target for `path`.
    pub(crate) fn redirect_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Session authentication configuration.
///
/// Required values (`OAuthConfig`, `Signer`) are constructor parameters. There
/// is no default signing secret.
///
/// Use [`from_env()`](SessionAuthConfig::from_env) for convention-based setup,
/// or [`new()`](SessionAuthConfig::new) with `with_*` methods for full control.
pub struct SessionAuthConfig {
    pub(super) oauth: OAuthConfig,
    pub(super) signer: Signer,
    pub(super) api_url: Option<Url>,
    pub(super) settings: AuthSettings,
}

impl SessionAuthConfig {
    #[must_use]
    pub fn new(oauth: OAuthConfig, signer: Signer) -> Self {
        Self {
            oauth,
            signer,
            api_url: None,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `SESSION_SECRET`: HMAC key for session cookies
    /// - `SPOTIFY_CLIENT_ID`: OAuth2 client ID
    /// - `SPOTIFY_CLIENT_SECRET`: OAuth2 client secret
    /// - `SPOTIFY_REDIRECT_URI`: OAuth2 callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `SPOTIFY_AUTH_URL`: Override the authorize endpoint
    /// - `SPOTIFY_TOKEN_URL`: Override the token endpoint
    /// - `SPOTIFY_API_URL`: Override the Web API root
    /// - `SPOTIFY_SCOPES`: Comma-separated OAuth2 scopes
    /// - `PUBLIC_BASE_URL`: Prefix for post-login and error redirects
    /// - `LOCAL_DEV`: Set to `"1"` or `"true"` to drop the `Secure` cookie attribute
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs
    /// are invalid. Callers should abort startup on this error.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AuthError::Config(format!("{key} is required")))
        };
        let url = |key: &str, value: String| -> Result<Url, AuthError> {
            value
                .parse()
                .map_err(|e| AuthError::Config(format!("{key}: {e}")))
        };

        let signer = Signer::new(required("SESSION_SECRET")?)?;
        let client_id = required("SPOTIFY_CLIENT_ID")?;
        let client_secret = required("SPOTIFY_CLIENT_SECRET")?;
        let redirect_uri = url("SPOTIFY_REDIRECT_URI", required("SPOTIFY_REDIRECT_URI")?)?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri);

        if let Some(value) = var("SPOTIFY_AUTH_URL") {
            oauth = oauth.with_auth_url(url("SPOTIFY_AUTH_URL", value)?);
        }
        if let Some(value) = var("SPOTIFY_TOKEN_URL") {
            oauth = oauth.with_token_url(url("SPOTIFY_TOKEN_URL", value)?);
        }
        if let Some(scopes) = var("SPOTIFY_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let local_dev = matches!(var("LOCAL_DEV").as_deref(), Some("1") | Some("true"));

        let mut config = Self::new(oauth, signer).with_secure_cookies(!local_dev);
        if let Some(value) = var("SPOTIFY_API_URL") {
            config = config.with_api_url(url("SPOTIFY_API_URL", value)?);
        }
        if let Some(base_url) = var("PUBLIC_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    /// Override the Spotify Web API root used by the tracks route.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    /// Prefix for redirects, e.g. `https://app.example.com`. Trailing `/` is dropped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.settings.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.settings.skew = skew;
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.settings.refresh_timeout = timeout;
        self
    }

    /// Build the shared runtime state for routes and the session layer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if an HTTP client cannot be built.
    pub fn build(self) -> Result<SessionAuth, AuthError> {
        let http_error = |e| AuthError::Config(format!("HTTP client: {e}"));

        let mut api = SpotifyApi::new(self.oauth.http_timeout).map_err(http_error)?;
        if let Some(url) = &self.api_url {
            api = api.with_api_url(url);
        }
        let client = AuthClient::new(self.oauth).map_err(http_error)?;
        let codec = SessionCodec::new(
            self.signer,
            CookiePolicy::new(self.settings.secure_cookies),
        );
        let manager = SessionManager::new(codec, client)
            .with_skew(self.settings.skew)
            .with_refresh_timeout(self.settings.refresh_timeout);

        Ok(SessionAuth {
            manager: Arc::new(manager),
            api: Arc::new(api),
            settings: Arc::new(self.settings),
        })
    }
}
