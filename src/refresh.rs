//! Access-token freshness and refresh.
//!
//! Each stale session is refreshed at most once per call, synchronously with
//! the request that found it stale. Concurrent requests holding the same
//! cookies refresh independently; the provider accepts repeated refreshes.

use std::future::Future;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::codec::{SessionCodec, SessionCookies};
use crate::error::Error;
use crate::session::{RefreshedToken, Session, TokenGrant, expires_at};

/// Lookahead before expiry at which a token counts as stale.
pub const DEFAULT_SKEW: Duration = Duration::from_secs(60);

/// Upper bound on a single provider call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

/// The provider's token endpoint.
pub trait TokenEndpoint: Send + Sync + 'static {
    /// Exchange an authorization code for the first token pair.
    fn exchange_code(&self, code: &str) -> impl Future<Output = Result<TokenGrant, Error>> + Send;

    /// Exchange a refresh token for a new access token.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RefreshedToken, Error>> + Send;
}

/// Result of [`SessionManager::ensure_fresh`].
#[derive(Debug, Clone)]
pub struct FreshToken {
    pub access_token: String,
    /// New cookies to attach to the response, set only after a refresh.
    pub reissued: Option<SessionCookies>,
}

/// Ties the codec to the provider: first login and later refreshes.
pub struct SessionManager<P, C = SystemClock> {
    codec: SessionCodec,
    provider: P,
    clock: C,
    skew: Duration,
    refresh_timeout: Duration,
}

impl<P: TokenEndpoint> SessionManager<P> {
    #[must_use]
    pub fn new(codec: SessionCodec, provider: P) -> Self {
        Self::with_clock(codec, provider, SystemClock)
    }
}

impl<P: TokenEndpoint, C: Clock> SessionManager<P, C> {
    #[must_use]
    pub fn with_clock(codec: SessionCodec, provider: P, clock: C) -> Self {
        Self {
            codec,
            provider,
            clock,
            skew: DEFAULT_SKEW,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Verify the request's cookies. `None` means unauthenticated.
    #[must_use]
    pub fn decode(&self, cookie_header: &str) -> Option<Session> {
        self.codec.decode(cookie_header)
    }

    /// Exchange an authorization code and encode the first session.
    ///
    /// # Errors
    ///
    /// Returns the provider error, or [`Error::Timeout`] if the exchange
    /// exceeds the refresh timeout.
    pub async fn login(&self, code: &str) -> Result<(Session, SessionCookies), Error> {
        let grant = self.bounded(self.provider.exchange_code(code)).await?;
        let session = Session::from_grant(grant, self.clock.now_millis());
        let cookies = self.codec.encode(&session);
        Ok((session, cookies))
    }

    /// Return a usable access token, refreshing it first if stale.
    ///
    /// # Errors
    ///
    /// Returns the provider error or [`Error::Timeout`]. No cookies are
    /// reissued on failure; the caller should treat the request as
    /// unauthenticated.
    pub async fn ensure_fresh(&self, session: &Session) -> Result<FreshToken, Error> {
        let now = self.clock.now_millis();
        if session.is_fresh(now, skew_millis(self.skew)) {
            return Ok(FreshToken {
                access_token: session.access_token.clone(),
                reissued: None,
            });
        }

        let refreshed = self
            .bounded(self.provider.refresh(&session.refresh_token))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Token refresh failed"))?;

        let rotated = refreshed.refresh_token.is_some();
        let renewed = Session {
            refresh_token: refreshed
                .refresh_token
                .unwrap_or_else(|| session.refresh_token.clone()),
            expires_at: expires_at(now, refreshed.expires_in),
            access_token: refreshed.access_token,
        };

        tracing::info!(
            expires_at = renewed.expires_at,
            rotated,
            "Access token refreshed"
        );

        Ok(FreshToken {
            reissued: Some(self.codec.encode(&renewed)),
            access_token: renewed.access_token,
        })
    }

    /// Removal directives for all session cookies.
    #[must_use]
    pub fn clear(&self) -> SessionCookies {
        self.codec.clear()
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        tokio::time::timeout(self.refresh_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.refresh_timeout))?
    }
}

fn skew_millis(skew: Duration) -> i64 {
    i64::try_from(skew.as_millis()).unwrap_or(i64::MAX)
}
