//! Wire encoding of a [`Session`] as four signed cookies.
//!
//! The tag covers `(access_token, expires_at, refresh_token)` as one tuple,
//! so values from different sessions cannot be spliced together.

use cookie::Cookie;

use crate::policy::{
    ACCESS_TOKEN_COOKIE, CookiePolicy, EXPIRES_AT_COOKIE, REFRESH_TOKEN_COOKIE, SIGNATURE_COOKIE,
};
use crate::session::Session;
use crate::signer::Signer;

/// Why a cookie header did not yield a session. For logs only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("session cookie `{0}` missing")]
    Missing(&'static str),
    #[error("session signature mismatch")]
    InvalidSignature,
    #[error("session expiry is not an integer")]
    MalformedExpiry,
}

/// A complete set of session cookies, always all four together.
#[derive(Debug, Clone)]
pub struct SessionCookies([Cookie<'static>; 4]);

impl SessionCookies {
    pub(crate) fn from_array(cookies: [Cookie<'static>; 4]) -> Self {
        Self(cookies)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.0.iter()
    }

    /// `Set-Cookie` header values, percent-encoded.
    pub fn header_values(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().map(|c| c.encoded().to_string())
    }

    /// A `Cookie` request header as a browser would send these cookies back.
    #[must_use]
    pub fn to_request_header(&self) -> String {
        self.0
            .iter()
            .map(|c| c.stripped().encoded().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl IntoIterator for SessionCookies {
    type Item = Cookie<'static>;
    type IntoIter = std::array::IntoIter<Cookie<'static>, 4>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Encodes sessions into signed cookies and verifies them on the way back.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    signer: Signer,
    policy: CookiePolicy,
}

impl SessionCodec {
    #[must_use]
    pub fn new(signer: Signer, policy: CookiePolicy) -> Self {
        Self { signer, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// Emit the four signed session cookies.
    #[must_use]
    pub fn encode(&self, session: &Session) -> SessionCookies {
        let expires_at = session.expires_at.to_string();
        let signature = self.signer.sign(&[
            &session.access_token,
            &expires_at,
            &session.refresh_token,
        ]);

        let cookie = |name: &'static str, value: String| {
            self.policy.cookie(name, value, CookiePolicy::max_age_for(name))
        };

        SessionCookies([
            cookie(ACCESS_TOKEN_COOKIE, session.access_token.clone()),
            cookie(REFRESH_TOKEN_COOKIE, session.refresh_token.clone()),
            cookie(EXPIRES_AT_COOKIE, expires_at),
            cookie(SIGNATURE_COOKIE, signature),
        ])
    }

    /// Decode a raw `Cookie` header. Every failure reads as "no session".
    #[must_use]
    pub fn decode(&self, cookie_header: &str) -> Option<Session> {
        match self.try_decode(cookie_header) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(reason = %e, "Session cookies rejected");
                None
            }
        }
    }

    /// Like [`decode`](Self::decode), keeping the reason for logging.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when a cookie is missing or empty, the tag
    /// does not verify, or the expiry is not an integer.
    pub fn try_decode(&self, cookie_header: &str) -> Result<Session, DecodeError> {
        let mut access_token = None;
        let mut refresh_token = None;
        let mut expires_at = None;
        let mut signature = None;

        for cookie in Cookie::split_parse_encoded(cookie_header).flatten() {
            let slot = match cookie.name() {
                ACCESS_TOKEN_COOKIE => &mut access_token,
                REFRESH_TOKEN_COOKIE => &mut refresh_token,
                EXPIRES_AT_COOKIE => &mut expires_at,
                SIGNATURE_COOKIE => &mut signature,
                _ => continue,
            };
            // first occurrence wins
            if slot.is_none() {
                *slot = Some(cookie.value().to_string());
            }
        }

        let access_token = required(access_token, ACCESS_TOKEN_COOKIE)?;
        let refresh_token = required(refresh_token, REFRESH_TOKEN_COOKIE)?;
        let expires_at_raw = required(expires_at, EXPIRES_AT_COOKIE)?;
        let signature = required(signature, SIGNATURE_COOKIE)?;

        if !self
            .signer
            .verify(&[&access_token, &expires_at_raw, &refresh_token], &signature)
        {
            return Err(DecodeError::InvalidSignature);
        }

        let expires_at = expires_at_raw
            .parse::<i64>()
            .map_err(|_| DecodeError::MalformedExpiry)?;

        Ok(Session {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Removal directives for all session cookies.
    #[must_use]
    pub fn clear(&self) -> SessionCookies {
        self.policy.clear()
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, DecodeError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(DecodeError::Missing(name))
}
