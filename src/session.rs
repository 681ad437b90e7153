use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Credential bundle carried in the signed cookie set.
///
/// Replaced wholesale on refresh, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Long-lived credential used to obtain new access tokens.
    pub refresh_token: String,
    /// Epoch milliseconds after which `access_token` must not be used.
    pub expires_at: i64,
}

impl Session {
    /// Build the first session from an authorization-code grant.
    #[must_use]
    pub fn from_grant(grant: TokenGrant, now_millis: i64) -> Self {
        Self {
            expires_at: expires_at(now_millis, grant.expires_in),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        }
    }

    /// Whether the access token is still usable `skew_millis` from now.
    #[must_use]
    pub fn is_fresh(&self, now_millis: i64, skew_millis: i64) -> bool {
        self.expires_at > now_millis.saturating_add(skew_millis)
    }
}

/// Tokens returned by the provider for an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
}

/// Tokens returned by the provider for a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    /// Set only when the provider rotated the refresh token.
    pub refresh_token: Option<String>,
}

/// Access token handed to request handlers once the session is fresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct AccessToken(pub String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) fn expires_at(now_millis: i64, expires_in_secs: u64) -> i64 {
    let lifetime = i64::try_from(expires_in_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now_millis.saturating_add(lifetime)
}
