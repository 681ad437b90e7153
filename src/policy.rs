use cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::codec::SessionCookies;

pub const ACCESS_TOKEN_COOKIE: &str = "sp_at";
pub const REFRESH_TOKEN_COOKIE: &str = "sp_rt";
pub const EXPIRES_AT_COOKIE: &str = "sp_at_exp";
pub const SIGNATURE_COOKIE: &str = "sp_sig";

/// The four session cookie names, in the order they are emitted.
pub const SESSION_COOKIE_NAMES: [&str; 4] = [
    ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
    EXPIRES_AT_COOKIE,
    SIGNATURE_COOKIE,
];

/// Nominal lifetime of the access-token cookie.
pub const ACCESS_TOKEN_MAX_AGE: Duration = Duration::hours(1);

/// Lifetime shared by the cookies that must survive a refresh.
pub const SESSION_MAX_AGE: Duration = Duration::days(30);

/// Attributes applied to every session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    /// `secure` should be `false` only for local development over plain HTTP.
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// HttpOnly, SameSite=Lax, Path=/, and Secure when enabled.
    pub(crate) fn cookie(
        &self,
        name: &'static str,
        value: String,
        max_age: Duration,
    ) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// Max-age for the named session cookie.
    #[must_use]
    pub fn max_age_for(name: &str) -> Duration {
        if name == ACCESS_TOKEN_COOKIE {
            ACCESS_TOKEN_MAX_AGE
        } else {
            SESSION_MAX_AGE
        }
    }

    /// Removal directives for all four session cookies.
    ///
    /// Used on logout and on unrecoverable auth failure.
    #[must_use]
    pub fn clear(&self) -> SessionCookies {
        SessionCookies::from_array(SESSION_COOKIE_NAMES.map(|name| {
            let mut cookie = self.cookie(name, String::new(), Duration::ZERO);
            cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
            cookie
        }))
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
