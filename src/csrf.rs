//! OAuth `state` parameter handling for the login callback.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::{Cookie, SameSite};
use rand::Rng;
use subtle::ConstantTimeEq;
use time::Duration;

use crate::error::Error;

pub const STATE_COOKIE_NAME: &str = "sp_state";

/// Lifetime of an unconsumed login attempt.
pub const STATE_MAX_AGE: Duration = Duration::minutes(10);

/// Generates a cryptographically random state parameter for `OAuth2`.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Cookie binding the login attempt to this browser.
#[must_use]
pub fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(STATE_MAX_AGE)
        .build()
}

/// Removal cookie for the state, sent once the callback consumed it.
#[must_use]
pub fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Compare the stored state with the one the provider echoed back.
///
/// # Errors
///
/// Returns [`Error::StateMismatch`] if either side is missing or empty, or
/// they differ.
pub fn verify_state(stored: Option<&str>, received: Option<&str>) -> Result<(), Error> {
    match (stored, received) {
        (Some(stored), Some(received))
            if !stored.is_empty() && bool::from(stored.as_bytes().ct_eq(received.as_bytes())) =>
        {
            Ok(())
        }
        _ => Err(Error::StateMismatch),
    }
}
