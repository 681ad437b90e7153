//! Keyed integrity tags for session cookies.
//!
//! A tag is the lowercase hex HMAC-SHA256 of the fields joined with `|`,
//! in the order the caller passes them.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

/// Separator placed between fields before hashing.
pub const FIELD_SEPARATOR: &str = "|";

/// Computes and checks session tags with a server-held secret.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    /// Create a signer from the session secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the secret is empty. There is no fallback
    /// secret: an unset secret must stop the process from serving traffic.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let key = secret.into();
        if key.is_empty() {
            return Err(Error::Config("session secret must not be empty".into()));
        }
        Ok(Self { key })
    }

    /// Tag the given fields. Never fails, even for empty fields.
    #[must_use]
    pub fn sign(&self, fields: &[&str]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(fields.join(FIELD_SEPARATOR).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a presented tag against the fields in constant time.
    #[must_use]
    pub fn verify(&self, fields: &[&str], tag: &str) -> bool {
        let expected = self.sign(fields);
        expected.as_bytes().ct_eq(tag.as_bytes()).into()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("key", &"<redacted>").finish()
    }
}
