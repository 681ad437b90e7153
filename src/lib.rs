#![doc = include_str!("../README.md")]

#[cfg(feature = "oauth")]
pub mod api;
pub mod clock;
pub mod codec;
pub mod csrf;
pub mod error;
#[cfg(feature = "middleware")]
pub mod middleware;
#[cfg(feature = "oauth")]
pub mod oauth;
pub mod policy;
pub mod refresh;
pub mod session;
pub mod signer;

// Re-exports for convenient access
#[cfg(feature = "oauth")]
pub use api::SpotifyApi;
pub use clock::{Clock, SystemClock};
pub use codec::{DecodeError, SessionCodec, SessionCookies};
pub use csrf::generate_state;
pub use error::Error;
#[cfg(feature = "oauth")]
pub use oauth::{AuthClient, OAuthConfig, TokenResponse};
pub use policy::CookiePolicy;
pub use refresh::{FreshToken, SessionManager, TokenEndpoint};
pub use session::{AccessToken, RefreshedToken, Session, TokenGrant};
pub use signer::Signer;
