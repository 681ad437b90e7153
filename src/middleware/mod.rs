//! Plug-and-play Spotify login for Axum.
//!
//! Mounts the login/callback/logout routes, a saved-tracks API route, and a layer that turns the signed
//! session cookies into an [`AccessToken`](crate::AccessToken) for handlers,
//! refreshing it when it is about to expire.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use spotify_session::middleware::{SessionAuthConfig, auth_routes, require_session};
//!
//! // 1. Configure from environment (fails without SESSION_SECRET)
//! let auth = SessionAuthConfig::from_env()?.build()?;
//!
//! // 2. Protect API routes and mount auth routes
//! let app = axum::Router::new()
//!     .route("/api/tracks", get(tracks))
//!     .layer(axum::middleware::from_fn_with_state(auth.clone(), require_session))
//!     .merge(auth_routes(auth));
//! ```

mod config;
mod error;
mod extractor;
mod headers;
mod routes;
mod state;
mod tracks;

pub use config::SessionAuthConfig;
pub use error::AuthError;
pub use extractor::{append_cookies, require_session, resolve_session};
pub use headers::security_headers;
pub use routes::auth_routes;
pub use state::SessionAuth;
pub use tracks::tracks_routes;
