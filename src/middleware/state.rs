use std::sync::Arc;

use super::config::AuthSettings;
use crate::api::SpotifyApi;
use crate::oauth::AuthClient;
use crate::refresh::SessionManager;

/// Shared state for the auth routes and the session layer.
///
/// Built once with [`SessionAuthConfig::build`](super::SessionAuthConfig::build);
/// clones share the same HTTP client and signing key.
#[derive(Clone)]
pub struct SessionAuth {
    pub(super) manager: Arc<SessionManager<AuthClient>>,
    pub(super) api: Arc<SpotifyApi>,
    pub(super) settings: Arc<AuthSettings>,
}

impl SessionAuth {
    /// The session manager backing this state.
    #[must_use]
    pub fn manager(&self) -> &SessionManager<AuthClient> {
        &self.manager
    }

    /// The Web API client used by the tracks route.
    #[must_use]
    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }
}
