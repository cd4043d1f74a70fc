//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::avatar::AvatarResolver;
use crate::config::Config;
use crate::ws::HubHandle;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the room's hub.
    pub hub: HubHandle,
    /// Avatar strategy chain, run once per login.
    pub resolver: Arc<AvatarResolver>,
    /// Provider registry and public URL.
    pub config: Arc<Config>,
    /// Directory uploaded avatars are persisted to and served from.
    pub avatar_dir: PathBuf,
    /// HTTP client for the identity exchange.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        hub: HubHandle,
        resolver: AvatarResolver,
        config: Config,
        avatar_dir: PathBuf,
    ) -> Self {
        Self {
            hub,
            resolver: Arc::new(resolver),
            config: Arc::new(config),
            avatar_dir,
            http: reqwest::Client::new(),
        }
    }
}
