pub mod config;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod providers;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use config::Settings;
use error::ConfigError;
use mcp::{HeaderRoleExtractor, RoleExtractor, SessionStore, SharedSessionStore, ToolRegistry};
use providers::{ProviderRegistry, SharedProviderRegistry};

#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<ToolRegistry>,
    pub providers: SharedProviderRegistry,
    pub sessions: SharedSessionStore,
    /// Assigns roles to new sessions; `None` leaves sessions unrestricted
    pub role_extractor: Option<Arc<dyn RoleExtractor>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Empty registries wired from settings; providers still need registering
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let role_extractor = match settings.roles_header.as_deref() {
            Some(name) => {
                let extractor = HeaderRoleExtractor::new(name)
                    .map_err(|_| ConfigError::InvalidRolesHeader(name.to_string()))?;
                Some(Arc::new(extractor) as Arc<dyn RoleExtractor>)
            }
            None => None,
        };

        let tools = Arc::new(ToolRegistry::new());
        Ok(Self {
            providers: Arc::new(ProviderRegistry::new(Arc::clone(&tools))),
            tools,
            sessions: Arc::new(SessionStore::new()),
            role_extractor,
            settings: Arc::new(settings),
        })
    }

    pub fn with_role_extractor(mut self, extractor: Arc<dyn RoleExtractor>) -> Self {
        self.role_extractor = Some(extractor);
        self
    }
}
