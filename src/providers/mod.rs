//! Tool providers
//!
//! A provider owns the credentials for one downstream integration and
//! contributes a set of tools once those credentials have been validated.
//! Providers are registered at startup; [`ProviderRegistry::initialize_all`]
//! then loads credentials (behind an optional role gate) and registers the
//! tools of every provider whose credentials are valid.
//!
//! # Lifecycle
//!
//! 1. `register` - provider stored under its name (last one wins)
//! 2. `initialize` - `load_credentials` runs exactly once; on success
//!    `register_tools` runs exactly once
//! 3. `is_available` - cached validity, never re-probed automatically

pub mod jira;

pub use jira::JiraProvider;

use crate::config::Settings;
use crate::mcp::registry::{ToolDefinition, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name, also the prefix of every tool it registers
    fn name(&self) -> &str;

    /// Role a caller needs before this provider is initialized
    fn required_role(&self) -> Option<&str> {
        None
    }

    /// Validates configured credentials, probing the network if needed
    ///
    /// Failures are reported as `false`, never as an error.
    async fn load_credentials(&self) -> bool;

    /// Registers the provider's tools; no I/O
    fn register_tools(&self, registrar: &mut ToolRegistrar<'_>);
}

/// Registration handle that namespaces tool names with the provider name
pub struct ToolRegistrar<'a> {
    provider: &'a str,
    required_role: Option<&'a str>,
    tools: &'a ToolRegistry,
    registered: Vec<String>,
}

impl<'a> ToolRegistrar<'a> {
    pub fn new(provider: &'a str, required_role: Option<&'a str>, tools: &'a ToolRegistry) -> Self {
        Self {
            provider,
            required_role,
            tools,
            registered: Vec::new(),
        }
    }

    /// Registers `<provider>_<name>`
    pub fn register<F, Fut>(&mut self, name: &str, description: &str, input_schema: Value, handler: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        let full_name = format!("{}_{}", self.provider, name);
        let definition = ToolDefinition::new(full_name.clone(), description, input_schema)
            .with_required_role(self.required_role.map(str::to_string));

        self.tools.register_fn(definition, handler);
        self.registered.push(full_name);
    }

    /// Names registered through this handle so far
    pub fn registered(&self) -> &[String] {
        &self.registered
    }
}

/// A provider together with its one-shot credential state
pub struct RegisteredProvider {
    provider: Arc<dyn Provider>,
    credentials: OnceCell<bool>,
}

impl RegisteredProvider {
    fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            credentials: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn required_role(&self) -> Option<&str> {
        self.provider.required_role()
    }

    /// Loads credentials and registers tools on first call; later calls return the cached result
    pub async fn initialize(&self, tools: &ToolRegistry) -> bool {
        *self
            .credentials
            .get_or_init(|| async {
                let valid = self.provider.load_credentials().await;

                if valid {
                    let mut registrar =
                        ToolRegistrar::new(self.name(), self.required_role(), tools);
                    self.provider.register_tools(&mut registrar);
                    tracing::info!(
                        provider = %self.name(),
                        tools = registrar.registered().len(),
                        "Provider initialized successfully"
                    );
                } else {
                    tracing::warn!(provider = %self.name(), "Provider credentials invalid");
                }

                valid
            })
            .await
    }

    /// Whether initialization ran and found valid credentials
    pub fn is_available(&self) -> bool {
        self.credentials.get().copied().unwrap_or(false)
    }

    /// Whether `user_roles` passes this provider's role gate
    ///
    /// `None` means no role list was supplied and nothing is gated.
    pub fn permits(&self, user_roles: Option<&[String]>) -> bool {
        match (self.required_role(), user_roles) {
            (Some(required), Some(roles)) => roles.iter().any(|role| role == required),
            _ => true,
        }
    }
}

/// All providers known to the process, in registration order
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<RegisteredProvider>>>,
    tools: Arc<ToolRegistry>,
}

pub type SharedProviderRegistry = Arc<ProviderRegistry>;

impl ProviderRegistry {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            tools,
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Stores a provider under its name, replacing an earlier one with the same name
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let entry = Arc::new(RegisteredProvider::new(provider));
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(provider = %entry.name(), "Registered provider");
        match providers.iter_mut().find(|p| p.name() == entry.name()) {
            Some(existing) => *existing = entry,
            None => providers.push(entry),
        }
    }

    fn snapshot(&self) -> Vec<Arc<RegisteredProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_provider(&self, name: &str) -> Option<Arc<RegisteredProvider>> {
        self.snapshot().into_iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initializes every provider the supplied roles permit
    ///
    /// A provider that fails its role gate is reported `false` and its
    /// credentials are never loaded.
    pub async fn initialize_all(&self, user_roles: Option<&[String]>) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        for provider in self.snapshot() {
            if !provider.permits(user_roles) {
                tracing::debug!(
                    provider = %provider.name(),
                    required_role = ?provider.required_role(),
                    "Skipping provider without required role"
                );
                results.insert(provider.name().to_string(), false);
                continue;
            }

            let valid = provider.initialize(&self.tools).await;
            results.insert(provider.name().to_string(), valid);
        }

        results
    }

    /// Names of available providers that `user_roles` may use
    pub fn available_providers(&self, user_roles: Option<&[String]>) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter(|p| p.permits(user_roles) && p.is_available())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Current availability per provider, without running initialization
    pub fn check_all_credentials(&self) -> BTreeMap<String, bool> {
        self.snapshot()
            .iter()
            .map(|p| (p.name().to_string(), p.is_available()))
            .collect()
    }
}

/// Registers every built-in provider
pub fn register_all_providers(registry: &ProviderRegistry, settings: &Settings) {
    registry.register(Arc::new(JiraProvider::from_settings(settings)));
}
