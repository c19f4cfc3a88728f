use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::mcp::roles::parse_role_list;
use crate::mcp::sse::DEFAULT_KEEP_ALIVE;

/// Process settings, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub log_level: String,

    pub jira_url: String,
    pub jira_username: String,
    pub jira_api_token: String,

    /// Trusted header carrying the caller's roles at `initialize`
    pub roles_header: Option<String>,
    /// Roles handed to provider initialization at startup; `None` disables gating
    pub provider_roles: Option<Vec<String>>,

    pub sse_keep_alive: Duration,
    /// `None` keeps sessions until they are deleted
    pub session_idle_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            jira_url: String::new(),
            jira_username: String::new(),
            jira_api_token: String::new(),
            roles_header: None,
            provider_roles: None,
            sse_keep_alive: DEFAULT_KEEP_ALIVE,
            session_idle_timeout: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let keep_alive_secs: u64 = env_parse("SSE_KEEP_ALIVE_SECS", defaults.sse_keep_alive.as_secs())?;
        if keep_alive_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SSE_KEEP_ALIVE_SECS",
                value: "0".to_string(),
            });
        }
        let idle_secs: u64 = env_parse("SESSION_IDLE_TIMEOUT_SECS", 0)?;

        Ok(Self {
            host: env_string("HOST", &defaults.host),
            port: env_parse("PORT", defaults.port)?,
            log_level: env_string("LOG_LEVEL", &defaults.log_level).to_ascii_lowercase(),
            jira_url: env_string("JIRA_URL", ""),
            jira_username: env_string("JIRA_USERNAME", ""),
            jira_api_token: env_string("JIRA_API_TOKEN", ""),
            roles_header: env_optional("ROLES_HEADER"),
            provider_roles: env_optional("PROVIDER_ROLES").map(|value| parse_role_list(&value)),
            sse_keep_alive: Duration::from_secs(keep_alive_secs),
            session_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "HOST",
                value: self.host.clone(),
            })?;
        Ok(SocketAddr::from((ip, self.port)))
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!("gl_mcp={0},tower_http={0}", self.log_level)
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
