use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deployment mode. `production` hides error details and switches logs to JSON.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Provider property (tenant) identifier.
    #[serde(default)]
    pub property_id: Option<String>,
    /// Service account identity used to authenticate against the provider.
    #[serde(default)]
    pub client_email: Option<String>,
    /// Service account secret. Literal `\n` escapes are accepted.
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Base URL of the provider's reporting API.
    #[serde(default = "default_provider_endpoint")]
    pub provider_endpoint: String,
    /// Hard upper bound for a single provider call, in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    /// Origins allowed to call the API from a browser. Empty allows any origin.
    #[serde(default)]
    pub dashboard_origins: Vec<String>,
    /// Graceful shutdown timeout in seconds (default: 30).
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3001
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_provider_endpoint() -> String {
    "https://analyticsdata.googleapis.com/v1beta".to_string()
}

const fn default_provider_timeout_secs() -> u64 {
    30
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            property_id: None,
            client_email: None,
            private_key: None,
            project_id: None,
            provider_endpoint: default_provider_endpoint(),
            provider_timeout_secs: default_provider_timeout_secs(),
            dashboard_origins: Vec::new(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// The complete credential set required to reach the provider.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub property_id: String,
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("property_id", &self.property_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Redacted view of the configuration reported by the health endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSummary {
    pub mode: String,
    pub port: u16,
    pub has_property_id: bool,
    pub has_credentials: bool,
    pub property_id: String,
    pub project_id: String,
    pub client_email: String,
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `RELAY_HOST` → host
    /// - `RELAY_PORT` → port
    /// - `RELAY_ENV` → environment
    /// - `RELAY_PROPERTY_ID` → property_id
    /// - `RELAY_CLIENT_EMAIL` → client_email
    /// - `RELAY_PRIVATE_KEY` → private_key
    /// - `RELAY_PROJECT_ID` → project_id
    /// - `RELAY_PROVIDER_ENDPOINT` → provider_endpoint
    /// - `RELAY_PROVIDER_TIMEOUT` → provider_timeout_secs
    /// - `RELAY_DASHBOARD_ORIGINS` → dashboard_origins (comma separated)
    /// - `RELAY_SHUTDOWN_TIMEOUT` → shutdown_timeout_secs
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(host) = std::env::var("RELAY_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(env) = std::env::var("RELAY_ENV") {
            config.environment = env;
        }
        if let Ok(val) = std::env::var("RELAY_PROPERTY_ID") {
            config.property_id = Some(val);
        }
        if let Ok(val) = std::env::var("RELAY_CLIENT_EMAIL") {
            config.client_email = Some(val);
        }
        if let Ok(val) = std::env::var("RELAY_PRIVATE_KEY") {
            config.private_key = Some(val);
        }
        if let Ok(val) = std::env::var("RELAY_PROJECT_ID") {
            config.project_id = Some(val);
        }
        if let Ok(val) = std::env::var("RELAY_PROVIDER_ENDPOINT") {
            config.provider_endpoint = val;
        }
        if let Ok(val) = std::env::var("RELAY_PROVIDER_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.provider_timeout_secs = t;
            }
        }
        if let Ok(val) = std::env::var("RELAY_DASHBOARD_ORIGINS") {
            config.dashboard_origins = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(val) = std::env::var("RELAY_SHUTDOWN_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.shutdown_timeout_secs = t;
            }
        }

        config
    }

    /// Returns `true` when running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Returns the provider credentials, or `None` if any one setting is
    /// missing or blank. A `None` here disables the provider path entirely.
    pub fn provider_credentials(&self) -> Option<ProviderCredentials> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Some(ProviderCredentials {
            property_id: present(&self.property_id)?,
            client_email: present(&self.client_email)?,
            private_key: normalize_private_key(&present(&self.private_key)?),
            project_id: present(&self.project_id)?,
        })
    }

    /// Build the redacted summary exposed by `/health`.
    pub fn environment_summary(&self) -> EnvironmentSummary {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        EnvironmentSummary {
            mode: self.environment.clone(),
            port: self.port,
            has_property_id: set(&self.property_id),
            has_credentials: set(&self.client_email) && set(&self.private_key),
            property_id: self
                .property_id
                .clone()
                .unwrap_or_else(|| "Not set".to_string()),
            project_id: self
                .project_id
                .clone()
                .unwrap_or_else(|| "Not set".to_string()),
            client_email: if set(&self.client_email) {
                "Set".to_string()
            } else {
                "Not set".to_string()
            },
        }
    }
}

/// Turn escaped `\n` sequences (common when a PEM key is pasted into an
/// environment variable) into real newlines.
fn normalize_private_key(raw: &str) -> String {
    if raw.contains("\\n") {
        raw.replace("\\n", "\n")
    } else {
        raw.to_string()
    }
}
