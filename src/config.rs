use serde::Deserialize;
use std::path::Path;
use config::{Config, ConfigError};
use tracing::debug;

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://placehold.co/100x100/A0A0A0/FFFFFF?text=Vendor";
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where vendor documents come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Firestore,
    /// Serve the built-in seed roster from memory.
    Static,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default)]
    pub initial_auth_token: Option<String>,
    pub backend: Backend,
    pub firebase: FirebaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_url: String,
    pub firestore_url: String,
    pub poll_interval_ms: u64,
    #[serde(default = "default_emulation")]
    pub emulation: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    pub bucket: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RosterConfig {
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,
    /// How long the view waits for sign-in before subscribing anyway.
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            placeholder_url: default_placeholder_url(),
            auth_timeout_ms: default_auth_timeout_ms(),
        }
    }
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_placeholder_url() -> String {
    DEFAULT_PLACEHOLDER_URL.to_string()
}

fn default_emulation() -> String {
    "chrome".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_auth_timeout_ms() -> u64 {
    DEFAULT_AUTH_TIMEOUT_MS
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("config/default")
    }

    /// Loads `path` (any format the `config` crate knows, extension optional)
    /// and layers `APP_*` environment variables on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let name = path.as_ref().to_string_lossy().to_string();
        let builder = Config::builder()
            .add_source(config::File::with_name(&name))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            app_id = %settings.app_id,
            backend = ?settings.backend,
            has_auth_token = settings.initial_auth_token.is_some(),
            "Loaded settings"
        );

        Ok(settings)
    }
}
