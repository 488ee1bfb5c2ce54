use std::{path::Path, sync::Arc, time::Duration};

use config::{Config, ConfigError, Environment, File};
use lib_email_clients::gmail::LOGIN_SCOPES;
use serde::Deserialize;

use crate::email::{category::KeywordRule, GMAIL_ENDPOINT};

#[derive(Debug, Clone, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl GmailConfig {
    /// Reads the OAuth client from `path` (optional) overlaid with `GOOGLE__*` variables.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("GOOGLE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("redirect_uris")
                    .with_list_parse_key("scopes")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    pub fn redirect_uri(&self) -> Result<&str, ConfigError> {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .ok_or_else(|| ConfigError::NotFound("redirect_uris".to_string()))
    }
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_scopes() -> Vec<String> {
    LOGIN_SCOPES.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_gmail_api_base")]
    pub gmail_api_base: String,
    /// Replaces the built-in keyword heuristics of the classifier when present
    #[serde(default)]
    pub heuristics: Option<Vec<KeywordRule>>,
    #[serde(skip)]
    pub gmail_config: Option<Arc<GmailConfig>>,
}

fn default_port() -> u16 {
    5006
}

fn default_page_size() -> u32 {
    50
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_session_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_gmail_api_base() -> String {
    GMAIL_ENDPOINT.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            page_size: default_page_size(),
            provider_timeout_secs: default_provider_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            secure_cookies: false,
            gmail_api_base: default_gmail_api_base(),
            heuristics: None,
            gmail_config: None,
        }
    }
}

impl ServerConfig {
    /// Loads `config.toml` and `client_secret.toml` from `root`, with `INBOX__*` overrides.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("config");
        let mut server_config: ServerConfig = Config::builder()
            .add_source(File::with_name(&path.to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("INBOX").separator("__"))
            .build()?
            .try_deserialize()?;

        let path = root.join("client_secret");
        server_config.gmail_config = match GmailConfig::from_file(&path.to_string_lossy()) {
            Ok(gmail_config) => Some(Arc::new(gmail_config)),
            Err(e) => {
                tracing::warn!("Google OAuth client not configured, login is disabled: {e}");
                None
            }
        };

        Ok(server_config)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn gmail(&self) -> anyhow::Result<&GmailConfig> {
        self.gmail_config
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Google OAuth client is not configured"))
    }
}

impl std::fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "port: {}, page_size: {}, provider_timeout_secs: {}, gmail_api_base: {}, oauth client: {}",
            self.port,
            self.page_size,
            self.provider_timeout_secs,
            self.gmail_api_base,
            self.gmail_config
                .as_ref()
                .map_or("<missing>", |c| c.client_id.as_str()),
        )
    }
}
