use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub credentials: CredentialsConfig,
    pub token: TokenConfig,
}

impl AppConfig {
    pub fn parse() -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(config_file_path("config.toml")?.as_str()).required(false))
            .add_source(File::with_name("config.toml").required(false))
            .add_source(
                Environment::with_prefix("pigeon")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build config")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize config")?;

        if config.token.ttl_secs == 0 {
            anyhow::bail!("Token TTL must be greater than zero");
        }

        Ok(config)
    }
}

pub fn config_file_path(file_name: impl AsRef<Path>) -> anyhow::Result<String> {
    Ok(Path::new("/etc")
        .join(env!("CARGO_PKG_NAME").to_lowercase())
        .join(file_name)
        .to_str()
        .context("Failed to build config file path")?
        .to_string())
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Credentials of the hosted room service account. Tokens are signed with `api_secret`.
///
/// Missing credentials are not a startup error, every token request fails with a 500 instead.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    pub account_sid: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CredentialsConfig {
    pub fn is_complete(&self) -> bool {
        !self.account_sid.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("account_sid", &self.account_sid)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 14400, // 4 hours
        }
    }
}
