use anyhow::Context;
use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const CLIENT_SETTINGS_FILE_NAME: &str = "pigeon.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the token issuer.
    pub token_base_url: String,
    /// Origin used to build shareable invite links.
    pub invite_base_url: String,
    pub token_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_base_url: "http://localhost:3000".to_string(),
            invite_base_url: "http://localhost:3000".to_string(),
            token_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn parse() -> anyhow::Result<Self> {
        Self::parse_with(File::with_name(CLIENT_SETTINGS_FILE_NAME).required(false))
    }

    fn parse_with<S>(file: S) -> anyhow::Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder()
            .add_source(Config::try_from(&ClientConfig::default())?)
            .add_source(file)
            .add_source(Environment::with_prefix("pigeon_client").try_parsing(true))
            .build()
            .context("Failed to build config")?
            .try_deserialize()
            .context("Failed to deserialize config")?;

        config.invite_base_url()?;
        Url::parse(&config.token_base_url).context("Invalid token base URL")?;
        Ok(config)
    }

    pub fn invite_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.invite_base_url).context("Invalid invite base URL")
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }
}
