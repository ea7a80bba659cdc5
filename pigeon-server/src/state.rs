use crate::config::AppConfig;
use crate::token::TokenIssuer;

pub struct AppState {
    pub issuer: TokenIssuer,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let issuer = TokenIssuer::new(config.credentials, &config.token);
        Self { issuer }
    }

    /// Healthy once the issuer can sign tokens.
    pub async fn health_check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.issuer.has_credentials(),
            "Room service credentials are not configured"
        );
        Ok(())
    }
}
