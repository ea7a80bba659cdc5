use crate::error::CallError;
use crate::token::TokenSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use pigeon_protocol::http::token::TokenRequest;
use std::time::Duration;

/// Scriptable [`TokenSource`] recording every request it receives.
#[derive(Debug)]
pub struct MockTokenSource {
    result: Result<String, CallError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<TokenRequest>>,
}

impl MockTokenSource {
    pub fn ok(token: impl Into<String>) -> Self {
        Self {
            result: Ok(token.into()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(CallError::TokenAcquisition(message.into())),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delays every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TokenSource for MockTokenSource {
    async fn fetch_token(&self, request: &TokenRequest) -> Result<String, CallError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
