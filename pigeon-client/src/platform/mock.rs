use crate::platform::{Acknowledger, Clipboard, Navigation};
use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

#[derive(Debug, Default)]
pub struct MockClipboard {
    pub contents: Mutex<Option<String>>,
    pub fail: bool,
}

impl MockClipboard {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl Clipboard for MockClipboard {
    async fn write_text(&self, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("Clipboard access denied");
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockNavigation {
    url: Mutex<Url>,
}

impl MockNavigation {
    pub fn new(url: &str) -> Self {
        Self {
            url: Mutex::new(Url::parse(url).expect("valid test url")),
        }
    }
}

impl Navigation for MockNavigation {
    fn current_url(&self) -> Url {
        self.url.lock().clone()
    }

    fn replace_url(&self, url: Url) {
        *self.url.lock() = url;
    }
}

#[derive(Debug, Default)]
pub struct MockAcknowledger {
    messages: Mutex<Vec<String>>,
}

impl MockAcknowledger {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Acknowledger for MockAcknowledger {
    fn acknowledge(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
