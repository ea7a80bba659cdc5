//! Host surfaces the client runs against: clipboard, navigation context and user-visible
//! acknowledgments.

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use url::Url;

#[async_trait]
pub trait Clipboard: Send + Sync + 'static {
    async fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Current navigation context (the address bar).
pub trait Navigation: Send + Sync + 'static {
    fn current_url(&self) -> Url;
    /// Replaces the current URL without reloading.
    fn replace_url(&self, url: Url);
}

/// Short blocking message shown to the user, e.g. "Call rejected".
pub trait Acknowledger: Send + Sync + 'static {
    fn acknowledge(&self, message: &str);
}

/// Returns the query parameter `name` if present and non-empty.
pub(crate) fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Returns `url` without the query parameters listed in `names`.
pub(crate) fn without_params(url: &Url, names: &[&str]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !names.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
