//! Redirect expansion for shortened reference URLs.

use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use refsense_common::urls::{canonicalize_url, extract_urls};

const EXPAND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct UrlExpander {
    http: reqwest::Client,
}

impl UrlExpander {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXPAND_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    /// Follow redirects and return the final URL. On any failure the input
    /// is returned unchanged.
    pub async fn expand(&self, url: &str) -> String {
        match self.http.get(url).send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                debug!(url, error = %e, "URL expansion failed, keeping original");
                url.to_string()
            }
        }
    }

    /// Redirect expansion followed by canonical-form rules.
    pub async fn normalize_url(&self, url: &str) -> String {
        canonicalize_url(&self.expand(url).await)
    }

    /// Parallel lists of (expanded, original), same length and order, so
    /// callers can substitute original → expanded forms inside the source
    /// text without losing position information.
    pub async fn extract_and_expand_urls(&self, text: &str) -> (Vec<String>, Vec<String>) {
        let original = extract_urls(text);
        let expanded = join_all(original.iter().map(|u| self.normalize_url(u))).await;
        (expanded, original)
    }
}

impl Default for UrlExpander {
    fn default() -> Self {
        Self::new()
    }
}
