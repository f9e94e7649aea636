//! Bibliographic metadata resolution.
//!
//! References that are themselves social-media posts are synthesized locally;
//! everything else goes through the Citoid REST lookup. A failed lookup
//! degrades to an error-flagged record and never aborts the batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use refsense_common::types::ReferenceMetadata;
use refsense_common::urls::is_social_post_url;

/// Max concurrent metadata lookups. Citoid is slow; the bound keeps a large
/// thread from opening dozens of connections at once.
const MAX_CONCURRENT_LOOKUPS: usize = 10;

const FETCH_MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Exponential backoff: 1s, 2s, 4s, 8s, capped at 10s.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let delay = BACKOFF_BASE * 2u32.saturating_pow(attempt);
    delay.min(BACKOFF_CAP)
}

// --- MetadataFetcher trait ---

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ReferenceMetadata>;
}

// --- Citoid REST client ---

pub struct CitoidClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Semaphore,
}

impl CitoidClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            semaphore: Semaphore::new(MAX_CONCURRENT_LOOKUPS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CitoidRecord {
    #[serde(default, rename = "itemType")]
    item_type: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "abstractNote")]
    abstract_note: String,
}

#[async_trait]
impl MetadataFetcher for CitoidClient {
    async fn fetch(&self, url: &str) -> Result<ReferenceMetadata> {
        let _permit = self.semaphore.acquire().await?;

        let endpoint = format!("{}/mediawiki/{}", self.base_url, urlencoding::encode(url));
        debug!(url, "Citoid lookup");

        let response = self.http.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Citoid error ({}) for {}", response.status(), url));
        }

        let records: Vec<CitoidRecord> = response.json().await?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Citoid returned no records for {}", url))?;

        Ok(ReferenceMetadata {
            item_type: record.item_type,
            title: record.title,
            summary: record.abstract_note,
            ..Default::default()
        })
    }
}

// --- Resolver ---

/// Resolves a set of reference URLs to metadata records, concurrently.
pub struct MetadataResolver {
    fetcher: Arc<dyn MetadataFetcher>,
    max_summary_len: i64,
    max_attempts: u32,
}

impl MetadataResolver {
    pub fn new(fetcher: Arc<dyn MetadataFetcher>, max_summary_len: i64) -> Self {
        Self {
            fetcher,
            max_summary_len,
            max_attempts: FETCH_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Resolve every URL to a record. The map always holds an entry per
    /// input URL; lookup failures are recorded in that entry's debug field.
    pub async fn resolve(&self, urls: &[String]) -> HashMap<String, ReferenceMetadata> {
        stream::iter(
            urls.iter()
                .map(|url| async move { (url.clone(), self.resolve_one(url).await) }),
        )
        .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await
    }

    async fn resolve_one(&self, url: &str) -> ReferenceMetadata {
        if is_social_post_url(url) {
            return ReferenceMetadata::forum_post(url);
        }

        let mut last_error = String::new();
        for attempt in 0..self.max_attempts {
            match self.fetcher.fetch(url).await {
                Ok(mut meta) => {
                    meta.truncate_summary(self.max_summary_len);
                    return meta;
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < self.max_attempts {
                        let backoff = backoff_delay(attempt);
                        warn!(
                            url,
                            attempt = attempt + 1,
                            backoff_secs = backoff.as_secs(),
                            error = %e,
                            "Metadata fetch failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        warn!(url, error = %last_error, "Metadata fetch exhausted retries");
        ReferenceMetadata::from_error(format!(
            "metadata fetch failed after {} attempts: {last_error}",
            self.max_attempts
        ))
    }
}
