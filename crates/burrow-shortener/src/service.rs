use crate::worker::DeletionQueue;
use async_trait::async_trait;
use burrow_core::{
    BatchItem, BatchResult, DeletionRequest, KeyedUrl, OwnedUrl, OwnerId, Repository, Resolution,
    ShortCode, Shortener, ShortenerError, Stats, StorageError,
};
use burrow_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// How many fresh keys are tried before giving up on a taken one.
pub const MAX_KEY_ATTEMPTS: usize = 5;

/// The concrete [`Shortener`].
///
/// Wraps a `Repository` and a `Generator` to handle:
/// - key generation, retried when the backend reports a taken key
/// - duplicate detection, answered with the existing short URL
/// - URL validation before anything reaches storage
/// - fully-qualified short URLs built from the configured base
///
/// Deletions are handed to the [`DeletionQueue`] and never touch the
/// backend on the caller's task.
pub struct ShortenerService<R: ?Sized, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    base_url: String,
    deletions: DeletionQueue,
}

impl<R: ?Sized, G> Clone for ShortenerService<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            base_url: self.base_url.clone(),
            deletions: self.deletions.clone(),
        }
    }
}

impl<R: Repository + ?Sized, G: Generator> ShortenerService<R, G> {
    pub fn new(
        repository: Arc<R>,
        generator: G,
        base_url: impl Into<String>,
        deletions: DeletionQueue,
    ) -> Self {
        Self {
            repository,
            generator: Arc::new(generator),
            base_url: base_url.into(),
            deletions,
        }
    }

    fn generate_code(&self) -> ShortCode {
        self.generator.generate().into()
    }

    fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }

    /// Builds the conflict answer for a URL the backend already knows.
    async fn duplicate(&self, original_url: &str) -> ShortenerError {
        match self.repository.get_short_url(original_url).await {
            Ok(Some(code)) => ShortenerError::DuplicateUrl {
                short_url: self.short_url(&code),
            },
            Ok(None) => ShortenerError::Storage(StorageError::InvalidData(format!(
                "no short code recorded for duplicate url {original_url}"
            ))),
            Err(err) => err.into(),
        }
    }
}

/// Accepts absolute http(s) URLs with a host.
fn validate_url(url: &str) -> Result<(), ShortenerError> {
    if url.is_empty() {
        return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
    }

    let parsed = Url::parse(url).map_err(|e| ShortenerError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL scheme must be http or https: {}",
            parsed.scheme()
        )));
    }
    if !parsed.has_host() {
        return Err(ShortenerError::InvalidUrl(format!("URL has no host: {url}")));
    }

    Ok(())
}

#[async_trait]
impl<R, G> Shortener for ShortenerService<R, G>
where
    R: Repository + ?Sized,
    G: Generator,
{
    async fn shorten(&self, original_url: &str, owner: OwnerId) -> Result<String, ShortenerError> {
        validate_url(original_url)?;

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let code = self.generate_code();

            match self.repository.add_url(&code, original_url, owner).await {
                Ok(()) => {
                    info!(code = %code, owner, "shortened url");
                    return Ok(self.short_url(&code));
                }
                Err(StorageError::KeyConflict(_)) => {
                    warn!(code = %code, attempt, "short code already taken, retrying");
                }
                Err(StorageError::DuplicateUrl(_)) => {
                    debug!(owner, "url is already shortened");
                    return Err(self.duplicate(original_url).await);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::KeyExhausted {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner: OwnerId,
    ) -> Result<Vec<BatchResult>, ShortenerError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        for item in &items {
            validate_url(&item.original_url)?;
        }

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let entries: Vec<KeyedUrl> = items
                .iter()
                .map(|item| KeyedUrl::new(self.generate_code(), item.original_url.clone()))
                .collect();

            match self.repository.add_batch(&entries, owner).await {
                Ok(()) => {
                    info!(count = entries.len(), owner, "shortened url batch");
                    return Ok(items
                        .into_iter()
                        .zip(entries)
                        .map(|(item, entry)| BatchResult {
                            correlation_id: item.correlation_id,
                            short_url: self.short_url(&entry.code),
                        })
                        .collect());
                }
                Err(StorageError::KeyConflict(code)) => {
                    warn!(code = %code, attempt, "short code in batch already taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::KeyExhausted {
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Resolution, ShortenerError> {
        Ok(self.repository.get_url(code).await?)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<OwnedUrl>, ShortenerError> {
        let entries = self.repository.get_all_urls(owner).await?;
        Ok(entries
            .into_iter()
            .map(|entry| OwnedUrl {
                short_url: self.short_url(&entry.code),
                original_url: entry.original_url,
            })
            .collect())
    }

    async fn delete(&self, owner: OwnerId, codes: Vec<String>) -> Result<(), ShortenerError> {
        let codes: Vec<ShortCode> = codes
            .into_iter()
            .filter_map(|raw| match ShortCode::new(raw) {
                Ok(code) => Some(code),
                Err(err) => {
                    debug!(error = %err, "skipping invalid short code in deletion request");
                    None
                }
            })
            .collect();

        if codes.is_empty() {
            return Ok(());
        }

        debug!(owner, count = codes.len(), "queueing deletion request");
        self.deletions.enqueue(DeletionRequest { owner, codes })
    }

    async fn stats(&self) -> Result<Stats, ShortenerError> {
        Ok(self.repository.stats().await?)
    }

    async fn ping(&self) -> Result<(), ShortenerError> {
        Ok(self.repository.ping().await?)
    }
}
