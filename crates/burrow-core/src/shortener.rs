use crate::entry::{BatchItem, BatchResult, OwnedUrl, OwnerId, Resolution, Stats};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Transport-agnostic operations of the URL shortener.
///
/// The HTTP layer only ever talks to this trait.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `original_url` on behalf of `owner` and returns the full short URL.
    ///
    /// A URL that is already shortened yields
    /// [`ShortenerError::DuplicateUrl`](crate::ShortenerError::DuplicateUrl),
    /// which carries the existing short URL.
    async fn shorten(&self, original_url: &str, owner: OwnerId) -> Result<String>;

    /// Shortens every item or none of them.
    async fn shorten_batch(&self, items: Vec<BatchItem>, owner: OwnerId)
        -> Result<Vec<BatchResult>>;

    /// Resolves a short code.
    async fn resolve(&self, code: &ShortCode) -> Result<Resolution>;

    /// Lists the URLs shortened by `owner`.
    async fn list(&self, owner: OwnerId) -> Result<Vec<OwnedUrl>>;

    /// Schedules the given codes for soft deletion and returns immediately.
    ///
    /// `Ok` means the request was accepted, not that it was applied.
    async fn delete(&self, owner: OwnerId, codes: Vec<String>) -> Result<()>;

    /// Aggregate counters.
    async fn stats(&self) -> Result<Stats>;

    /// Health of the storage backend.
    async fn ping(&self) -> Result<()>;
}
