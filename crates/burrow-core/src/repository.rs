use crate::entry::{KeyedUrl, OwnerId, Resolution, Stats};
use crate::error::Result;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Durable key→URL storage with per-entry ownership and soft deletion.
///
/// Both keys and original URLs are unique within a backend. Implementations
/// report a taken URL as [`StorageError::DuplicateUrl`] and a taken key as
/// [`StorageError::KeyConflict`]; neither is ever a panic.
///
/// [`StorageError::DuplicateUrl`]: crate::StorageError::DuplicateUrl
/// [`StorageError::KeyConflict`]: crate::StorageError::KeyConflict
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a single mapping owned by `owner`.
    async fn add_url(&self, code: &ShortCode, original_url: &str, owner: OwnerId) -> Result<()>;

    /// Inserts every mapping or none of them.
    async fn add_batch(&self, entries: &[KeyedUrl], owner: OwnerId) -> Result<()>;

    /// Looks a key up.
    async fn get_url(&self, code: &ShortCode) -> Result<Resolution>;

    /// Reverse lookup: the key currently assigned to `original_url`.
    async fn get_short_url(&self, original_url: &str) -> Result<Option<ShortCode>>;

    /// Every live entry owned by `owner`, in no particular order.
    async fn get_all_urls(&self, owner: OwnerId) -> Result<Vec<KeyedUrl>>;

    /// Soft-deletes the given keys when they belong to `owner`.
    ///
    /// Keys that are unknown or owned by someone else are skipped. Returns
    /// the number of entries that were marked.
    async fn delete_batch(&self, codes: &[ShortCode], owner: OwnerId) -> Result<u64>;

    /// Number of entries and distinct owners.
    async fn stats(&self) -> Result<Stats>;

    /// Cheap health check of the underlying medium.
    async fn ping(&self) -> Result<()>;
}
