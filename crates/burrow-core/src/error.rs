use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors reported by a storage backend.
///
/// Expected conditions (a URL that is already shortened, a key that is
/// already taken) are ordinary variants, not panics. Everything the driver
/// reports beyond those is folded into the remaining variants.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("url is already shortened: {0}")]
    DuplicateUrl(String),
    #[error("short code is already taken: {0}")]
    KeyConflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl StorageError {
    /// Whether the backend could not be reached or did not answer in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Errors surfaced by the shortening service.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The URL was already shortened; `short_url` is the existing link.
    #[error("url is already shortened as {short_url}")]
    DuplicateUrl { short_url: String },
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code was deleted: {0}")]
    Gone(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("could not allocate a free short code after {attempts} attempts")]
    KeyExhausted { attempts: usize },
    #[error("deletion queue is closed")]
    QueueClosed,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ShortenerError {
    /// Whether the error stems from malformed client input.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::InvalidShortCode(_))
    }

    /// Whether the error stems from an unreachable or slow backend.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_unavailable(),
            Self::QueueClosed => true,
            _ => false,
        }
    }
}
