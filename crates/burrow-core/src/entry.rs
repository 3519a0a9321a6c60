use crate::error::ShortenerError;
use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// Identifier of the user an entry is attributed to.
pub type OwnerId = i64;

/// A key together with the URL it points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyedUrl {
    pub code: ShortCode,
    pub original_url: String,
}

impl KeyedUrl {
    pub fn new(code: ShortCode, original_url: impl Into<String>) -> Self {
        Self {
            code,
            original_url: original_url.into(),
        }
    }
}

/// Outcome of looking a key up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The key maps to a live URL.
    Active(String),
    /// The key existed but was soft-deleted.
    Deleted,
    /// The key is unknown.
    NotFound,
}

impl Resolution {
    /// Turns the lookup into the redirect target, mapping the two
    /// non-redirectable outcomes to [`ShortenerError::NotFound`] and
    /// [`ShortenerError::Gone`].
    pub fn into_url(self, code: &ShortCode) -> Result<String, ShortenerError> {
        match self {
            Self::Active(url) => Ok(url),
            Self::Deleted => Err(ShortenerError::Gone(code.to_string())),
            Self::NotFound => Err(ShortenerError::NotFound(code.to_string())),
        }
    }
}

/// One element of a batch shortening request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One element of a batch shortening response, routed back by correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}

/// A fully-qualified short URL together with its original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUrl {
    pub short_url: String,
    pub original_url: String,
}

/// A unit of work for the deletion worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub owner: OwnerId,
    pub codes: Vec<ShortCode>,
}

/// Aggregate counters, computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub urls: u64,
    pub users: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_into_url() {
        let code = ShortCode::new_unchecked("AB12CD34");

        assert_eq!(
            Resolution::Active("https://example.com/a".into())
                .into_url(&code)
                .unwrap(),
            "https://example.com/a"
        );
        assert!(matches!(
            Resolution::Deleted.into_url(&code),
            Err(ShortenerError::Gone(_))
        ));
        assert!(matches!(
            Resolution::NotFound.into_url(&code),
            Err(ShortenerError::NotFound(_))
        ));
    }
}
