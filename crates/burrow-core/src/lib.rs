//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the domain types shared by the storage backends,
//! the shortening service and the HTTP gateway, together with the two
//! seams everything else is built around: [`Repository`] (storage) and
//! [`Shortener`] (business operations).

pub mod entry;
pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use entry::{
    BatchItem, BatchResult, DeletionRequest, KeyedUrl, OwnedUrl, OwnerId, Resolution, Stats,
};
pub use error::{ShortenerError, StorageError};
pub use repository::Repository;
pub use shortcode::ShortCode;
pub use shortener::Shortener;
