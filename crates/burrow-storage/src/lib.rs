//! Storage backends for the Burrow URL shortener.
//!
//! Two interchangeable implementations of [`Repository`]:
//!
//! - [`FileRepository`]: an in-memory map backed by an append-only
//!   JSON-lines log, replayed on startup. Used for development and as the
//!   fallback when no database is reachable.
//! - [`PostgresRepository`]: rows in a `shorturl` table, one short
//!   transaction per write.

pub mod file;
pub mod postgres;

pub use burrow_core::repository::Repository;
pub use burrow_core::StorageError;
pub use file::FileRepository;
pub use postgres::PostgresRepository;
