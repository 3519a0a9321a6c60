//! Business layer of the Burrow URL shortener.
//!
//! [`ShortenerService`] drives a storage backend through the
//! [`Repository`](burrow_core::Repository) contract. Deletions do not touch
//! the backend on the request path: they are queued and applied one at a
//! time by a [`DeletionWorker`], which stops when the process-wide
//! [`Shutdown`] is triggered.

pub mod service;
pub mod shutdown;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use service::{ShortenerService, MAX_KEY_ATTEMPTS};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use worker::{deletion_queue, DeletionQueue, DeletionReceiver, DeletionWorker};
