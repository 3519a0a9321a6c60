pub mod random;
pub mod seq;

pub use random::{Alphabet, RandomGenerator};
pub use seq::SeqGenerator;

use burrow_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage:
/// they never check whether a code is already taken. Collisions are
/// detected by the backend and retried by the shortening service.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
