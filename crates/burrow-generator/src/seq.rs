use crate::Generator;
use burrow_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic generator producing `<prefix><counter>` codes.
///
/// The counter is zero-padded so that every code has the same width as
/// the random generator's output when the prefix is a single character
/// (e.g. `T0000000`, `T0000001`). Handy for tests and for reproducing
/// collision scenarios.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
    width: usize,
}

impl SeqGenerator {
    /// Creates a generator with the given prefix, padded to 8 characters total.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator whose counter starts at `offset`.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        let prefix = prefix.into();
        let width = 8usize.saturating_sub(prefix.len()).max(1);
        Self {
            counter: AtomicU64::new(offset),
            prefix,
            width,
        }
    }
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
            width: self.width,
        }
    }
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(format!(
            "{}{:0width$}",
            self.prefix,
            count,
            width = self.width
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequential_codes() {
        let generator = SeqGenerator::with_prefix("T");

        assert_eq!(generator.generate().as_str(), "T0000000");
        assert_eq!(generator.generate().as_str(), "T0000001");
        assert_eq!(generator.generate().as_str(), "T0000002");
    }

    #[test]
    fn starts_from_offset() {
        let generator = SeqGenerator::with_offset("AB", 1000);

        assert_eq!(generator.generate().as_str(), "AB001000");
        assert_eq!(generator.generate().as_str(), "AB001001");
    }

    #[test]
    fn long_prefix_keeps_at_least_one_digit() {
        let generator = SeqGenerator::with_prefix("ABCDEFGHIJ");
        assert_eq!(generator.generate().as_str(), "ABCDEFGHIJ0");
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::with_prefix("T");
        generator.generate();
        generator.generate();

        let cloned = generator.clone();

        assert_eq!(generator.generate().as_str(), "T0000002");
        assert_eq!(cloned.generate().as_str(), "T0000002");
    }
}
