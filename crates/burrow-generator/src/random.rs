use crate::Generator;
use burrow_core::ShortCode;
use rand::Rng;
use typed_builder::TypedBuilder;

pub const DEFAULT_LENGTH: usize = 8;

/// Characters a code is drawn from. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alphabet(&'static [u8]);

impl Alphabet {
    /// Upper-case letters and digits.
    pub const UPPER_ALPHANUMERIC: Alphabet = Alphabet(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789");

    /// `None` for an empty set of characters.
    pub fn new(chars: &'static [u8]) -> Option<Self> {
        (!chars.is_empty()).then_some(Self(chars))
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::UPPER_ALPHANUMERIC
    }
}

/// Draws every character of the code uniformly from a fixed alphabet.
///
/// With the defaults (8 characters over `[A-Z0-9]`) the key space holds
/// 36^8 ≈ 2.8e12 codes.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RandomGenerator {
    #[builder(default = DEFAULT_LENGTH)]
    length: usize,
    #[builder(default)]
    alphabet: Alphabet,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let mut rng = rand::thread_rng();
        let chars = self.alphabet.0;
        let code: String = (0..self.length)
            .map(|_| chars[rng.gen_range(0..chars.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
