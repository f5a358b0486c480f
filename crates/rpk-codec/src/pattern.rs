//! Encoding patterns

use crate::algorithm::EncodingAlgorithm;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// One step of a scramble pattern: run `algorithm` with `key` over the next
/// `length` bytes
///
/// A length of 0 is terminal: the step consumes the rest of the buffer.
#[derive(Clone)]
pub struct EncodingPattern {
    algorithm: Arc<dyn EncodingAlgorithm>,
    key: Vec<u8>,
    length: usize,
}

impl EncodingPattern {
    /// Create a pattern step
    #[must_use]
    pub fn new(algorithm: Arc<dyn EncodingAlgorithm>, key: impl Into<Vec<u8>>, length: usize) -> Self {
        Self {
            algorithm,
            key: key.into(),
            length,
        }
    }

    /// Step over the rest of the buffer
    #[must_use]
    pub fn terminal(algorithm: Arc<dyn EncodingAlgorithm>, key: impl Into<Vec<u8>>) -> Self {
        Self::new(algorithm, key, 0)
    }

    /// Algorithm applied by this step
    #[inline]
    #[must_use]
    pub fn algorithm(&self) -> &dyn EncodingAlgorithm {
        self.algorithm.as_ref()
    }

    /// Key material
    #[inline]
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Segment length, 0 for the rest of the buffer
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Check if this step consumes the rest of the buffer
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.length == 0
    }

    /// Bytes this step takes when `remaining` bytes are left
    #[inline]
    #[must_use]
    pub fn take(&self, remaining: usize) -> usize {
        if self.is_terminal() {
            remaining
        } else {
            self.length.min(remaining)
        }
    }
}

impl Debug for EncodingPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingPattern")
            .field("algorithm", &self.algorithm.name())
            .field("key", &hex::encode(&self.key))
            .field("length", &self.length)
            .finish()
    }
}

impl PartialEq for EncodingPattern {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm.name() == other.algorithm.name()
            && self.key == other.key
            && self.length == other.length
    }
}

impl Eq for EncodingPattern {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{Identity, Xor};

    #[test]
    fn pattern_take() {
        let fixed = EncodingPattern::new(Arc::new(Xor), vec![1], 4);
        assert_eq!(fixed.take(10), 4);
        assert_eq!(fixed.take(3), 3);

        let rest = EncodingPattern::terminal(Arc::new(Identity), Vec::new());
        assert!(rest.is_terminal());
        assert_eq!(rest.take(10), 10);
    }

    #[test]
    fn pattern_equality_by_name_key_length() {
        let a = EncodingPattern::new(Arc::new(Xor), vec![0xAA], 2);
        let b = EncodingPattern::new(Arc::new(Xor), vec![0xAA], 2);
        let c = EncodingPattern::new(Arc::new(Identity), vec![0xAA], 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pattern_debug_shows_hex_key() {
        let pattern = EncodingPattern::new(Arc::new(Xor), vec![0xDE, 0xAD], 8);
        let debug = format!("{pattern:?}");
        assert!(debug.contains("\"xor\""));
        assert!(debug.contains("dead"));
    }
}
