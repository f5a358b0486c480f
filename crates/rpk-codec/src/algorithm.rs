//! Encoding algorithm trait and built-in algorithms
//!
//! Provides the [`EncodingAlgorithm`] trait for pluggable per-segment
//! transforms, plus the stateless built-ins registered by
//! [`AlgorithmRegistry::with_defaults`](crate::AlgorithmRegistry::with_defaults).

use crate::error::CodecError;

/// Reversible per-segment transform
///
/// # Contract
/// Implementations hold no state between calls: the output depends only on
/// `payload` and `key`, and `decode(encode(p, k), k) == p`. Scrambling only
/// round-trips when `encode` preserves the payload length, because
/// descrambling slices the buffer by the pattern lengths.
pub trait EncodingAlgorithm: Send + Sync + std::fmt::Debug {
    /// Encode one segment
    ///
    /// # Errors
    /// Algorithm-specific; typically [`CodecError::EmptyKey`].
    fn encode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode one segment
    ///
    /// # Errors
    /// Algorithm-specific; typically [`CodecError::EmptyKey`].
    fn decode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Algorithm name (registry key and logs)
    fn name(&self) -> &'static str;
}

fn require_key(key: &[u8], algorithm: &'static str) -> Result<(), CodecError> {
    if key.is_empty() {
        Err(CodecError::EmptyKey { algorithm })
    } else {
        Ok(())
    }
}

/// XOR with a repeating key
#[derive(Debug, Clone, Copy, Default)]
pub struct Xor;

impl Xor {
    fn apply(payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        require_key(key, "xor")?;
        Ok(payload
            .iter()
            .zip(key.iter().cycle())
            .map(|(byte, k)| byte ^ k)
            .collect())
    }
}

impl EncodingAlgorithm for Xor {
    fn encode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Self::apply(payload, key)
    }

    fn decode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Self::apply(payload, key)
    }

    fn name(&self) -> &'static str {
        "xor"
    }
}

/// Pass-through; the key is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl EncodingAlgorithm for Identity {
    fn encode(&self, payload: &[u8], _key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(payload.to_vec())
    }

    fn decode(&self, payload: &[u8], _key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(payload.to_vec())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Bitwise NOT; the key is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl EncodingAlgorithm for Invert {
    fn encode(&self, payload: &[u8], _key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(payload.iter().map(|byte| !byte).collect())
    }

    fn decode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.encode(payload, key)
    }

    fn name(&self) -> &'static str {
        "invert"
    }
}

/// Wrapping byte-wise addition of a repeating key
#[derive(Debug, Clone, Copy, Default)]
pub struct AddKey;

impl EncodingAlgorithm for AddKey {
    fn encode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        require_key(key, "add")?;
        Ok(payload
            .iter()
            .zip(key.iter().cycle())
            .map(|(byte, k)| byte.wrapping_add(*k))
            .collect())
    }

    fn decode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        require_key(key, "add")?;
        Ok(payload
            .iter()
            .zip(key.iter().cycle())
            .map(|(byte, k)| byte.wrapping_sub(*k))
            .collect())
    }

    fn name(&self) -> &'static str {
        "add"
    }
}

/// Byte order reversal within the segment; the key is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct Reverse;

impl EncodingAlgorithm for Reverse {
    fn encode(&self, payload: &[u8], _key: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(payload.iter().rev().copied().collect())
    }

    fn decode(&self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.encode(payload, key)
    }

    fn name(&self) -> &'static str {
        "reverse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_repeats_key() {
        let out = Xor.encode(&[0x00, 0x00, 0x00, 0xFF], &[0x0F, 0xF0]).unwrap();
        assert_eq!(out, vec![0x0F, 0xF0, 0x0F, 0x0F]);
        assert_eq!(Xor.decode(&out, &[0x0F, 0xF0]).unwrap(), vec![0, 0, 0, 0xFF]);
    }

    #[test]
    fn xor_rejects_empty_key() {
        assert!(matches!(
            Xor.encode(b"abc", &[]),
            Err(CodecError::EmptyKey { algorithm: "xor" })
        ));
    }

    #[test]
    fn add_key_wraps() {
        let out = AddKey.encode(&[0xFF, 0x01], &[0x02]).unwrap();
        assert_eq!(out, vec![0x01, 0x03]);
        assert_eq!(AddKey.decode(&out, &[0x02]).unwrap(), vec![0xFF, 0x01]);
    }

    #[test]
    fn keyless_algorithms_ignore_key() {
        assert_eq!(Identity.encode(b"abc", b"zz").unwrap(), b"abc");
        assert_eq!(Invert.encode(&[0x00, 0xF0], &[]).unwrap(), vec![0xFF, 0x0F]);
        assert_eq!(Reverse.encode(b"abc", &[]).unwrap(), b"cba");
    }

    #[test]
    fn algorithm_names() {
        let names: Vec<&str> = [
            &Xor as &dyn EncodingAlgorithm,
            &Identity,
            &Invert,
            &AddKey,
            &Reverse,
        ]
        .iter()
        .map(|algorithm| algorithm.name())
        .collect();
        assert_eq!(names, vec!["xor", "identity", "invert", "add", "reverse"]);
    }
}
