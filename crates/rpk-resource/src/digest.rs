//! Content digests for resource data
//!
//! Provides [`DataDigest`], a 32-byte Blake3 hash of a resource's bytes,
//! used to compare buffers cheaply and to identify data in logs.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content digest (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataDigest([u8; 32]);

impl DataDigest {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest of `data`
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for DataDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for DataDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| DigestError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for DataDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for DataDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing digests
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Not hex
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Wrong number of bytes
    #[error("invalid digest length: expected 32, got {0}")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_deterministic() {
        assert_eq!(DataDigest::compute(b"abc"), DataDigest::compute(b"abc"));
        assert_ne!(DataDigest::compute(b"abc"), DataDigest::compute(b"abd"));
    }

    #[test]
    fn digest_short_is_16_chars() {
        assert_eq!(DataDigest::compute(b"x").short().len(), 16);
    }

    #[test]
    fn digest_parse_display() {
        let digest = DataDigest::compute(b"round");
        let parsed: DataDigest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn digest_parse_rejects_short() {
        assert!(matches!(
            "abcd".parse::<DataDigest>(),
            Err(DigestError::InvalidLength(2))
        ));
    }

    #[test]
    fn digest_serde_json() {
        let digest = DataDigest::compute(b"json");
        let json = serde_json::to_string(&digest).unwrap();
        let back: DataDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
