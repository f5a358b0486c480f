//! Scramble configuration
//!
//! TOML description of a pattern list:
//!
//! ```toml
//! [[patterns]]
//! algorithm = "xor"
//! key = "a5"
//! length = 4
//!
//! [[patterns]]
//! algorithm = "identity"
//! length = 0
//! ```

use crate::error::CodecError;
use crate::pattern::EncodingPattern;
use crate::registry::AlgorithmRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One pattern step as written in config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Registered algorithm name
    pub algorithm: String,

    /// Key material as hex
    #[serde(default)]
    pub key: String,

    /// Segment length, 0 for the rest of the buffer
    #[serde(default)]
    pub length: usize,
}

impl PatternSpec {
    /// Create a spec from raw key bytes
    #[must_use]
    pub fn new(algorithm: impl Into<String>, key: &[u8], length: usize) -> Self {
        Self {
            algorithm: algorithm.into(),
            key: hex::encode(key),
            length,
        }
    }
}

impl From<&EncodingPattern> for PatternSpec {
    fn from(pattern: &EncodingPattern) -> Self {
        Self::new(pattern.algorithm().name(), pattern.key(), pattern.length())
    }
}

/// Scramble pattern configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrambleConfig {
    /// Ordered pattern steps, cycled over the buffer
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

impl ScrambleConfig {
    /// Create empty configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an additional pattern step
    #[inline]
    #[must_use]
    pub fn with_pattern(mut self, spec: PatternSpec) -> Self {
        self.patterns.push(spec);
        self
    }

    /// Describe an existing pattern list
    #[must_use]
    pub fn from_patterns(patterns: &[EncodingPattern]) -> Self {
        Self {
            patterns: patterns.iter().map(PatternSpec::from).collect(),
        }
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`CodecError::Config`] for malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, CodecError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`CodecError::Io`] or [`CodecError::Config`].
    pub fn load(path: &Path) -> Result<Self, CodecError> {
        let text = std::fs::read_to_string(path).map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML text
    ///
    /// # Errors
    /// Returns [`CodecError::Render`].
    pub fn to_toml_string(&self) -> Result<String, CodecError> {
        Ok(toml::to_string(self)?)
    }

    /// Resolve into concrete patterns
    ///
    /// # Errors
    /// [`CodecError::UnknownAlgorithm`] or [`CodecError::InvalidKey`].
    pub fn build(&self, registry: &AlgorithmRegistry) -> Result<Vec<EncodingPattern>, CodecError> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let algorithm = registry.resolve(&spec.algorithm)?;
                let key = hex::decode(&spec.key)
                    .map_err(|source| CodecError::InvalidKey { index, source })?;
                Ok(EncodingPattern::new(algorithm, key, spec.length))
            })
            .collect()
    }
}
