//! Codec errors

use std::path::PathBuf;

/// Errors building patterns or transforming buffers
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Non-empty buffer with no pattern to walk it
    #[error("empty encoding pattern for {data_len} bytes of data")]
    EmptyPattern { data_len: usize },

    /// Keyed algorithm given an empty key
    #[error("algorithm '{algorithm}' requires a non-empty key")]
    EmptyKey { algorithm: &'static str },

    /// Algorithm name not in the registry
    #[error("unknown encoding algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// Pattern key is not valid hex
    #[error("pattern {index}: invalid hex key")]
    InvalidKey {
        index: usize,
        #[source]
        source: hex::FromHexError,
    },

    /// Config file could not be read
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for the schema
    #[error("invalid scramble config: {0}")]
    Config(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("failed to render scramble config: {0}")]
    Render(#[from] toml::ser::Error),
}

impl CodecError {
    /// Check if the error comes from user-supplied configuration
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAlgorithm(_) | Self::InvalidKey { .. } | Self::Config(_) | Self::Io { .. }
        )
    }
}
