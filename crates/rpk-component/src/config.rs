//! Pipeline configuration

use crate::error::ComponentError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pass pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deepest level a recursive pass descends to (root is depth 0)
    pub max_depth: usize,
    /// Run sibling subtrees concurrently
    pub concurrent_siblings: bool,
    /// Abort the pass on the first component failure
    pub fail_fast: bool,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max recursion depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// With sibling concurrency on or off
    #[inline]
    #[must_use]
    pub fn with_concurrent_siblings(mut self, concurrent: bool) -> Self {
        self.concurrent_siblings = concurrent;
        self
    }

    /// With fail-fast on or off
    #[inline]
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns [`ComponentError::Config`].
    pub fn from_toml_str(text: &str) -> Result<Self, ComponentError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`ComponentError::Io`] or [`ComponentError::Config`].
    pub fn load(path: &Path) -> Result<Self, ComponentError> {
        let text = std::fs::read_to_string(path).map_err(|source| ComponentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            concurrent_siblings: true,
            fail_fast: true,
        }
    }
}
