//! Algorithm registry
//!
//! Provides [`AlgorithmRegistry`] for resolving algorithm names in scramble
//! configs to shared algorithm instances.

use crate::algorithm::{AddKey, EncodingAlgorithm, Identity, Invert, Reverse, Xor};
use crate::error::CodecError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of encoding algorithms by name
#[derive(Debug, Default, Clone)]
pub struct AlgorithmRegistry {
    algorithms: BTreeMap<&'static str, Arc<dyn EncodingAlgorithm>>,
}

impl AlgorithmRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with built-in algorithms
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Xor));
        registry.register(Arc::new(Identity));
        registry.register(Arc::new(Invert));
        registry.register(Arc::new(AddKey));
        registry.register(Arc::new(Reverse));
        registry
    }

    /// Register an algorithm under its own name, replacing any previous one
    pub fn register(&mut self, algorithm: Arc<dyn EncodingAlgorithm>) {
        self.algorithms.insert(algorithm.name(), algorithm);
    }

    /// Look up an algorithm
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn EncodingAlgorithm>> {
        self.algorithms.get(name).cloned()
    }

    /// Look up an algorithm, failing on unknown names
    ///
    /// # Errors
    /// Returns [`CodecError::UnknownAlgorithm`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn EncodingAlgorithm>, CodecError> {
        self.get(name)
            .ok_or_else(|| CodecError::UnknownAlgorithm(name.to_string()))
    }

    /// Check if algorithm exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Remove algorithm
    #[inline]
    pub fn remove(&mut self, name: &str) -> bool {
        self.algorithms.remove(name).is_some()
    }

    /// Registered names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.algorithms.keys().copied().collect()
    }

    /// Get number of registered algorithms
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}
