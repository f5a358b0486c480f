//! Attribute kind registry
//!
//! Maps kind names to the Rust type that owns them. Used only to validate
//! attribute attachment: two producers must never use the same kind name
//! for different structures.

use crate::attributes::{AttributeKind, AttributeValue, ResourceAttributes};
use crate::error::ResourceError;
use indexmap::IndexMap;

/// Registered kind entry
#[derive(Debug, Clone)]
pub struct RegisteredKind {
    /// Kind identity
    pub kind: AttributeKind,

    /// Human-readable description of the structure
    pub description: String,
}

/// Registry of known attribute kinds
#[derive(Debug, Default, Clone)]
pub struct AttributeRegistry {
    kinds: IndexMap<&'static str, RegisteredKind>,
}

impl AttributeRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register attribute type `A`
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    /// Returns [`ResourceError::AttributeKindCollision`] if another type
    /// already registered `A::KIND`.
    pub fn register<A: ResourceAttributes>(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ResourceError> {
        let kind = AttributeKind::of::<A>();
        if let Some(existing) = self.kinds.get(kind.name()) {
            return Self::check_same(existing, &kind);
        }

        self.kinds.insert(
            kind.name(),
            RegisteredKind {
                kind,
                description: description.into(),
            },
        );
        Ok(())
    }

    /// Validate a value against the registry
    ///
    /// # Errors
    /// - [`ResourceError::UnregisteredAttributeKind`] for unknown names
    /// - [`ResourceError::AttributeKindCollision`] if the name belongs to a
    ///   different type
    pub fn validate(&self, value: &AttributeValue) -> Result<(), ResourceError> {
        let kind = value.kind();
        let existing = self
            .kinds
            .get(kind.name())
            .ok_or(ResourceError::UnregisteredAttributeKind { kind: kind.name() })?;
        Self::check_same(existing, &kind)
    }

    /// Look up a kind by name
    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RegisteredKind> {
        self.kinds.get(name)
    }

    /// Check if a kind name is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.keys().copied().collect()
    }

    /// Number of registered kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn check_same(existing: &RegisteredKind, kind: &AttributeKind) -> Result<(), ResourceError> {
        if existing.kind == *kind {
            Ok(())
        } else {
            Err(ResourceError::AttributeKindCollision {
                kind: kind.name(),
                registered: existing.kind.type_name(),
                attempted: kind.type_name(),
            })
        }
    }
}
