//! Typed attribute store
//!
//! Attributes are structured parameters attached to a resource, keyed by
//! kind. An unpacker records what it learned while decoding (for example
//! the scramble pattern) so the matching packer can re-encode later.

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Trait for attribute types
///
/// The Rust type is the kind identity; `KIND` is its stable, human-readable
/// name, used in errors, logs and by the [`AttributeRegistry`](crate::AttributeRegistry).
///
/// # Example
/// ```rust
/// use rpk_resource::ResourceAttributes;
///
/// #[derive(Debug, Clone)]
/// struct HeaderAttributes {
///     magic: u32,
/// }
///
/// impl ResourceAttributes for HeaderAttributes {
///     const KIND: &'static str = "HeaderAttributes";
/// }
/// ```
pub trait ResourceAttributes: Any + Debug + Send + Sync {
    /// Kind name, unique across the process
    const KIND: &'static str;
}

/// Identity of an attribute kind
#[derive(Debug, Clone, Copy)]
pub struct AttributeKind {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
}

impl AttributeKind {
    /// Kind of attribute type `A`
    #[inline]
    #[must_use]
    pub fn of<A: ResourceAttributes>() -> Self {
        Self {
            name: A::KIND,
            type_id: TypeId::of::<A>(),
            type_name: std::any::type_name::<A>(),
        }
    }

    /// Kind name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type identity
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name (diagnostics only)
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for AttributeKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for AttributeKind {}

trait ErasedAttributes: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<A: ResourceAttributes> ErasedAttributes for A {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased attribute value
///
/// Cheap to clone: the value is shared, so propagating attributes from a
/// parent to its decoded child does not copy them.
#[derive(Clone)]
pub struct AttributeValue {
    kind: AttributeKind,
    value: Arc<dyn ErasedAttributes>,
}

impl AttributeValue {
    /// Wrap a typed attribute
    #[inline]
    #[must_use]
    pub fn new<A: ResourceAttributes>(value: A) -> Self {
        Self {
            kind: AttributeKind::of::<A>(),
            value: Arc::new(value),
        }
    }

    /// Kind of the wrapped value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Borrow as `A` if the kinds match
    #[inline]
    #[must_use]
    pub fn downcast_ref<A: ResourceAttributes>(&self) -> Option<&A> {
        self.value.as_any().downcast_ref::<A>()
    }
}

impl Debug for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.kind.name, self.value)
    }
}

/// Per-resource attribute map, at most one value per kind
///
/// Insertion order is kept so attribute dumps are reproducible.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    values: IndexMap<TypeId, AttributeValue>,
}

impl AttributeStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed lookup
    #[inline]
    #[must_use]
    pub fn get<A: ResourceAttributes>(&self) -> Option<&A> {
        self.values
            .get(&TypeId::of::<A>())
            .and_then(|value| value.downcast_ref::<A>())
    }

    /// Erased lookup by kind
    #[inline]
    #[must_use]
    pub fn get_value(&self, kind: &AttributeKind) -> Option<&AttributeValue> {
        self.values.get(&kind.type_id)
    }

    /// Check if a kind is present
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: &AttributeKind) -> bool {
        self.values.contains_key(&kind.type_id)
    }

    /// Add a value whose kind is not present yet
    ///
    /// # Errors
    /// Returns the rejected value if its kind is already present.
    pub fn try_insert(&mut self, value: AttributeValue) -> Result<(), AttributeValue> {
        if self.contains(&value.kind) {
            return Err(value);
        }
        self.values.insert(value.kind.type_id, value);
        Ok(())
    }

    /// Set a value, replacing any previous value of the same kind
    pub fn replace(&mut self, value: AttributeValue) -> Option<AttributeValue> {
        self.values.insert(value.kind.type_id, value)
    }

    /// Remove a kind
    pub fn remove(&mut self, kind: &AttributeKind) -> Option<AttributeValue> {
        self.values.shift_remove(&kind.type_id)
    }

    /// Iterate values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.values()
    }

    /// Number of kinds present
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no attributes are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
