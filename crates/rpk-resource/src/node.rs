//! Resource nodes
//!
//! A node owns its tags, attributes and pending patches. Its bytes are
//! either owned outright or a view onto a range of the parent's bytes.

use crate::attributes::{AttributeKind, AttributeStore, AttributeValue, ResourceAttributes};
use crate::error::ResourceError;
use crate::id::ResourceId;
use crate::tag::{ResourceTag, TagSet};
use rpk_patch::{ByteRange, PatchQueue};

/// Backing bytes of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceData {
    /// Bytes owned by this node
    Owned(Vec<u8>),

    /// Range of the parent's current bytes
    View(ByteRange),
}

impl ResourceData {
    /// Check if this is a parent view
    #[inline]
    #[must_use]
    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }
}

impl From<Vec<u8>> for ResourceData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }
}

impl From<ByteRange> for ResourceData {
    fn from(range: ByteRange) -> Self {
        Self::View(range)
    }
}

/// One resource in the tree
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub(crate) id: ResourceId,
    pub(crate) tags: TagSet,
    pub(crate) data: ResourceData,
    pub(crate) attributes: AttributeStore,
    pub(crate) parent: Option<ResourceId>,
    pub(crate) children: Vec<ResourceId>,
    pub(crate) patches: PatchQueue,
}

impl ResourceNode {
    pub(crate) fn new(
        id: ResourceId,
        parent: Option<ResourceId>,
        tags: TagSet,
        data: ResourceData,
        attributes: AttributeStore,
    ) -> Self {
        Self {
            id,
            tags,
            data,
            attributes,
            parent,
            children: Vec::new(),
            patches: PatchQueue::new(),
        }
    }

    /// Node identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Explicit tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Check if the node carries `tag` or a specialisation of it
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &ResourceTag) -> bool {
        self.tags.satisfies(tag)
    }

    /// Backing bytes descriptor
    #[inline]
    #[must_use]
    pub fn data_source(&self) -> &ResourceData {
        &self.data
    }

    /// Parent id, `None` for a root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    /// Child ids in creation order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ResourceId] {
        &self.children
    }

    /// Attached attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Typed attribute lookup
    ///
    /// # Errors
    /// Returns [`ResourceError::AttributeNotFound`] if kind `A` is absent.
    pub fn attribute<A: ResourceAttributes>(&self) -> Result<&A, ResourceError> {
        self.attributes
            .get::<A>()
            .ok_or(ResourceError::AttributeNotFound {
                resource: self.id,
                kind: A::KIND,
            })
    }

    /// Check if kind `A` is attached
    #[inline]
    #[must_use]
    pub fn has_attribute<A: ResourceAttributes>(&self) -> bool {
        self.attributes.contains(&AttributeKind::of::<A>())
    }

    /// Patches queued but not yet resolved
    #[inline]
    #[must_use]
    pub fn pending_patches(&self) -> &PatchQueue {
        &self.patches
    }

    /// Check if the node has unresolved patches
    #[inline]
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        !self.patches.is_empty()
    }
}

/// Description of a child to create
///
/// # Example
/// ```rust
/// use rpk_resource::{ChildSpec, GENERIC_BINARY};
///
/// let spec = ChildSpec::owned([GENERIC_BINARY], b"payload".to_vec());
/// assert!(!spec.data().is_view());
/// ```
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub(crate) id: Option<ResourceId>,
    pub(crate) tags: TagSet,
    pub(crate) data: ResourceData,
    pub(crate) attributes: Vec<AttributeValue>,
}

impl ChildSpec {
    /// Child that owns `data`
    #[must_use]
    pub fn owned(tags: impl Into<TagSet>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            tags: tags.into(),
            data: ResourceData::Owned(data.into()),
            attributes: Vec::new(),
        }
    }

    /// Child viewing `range` of the parent's bytes
    #[must_use]
    pub fn view(tags: impl Into<TagSet>, range: ByteRange) -> Self {
        Self {
            id: None,
            tags: tags.into(),
            data: ResourceData::View(range),
            attributes: Vec::new(),
        }
    }

    /// Use a previously reserved id
    #[must_use]
    pub fn with_id(mut self, id: ResourceId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach attributes at creation
    #[must_use]
    pub fn with_attributes(mut self, value: AttributeValue) -> Self {
        self.attributes.push(value);
        self
    }

    /// Reserved id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<ResourceId> {
        self.id
    }

    /// Tags the child will carry
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Data the child will carry
    #[inline]
    #[must_use]
    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    /// Attributes attached at creation
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[AttributeValue] {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::GENERIC_BINARY;

    #[derive(Debug)]
    struct Marker;

    impl ResourceAttributes for Marker {
        const KIND: &'static str = "Marker";
    }

    #[test]
    fn node_attribute_missing_names_kind() {
        let node = ResourceNode::new(
            ResourceId::from_raw(4),
            None,
            TagSet::from([GENERIC_BINARY]),
            ResourceData::Owned(vec![1, 2, 3]),
            AttributeStore::new(),
        );

        let err = node.attribute::<Marker>().unwrap_err();
        assert!(matches!(
            err,
            ResourceError::AttributeNotFound { kind: "Marker", .. }
        ));
        assert!(!node.has_attribute::<Marker>());
        assert!(!node.is_provisional());
    }

    #[test]
    fn child_spec_builder() {
        let spec = ChildSpec::view([GENERIC_BINARY], ByteRange::new(0, 4).unwrap())
            .with_id(ResourceId::from_raw(10))
            .with_attributes(AttributeValue::new(Marker));

        assert!(spec.data().is_view());
        assert_eq!(spec.id(), Some(ResourceId::from_raw(10)));
        assert_eq!(spec.attributes().len(), 1);
        assert!(spec.tags().satisfies(&GENERIC_BINARY));
    }
}
