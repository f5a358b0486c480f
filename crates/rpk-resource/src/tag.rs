//! Resource type tags
//!
//! A [`ResourceTag`] names a semantic kind of resource. Tags form a
//! hierarchy through their base tags, so a node tagged `ScrambledFlash`
//! also satisfies `GenericBinary`. Components are dispatched on tags and
//! may only create children with the tags they declare.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Semantic kind of a resource
///
/// Identity is the tag name, which must be unique across the process.
///
/// # Example
/// ```rust
/// use rpk_resource::{ResourceTag, GENERIC_BINARY};
///
/// const FIRMWARE: ResourceTag = ResourceTag::new("Firmware", &[GENERIC_BINARY]);
///
/// assert!(FIRMWARE.is_a(&GENERIC_BINARY));
/// assert!(!GENERIC_BINARY.is_a(&FIRMWARE));
/// ```
#[derive(Clone, Copy)]
pub struct ResourceTag {
    name: &'static str,
    bases: &'static [ResourceTag],
}

/// Root of the tag hierarchy: any blob of bytes
pub const GENERIC_BINARY: ResourceTag = ResourceTag::new("GenericBinary", &[]);

impl ResourceTag {
    /// Define a tag with its direct base tags
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, bases: &'static [ResourceTag]) -> Self {
        Self { name, bases }
    }

    /// Tag name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Direct base tags
    #[inline]
    #[must_use]
    pub const fn bases(&self) -> &'static [ResourceTag] {
        self.bases
    }

    /// Check if this tag equals or specialises `other`
    #[must_use]
    pub fn is_a(&self, other: &ResourceTag) -> bool {
        self == other || self.bases.iter().any(|base| base.is_a(other))
    }

    /// This tag and every tag it specialises, nearest first
    #[must_use]
    pub fn ancestry(&self) -> Vec<ResourceTag> {
        let mut out = vec![*self];
        let mut i = 0;
        while i < out.len() {
            let bases = out[i].bases;
            for base in bases {
                if !out.contains(base) {
                    out.push(*base);
                }
            }
            i += 1;
        }
        out
    }

    /// Distance to the hierarchy root (`GenericBinary` has depth 0)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.bases
            .iter()
            .map(|base| base.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

impl PartialEq for ResourceTag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ResourceTag {}

impl Hash for ResourceTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for ResourceTag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceTag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(other.name)
    }
}

impl Debug for ResourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceTag({})", self.name)
    }
}

impl Display for ResourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Set of tags carried by one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<ResourceTag>);

impl TagSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag
    #[inline]
    pub fn insert(&mut self, tag: ResourceTag) -> bool {
        self.0.insert(tag)
    }

    /// Check if any tag in the set equals or specialises `tag`
    #[inline]
    #[must_use]
    pub fn satisfies(&self, tag: &ResourceTag) -> bool {
        self.0.iter().any(|own| own.is_a(tag))
    }

    /// Check if the set satisfies any of `tags`
    #[inline]
    #[must_use]
    pub fn satisfies_any(&self, tags: &[ResourceTag]) -> bool {
        tags.iter().any(|tag| self.satisfies(tag))
    }

    /// First tag not covered by any of `declared`
    ///
    /// Returns `None` when every tag equals or specialises a declared tag.
    #[must_use]
    pub fn first_undeclared(&self, declared: &[ResourceTag]) -> Option<ResourceTag> {
        self.0
            .iter()
            .find(|tag| !declared.iter().any(|allowed| tag.is_a(allowed)))
            .copied()
    }

    /// Deepest tag in the set, used to pick the most specific component
    #[must_use]
    pub fn most_specific(&self) -> Option<ResourceTag> {
        self.0.iter().max_by_key(|tag| tag.depth()).copied()
    }

    /// Number of explicit tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no tags are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate explicit tags in name order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceTag> {
        self.0.iter()
    }
}

impl FromIterator<ResourceTag> for TagSet {
    fn from_iter<I: IntoIterator<Item = ResourceTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[ResourceTag; N]> for TagSet {
    fn from(tags: [ResourceTag; N]) -> Self {
        tags.into_iter().collect()
    }
}

impl From<&[ResourceTag]> for TagSet {
    fn from(tags: &[ResourceTag]) -> Self {
        tags.iter().copied().collect()
    }
}

impl Display for TagSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(ResourceTag::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
