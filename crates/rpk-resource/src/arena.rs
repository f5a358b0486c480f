//! Resource arena
//!
//! Owns every node of one or more resource trees. All structural changes go
//! through a [`ChangeSet`]: it is validated in full against the current tree
//! before anything is applied, so a failed commit leaves the arena exactly
//! as it was.
//!
//! # Data Flow
//! 1. Components stage changes ([`ResourceArena::stage`]); each change is
//!    checked immediately together with everything staged before it
//! 2. [`ResourceArena::commit`] re-validates the whole set and applies it
//! 3. [`ResourceArena::resolve_patches`] folds queued patches into the bytes

use crate::attributes::{AttributeKind, AttributeStore, AttributeValue, ResourceAttributes};
use crate::digest::DataDigest;
use crate::error::ResourceError;
use crate::id::{IdAllocator, ResourceId};
use crate::node::{ChildSpec, ResourceData, ResourceNode};
use crate::registry::AttributeRegistry;
use crate::tag::ResourceTag;
use indexmap::IndexMap;
use rpk_patch::{Patch, PatchQueue};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One buffered structural change
#[derive(Debug, Clone)]
pub enum Change {
    /// Create a child under `parent` (which may itself be a staged child)
    Child {
        /// Parent id
        parent: ResourceId,
        /// Child description; the id is filled in when staged
        spec: ChildSpec,
    },

    /// Attach a new attribute kind
    Attributes {
        /// Target node
        resource: ResourceId,
        /// Value to attach
        value: AttributeValue,
    },

    /// Queue a patch
    Patch {
        /// Target node
        resource: ResourceId,
        /// Patch in the target's current coordinates
        patch: Patch,
    },
}

/// Ordered batch of changes committed all-or-nothing
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    declared: Vec<ResourceTag>,
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Create a batch whose children may only carry `declared` tags
    #[must_use]
    pub fn new(declared: impl Into<Vec<ResourceTag>>) -> Self {
        Self {
            declared: declared.into(),
            changes: Vec::new(),
        }
    }

    /// Tags children of this batch may carry
    #[inline]
    #[must_use]
    pub fn declared(&self) -> &[ResourceTag] {
        &self.declared
    }

    /// Staged changes in order
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Number of staged changes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if nothing is staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Created children in creation order
    pub created: Vec<ResourceId>,

    /// Attribute kinds attached to existing or new nodes
    pub attributes_added: usize,

    /// Patches queued
    pub patches_queued: usize,
}

/// Outcome of resolving one node's patch queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchResolution {
    /// Resolved node
    pub resource: ResourceId,

    /// Number of patches applied
    pub patches_applied: usize,

    /// Length before resolution
    pub old_len: usize,

    /// Length after resolution
    pub new_len: usize,
}

impl PatchResolution {
    /// Check if any patch was applied
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.patches_applied > 0
    }
}

/// Node storage for resource trees
#[derive(Debug)]
pub struct ResourceArena {
    nodes: IndexMap<ResourceId, ResourceNode>,
    deleted: HashSet<ResourceId>,
    ids: IdAllocator,
    registry: Option<Arc<AttributeRegistry>>,
}

impl Default for ResourceArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceArena {
    /// Create an empty arena accepting any attribute kind
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            deleted: HashSet::new(),
            ids: IdAllocator::new(),
            registry: None,
        }
    }

    /// Create an empty arena that validates attributes against `registry`
    #[must_use]
    pub fn with_registry(registry: Arc<AttributeRegistry>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new()
        }
    }

    /// Attribute registry, if one is enforced
    #[inline]
    #[must_use]
    pub fn registry(&self) -> Option<&AttributeRegistry> {
        self.registry.as_deref()
    }

    /// Reserve an id for a node created later
    #[inline]
    pub fn reserve_id(&self) -> ResourceId {
        self.ids.next()
    }

    /// Create a root node
    ///
    /// # Errors
    /// - [`ResourceError::OrphanView`] if `spec` is a view
    /// - [`ResourceError::DuplicateId`] if the reserved id is in use
    /// - attribute registry errors
    pub fn create_root(&mut self, spec: ChildSpec) -> Result<ResourceId, ResourceError> {
        let id = spec.id.unwrap_or_else(|| self.ids.next());
        if spec.data.is_view() {
            return Err(ResourceError::OrphanView(id));
        }
        if self.id_taken(id) {
            return Err(ResourceError::DuplicateId(id));
        }
        let attributes = self.build_attributes(id, &spec.attributes)?;

        self.nodes.insert(
            id,
            ResourceNode::new(id, None, spec.tags, spec.data, attributes),
        );
        Ok(id)
    }

    /// Create a child directly (a one-change commit)
    ///
    /// # Errors
    /// See [`ResourceArena::stage`].
    pub fn create_child(
        &mut self,
        parent: ResourceId,
        spec: ChildSpec,
        declared: &[ResourceTag],
    ) -> Result<ResourceId, ResourceError> {
        let mut changes = ChangeSet::new(declared);
        let id = self.stage(&mut changes, Change::Child { parent, spec })?;
        self.commit(changes)?;
        Ok(id)
    }

    /// Add one change to a batch, validating it against the arena and the
    /// changes staged before it
    ///
    /// Returns the id the change concerns (the new id for a child). On
    /// error the batch is left unchanged.
    ///
    /// # Errors
    /// - [`ResourceError::NotFound`] for unknown targets
    /// - [`ResourceError::UntaggedChild`] / [`ResourceError::UndeclaredChildTag`]
    /// - [`ResourceError::RangeOutOfBounds`] for views outside the parent
    /// - [`ResourceError::AttributeAlreadyPresent`] for a kind already attached
    /// - [`ResourceError::Patch`] for out-of-bounds or overlapping patches
    pub fn stage(
        &self,
        changes: &mut ChangeSet,
        mut change: Change,
    ) -> Result<ResourceId, ResourceError> {
        let target = match &mut change {
            Change::Child { spec, .. } => *spec.id.get_or_insert_with(|| self.ids.next()),
            Change::Attributes { resource, .. } | Change::Patch { resource, .. } => *resource,
        };

        changes.changes.push(change);
        if let Err(err) = self.check_changes(changes) {
            changes.changes.pop();
            return Err(err);
        }
        Ok(target)
    }

    /// Validate and apply a batch
    ///
    /// # Errors
    /// Any error [`ResourceArena::stage`] reports; nothing is applied.
    pub fn commit(&mut self, changes: ChangeSet) -> Result<CommitSummary, ResourceError> {
        let queues = self.check_changes(&changes)?;
        let mut summary = CommitSummary::default();

        for change in changes.changes {
            match change {
                Change::Child { parent, spec } => {
                    let id = spec.id.unwrap_or_else(|| self.ids.next());
                    let mut attributes = AttributeStore::new();
                    for value in spec.attributes {
                        attributes.replace(value);
                        summary.attributes_added += 1;
                    }
                    self.nodes.insert(
                        id,
                        ResourceNode::new(id, Some(parent), spec.tags, spec.data, attributes),
                    );
                    if let Some(parent_node) = self.nodes.get_mut(&parent) {
                        parent_node.children.push(id);
                    }
                    summary.created.push(id);
                }
                Change::Attributes { resource, value } => {
                    if let Some(node) = self.nodes.get_mut(&resource) {
                        node.attributes.replace(value);
                        summary.attributes_added += 1;
                    }
                }
                Change::Patch { .. } => summary.patches_queued += 1,
            }
        }

        for (id, queue) in queues {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.patches = queue;
            }
        }

        Ok(summary)
    }

    /// Live node by id
    ///
    /// # Errors
    /// Returns [`ResourceError::NotFound`] for unknown or deleted ids.
    pub fn get(&self, id: ResourceId) -> Result<&ResourceNode, ResourceError> {
        self.nodes.get(&id).ok_or(ResourceError::NotFound(id))
    }

    fn get_mut(&mut self, id: ResourceId) -> Result<&mut ResourceNode, ResourceError> {
        self.nodes.get_mut(&id).ok_or(ResourceError::NotFound(id))
    }

    /// Check if a live node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Current bytes of a node
    ///
    /// Views read through to the parent's current bytes, so pending patches
    /// on any node are never visible here.
    ///
    /// # Errors
    /// - [`ResourceError::NotMaterialized`] if an ancestor was deleted
    /// - [`ResourceError::RangeOutOfBounds`] if a resolved parent shrank
    ///   below the view
    pub fn data(&self, id: ResourceId) -> Result<&[u8], ResourceError> {
        let node = self.get(id)?;
        match &node.data {
            ResourceData::Owned(bytes) => Ok(bytes),
            ResourceData::View(range) => {
                let parent = node.parent.ok_or(ResourceError::OrphanView(id))?;
                if !self.nodes.contains_key(&parent) {
                    return Err(ResourceError::NotMaterialized {
                        resource: id,
                        missing: parent,
                    });
                }
                let parent_data = self.data(parent).map_err(|err| match err {
                    ResourceError::NotMaterialized { missing, .. } => {
                        ResourceError::NotMaterialized {
                            resource: id,
                            missing,
                        }
                    }
                    other => other,
                })?;
                parent_data
                    .get(range.as_std())
                    .ok_or(ResourceError::RangeOutOfBounds {
                        resource: parent,
                        range: *range,
                        parent_len: parent_data.len(),
                    })
            }
        }
    }

    /// Length of a node's current bytes
    ///
    /// # Errors
    /// See [`ResourceArena::data`].
    pub fn data_length(&self, id: ResourceId) -> Result<usize, ResourceError> {
        self.data(id).map(<[u8]>::len)
    }

    /// Digest of a node's current bytes
    ///
    /// # Errors
    /// See [`ResourceArena::data`].
    pub fn digest(&self, id: ResourceId) -> Result<DataDigest, ResourceError> {
        self.data(id).map(DataDigest::compute)
    }

    /// Attach a new attribute kind (a one-change commit)
    ///
    /// # Errors
    /// Returns [`ResourceError::AttributeAlreadyPresent`] if the kind is
    /// already attached; use [`ResourceArena::replace_attributes`] to
    /// overwrite.
    pub fn add_attributes(
        &mut self,
        resource: ResourceId,
        value: AttributeValue,
    ) -> Result<(), ResourceError> {
        let mut changes = ChangeSet::default();
        self.stage(&mut changes, Change::Attributes { resource, value })?;
        self.commit(changes).map(|_| ())
    }

    /// Overwrite an attribute kind, returning the previous value
    ///
    /// # Errors
    /// Returns [`ResourceError::NotFound`] or attribute registry errors.
    pub fn replace_attributes(
        &mut self,
        resource: ResourceId,
        value: AttributeValue,
    ) -> Result<Option<AttributeValue>, ResourceError> {
        if let Some(registry) = &self.registry {
            registry.validate(&value)?;
        }
        Ok(self.get_mut(resource)?.attributes.replace(value))
    }

    /// Typed attribute lookup
    ///
    /// # Errors
    /// [`ResourceError::NotFound`] or [`ResourceError::AttributeNotFound`].
    pub fn attributes<A: ResourceAttributes>(&self, id: ResourceId) -> Result<&A, ResourceError> {
        self.get(id)?.attribute::<A>()
    }

    /// Check a patch against a node without queuing it
    ///
    /// # Errors
    /// See [`ResourceArena::queue_patch`].
    pub fn check_patch(&self, resource: ResourceId, patch: &Patch) -> Result<(), ResourceError> {
        let data_len = self.data_length(resource)?;
        self.get(resource)?
            .patches
            .check(patch, data_len)
            .map_err(|source| ResourceError::Patch { resource, source })
    }

    /// Queue a patch on a node (a one-change commit)
    ///
    /// Returns the patch's position in the node's queue.
    ///
    /// # Errors
    /// [`ResourceError::Patch`] if the range is outside the node's current
    /// bytes or overlaps a queued patch.
    pub fn queue_patch(
        &mut self,
        resource: ResourceId,
        patch: Patch,
    ) -> Result<usize, ResourceError> {
        let mut changes = ChangeSet::default();
        self.stage(&mut changes, Change::Patch { resource, patch })?;
        self.commit(changes)?;
        Ok(self.get(resource)?.patches.len() - 1)
    }

    /// Fold a node's queued patches into its bytes
    ///
    /// A view with patches is materialized: it takes ownership of its
    /// resolved bytes and stops following the parent. The parent itself is
    /// never modified.
    ///
    /// # Errors
    /// [`ResourceError::Patch`] if the queue fails the resolution cross-check
    /// (the queue is kept), or any [`ResourceArena::data`] error.
    pub fn resolve_patches(&mut self, id: ResourceId) -> Result<PatchResolution, ResourceError> {
        let node = self.get(id)?;
        let patches_applied = node.patches.len();
        if patches_applied == 0 {
            let len = self.data_length(id)?;
            return Ok(PatchResolution {
                resource: id,
                patches_applied,
                old_len: len,
                new_len: len,
            });
        }

        let base = self.data(id)?.to_vec();
        let node = self.get_mut(id)?;
        let resolved = node
            .patches
            .resolve(&base)
            .map_err(|source| ResourceError::Patch {
                resource: id,
                source,
            })?;
        let new_len = resolved.len();
        node.data = ResourceData::Owned(resolved);

        Ok(PatchResolution {
            resource: id,
            patches_applied,
            old_len: base.len(),
            new_len,
        })
    }

    /// Child ids in creation order
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub fn children(&self, id: ResourceId) -> Result<&[ResourceId], ResourceError> {
        self.get(id).map(ResourceNode::children)
    }

    /// Children carrying `tag` (or a specialisation), in creation order
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub fn children_with_tag(
        &self,
        id: ResourceId,
        tag: &ResourceTag,
    ) -> Result<Vec<ResourceId>, ResourceError> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|node| node.has_tag(tag)))
            .collect())
    }

    /// Parent id, `None` for a root
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub fn parent(&self, id: ResourceId) -> Result<Option<ResourceId>, ResourceError> {
        self.get(id).map(ResourceNode::parent)
    }

    /// Ancestor ids, nearest first
    ///
    /// # Errors
    /// [`ResourceError::NotMaterialized`] if the chain reaches a deleted node.
    pub fn ancestors(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError> {
        let mut out = Vec::new();
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            let node = self
                .nodes
                .get(&parent)
                .ok_or(ResourceError::NotMaterialized {
                    resource: id,
                    missing: parent,
                })?;
            out.push(parent);
            current = node.parent;
        }
        Ok(out)
    }

    /// The node and all its live descendants, pre-order
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub fn descendants(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError> {
        let mut out = Vec::new();
        let mut stack = vec![self.get(id)?.id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Delete one node
    ///
    /// The node is detached from its parent; its descendants stay in the
    /// arena as orphans until [`ResourceArena::prune_orphans`]. Returns the
    /// detached direct children.
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub fn delete(&mut self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError> {
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(ResourceError::NotFound(id))?;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        self.deleted.insert(id);
        Ok(node.children)
    }

    /// Live nodes whose ancestor chain reaches a deleted node
    #[must_use]
    pub fn orphans(&self) -> Vec<ResourceId> {
        self.nodes
            .keys()
            .copied()
            .filter(|id| self.ancestors(*id).is_err())
            .collect()
    }

    /// Remove every orphan, returning how many were removed
    pub fn prune_orphans(&mut self) -> usize {
        let orphans = self.orphans();
        for id in &orphans {
            self.nodes.shift_remove(id);
            self.deleted.insert(*id);
        }
        orphans.len()
    }

    /// Ids of root nodes in creation order
    #[must_use]
    pub fn roots(&self) -> Vec<ResourceId> {
        self.nodes
            .values()
            .filter(|node| node.parent.is_none())
            .map(ResourceNode::id)
            .collect()
    }

    /// Number of live nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena holds no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate live nodes in creation order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    fn id_taken(&self, id: ResourceId) -> bool {
        self.nodes.contains_key(&id) || self.deleted.contains(&id)
    }

    fn build_attributes(
        &self,
        resource: ResourceId,
        values: &[AttributeValue],
    ) -> Result<AttributeStore, ResourceError> {
        let mut store = AttributeStore::new();
        for value in values {
            if let Some(registry) = &self.registry {
                registry.validate(value)?;
            }
            store
                .try_insert(value.clone())
                .map_err(|rejected| ResourceError::AttributeAlreadyPresent {
                    resource,
                    kind: rejected.kind().name(),
                })?;
        }
        Ok(store)
    }

    /// Validate a batch in order, returning the patch queues it produces
    fn check_changes(
        &self,
        changes: &ChangeSet,
    ) -> Result<IndexMap<ResourceId, PatchQueue>, ResourceError> {
        let mut staging = Staging {
            arena: self,
            lengths: HashMap::new(),
            kinds: HashMap::new(),
            queues: IndexMap::new(),
        };
        for change in &changes.changes {
            staging.check(change, &changes.declared)?;
        }
        Ok(staging.queues)
    }
}

/// Virtual view of the arena with a batch partly applied
struct Staging<'a> {
    arena: &'a ResourceArena,
    lengths: HashMap<ResourceId, usize>,
    kinds: HashMap<ResourceId, HashSet<TypeId>>,
    queues: IndexMap<ResourceId, PatchQueue>,
}

impl Staging<'_> {
    fn check(&mut self, change: &Change, declared: &[ResourceTag]) -> Result<(), ResourceError> {
        match change {
            Change::Child { parent, spec } => self.check_child(*parent, spec, declared),
            Change::Attributes { resource, value } => self.check_attributes(*resource, value),
            Change::Patch { resource, patch } => self.check_patch(*resource, patch),
        }
    }

    fn data_length(&self, id: ResourceId) -> Result<usize, ResourceError> {
        match self.lengths.get(&id) {
            Some(len) => Ok(*len),
            None => self.arena.data_length(id),
        }
    }

    fn check_child(
        &mut self,
        parent: ResourceId,
        spec: &ChildSpec,
        declared: &[ResourceTag],
    ) -> Result<(), ResourceError> {
        let parent_len = self.data_length(parent)?;

        if spec.tags.is_empty() {
            return Err(ResourceError::UntaggedChild { parent });
        }
        if let Some(tag) = spec.tags.first_undeclared(declared) {
            let names: Vec<&str> = declared.iter().map(ResourceTag::name).collect();
            return Err(ResourceError::UndeclaredChildTag {
                parent,
                tag: tag.name(),
                declared: names.join(", "),
            });
        }

        let len = match &spec.data {
            ResourceData::Owned(bytes) => bytes.len(),
            ResourceData::View(range) => {
                if !range.fits_within(parent_len) {
                    return Err(ResourceError::RangeOutOfBounds {
                        resource: parent,
                        range: *range,
                        parent_len,
                    });
                }
                range.len()
            }
        };

        // `stage` assigns ids before validation
        let id = spec.id.unwrap_or_else(|| self.arena.reserve_id());
        if self.arena.id_taken(id) || self.lengths.contains_key(&id) {
            return Err(ResourceError::DuplicateId(id));
        }

        let store = self.arena.build_attributes(id, &spec.attributes)?;
        self.kinds.insert(
            id,
            store.iter().map(|value| value.kind().type_id()).collect(),
        );
        self.lengths.insert(id, len);
        Ok(())
    }

    fn check_attributes(
        &mut self,
        resource: ResourceId,
        value: &AttributeValue,
    ) -> Result<(), ResourceError> {
        if let Some(registry) = &self.arena.registry {
            registry.validate(value)?;
        }

        let kind: AttributeKind = value.kind();
        let already_attached = if self.lengths.contains_key(&resource) {
            false
        } else {
            self.arena.get(resource)?.attributes.contains(&kind)
        };
        let staged = self.kinds.entry(resource).or_default();
        if already_attached || !staged.insert(kind.type_id()) {
            return Err(ResourceError::AttributeAlreadyPresent {
                resource,
                kind: kind.name(),
            });
        }
        Ok(())
    }

    fn check_patch(&mut self, resource: ResourceId, patch: &Patch) -> Result<(), ResourceError> {
        let data_len = self.data_length(resource)?;
        if !self.queues.contains_key(&resource) {
            let queue = if self.lengths.contains_key(&resource) {
                PatchQueue::new()
            } else {
                self.arena.get(resource)?.patches.clone()
            };
            self.queues.insert(resource, queue);
        }

        if let Some(queue) = self.queues.get_mut(&resource) {
            queue
                .queue(patch.clone(), data_len)
                .map_err(|source| ResourceError::Patch { resource, source })?;
        }
        Ok(())
    }
}
