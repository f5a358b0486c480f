//! Resource store
//!
//! The async boundary between components and the resource tree. Reads
//! return owned snapshots so no lock is held across an await point.

use async_trait::async_trait;
use parking_lot::RwLock;
use rpk_resource::{
    AttributeRegistry, AttributeValue, Change, ChangeSet, ChildSpec, CommitSummary, DataDigest,
    PatchResolution, ResourceArena, ResourceError, ResourceId, ResourceNode, ResourceTag, TagSet,
};
use std::sync::Arc;

/// Storage backend for resource trees
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Create a root node holding `data`
    async fn instantiate_root(
        &self,
        tags: TagSet,
        data: Vec<u8>,
        attributes: Vec<AttributeValue>,
    ) -> Result<ResourceId, ResourceError>;

    /// Snapshot of a node
    async fn get_node(&self, id: ResourceId) -> Result<ResourceNode, ResourceError>;

    /// Copy of a node's current bytes
    async fn get_data(&self, id: ResourceId) -> Result<Vec<u8>, ResourceError>;

    /// Length of a node's current bytes
    async fn get_data_length(&self, id: ResourceId) -> Result<usize, ResourceError>;

    /// Digest of a node's current bytes
    async fn digest(&self, id: ResourceId) -> Result<DataDigest, ResourceError>;

    /// Children carrying `tag`, in creation order
    async fn children_with_tag(
        &self,
        id: ResourceId,
        tag: ResourceTag,
    ) -> Result<Vec<ResourceId>, ResourceError>;

    /// The node and its live descendants, pre-order
    async fn descendants(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError>;

    /// Validate and add one change to a batch
    async fn stage(
        &self,
        changes: &mut ChangeSet,
        change: Change,
    ) -> Result<ResourceId, ResourceError>;

    /// Apply a batch all-or-nothing
    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary, ResourceError>;

    /// Resolve a node's queued patches
    async fn commit_patches(&self, id: ResourceId) -> Result<PatchResolution, ResourceError>;

    /// Delete one node, leaving its descendants orphaned
    async fn delete(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError>;

    /// Remove orphaned nodes
    async fn prune_orphans(&self) -> usize;
}

/// Store backed by an in-process [`ResourceArena`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    arena: Arc<RwLock<ResourceArena>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that validates attributes against `registry`
    #[must_use]
    pub fn with_registry(registry: Arc<AttributeRegistry>) -> Self {
        Self {
            arena: Arc::new(RwLock::new(ResourceArena::with_registry(registry))),
        }
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.read().len()
    }

    /// Check if the store holds no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.read().is_empty()
    }

    /// Run `f` with read access to the arena
    pub fn with_arena<R>(&self, f: impl FnOnce(&ResourceArena) -> R) -> R {
        f(&self.arena.read())
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn instantiate_root(
        &self,
        tags: TagSet,
        data: Vec<u8>,
        attributes: Vec<AttributeValue>,
    ) -> Result<ResourceId, ResourceError> {
        let len = data.len();
        let spec = attributes
            .into_iter()
            .fold(ChildSpec::owned(tags, data), ChildSpec::with_attributes);
        let id = self.arena.write().create_root(spec)?;
        tracing::info!("Instantiated root {} ({} bytes)", id, len);
        Ok(id)
    }

    async fn get_node(&self, id: ResourceId) -> Result<ResourceNode, ResourceError> {
        self.arena.read().get(id).cloned()
    }

    async fn get_data(&self, id: ResourceId) -> Result<Vec<u8>, ResourceError> {
        self.arena.read().data(id).map(<[u8]>::to_vec)
    }

    async fn get_data_length(&self, id: ResourceId) -> Result<usize, ResourceError> {
        self.arena.read().data_length(id)
    }

    async fn digest(&self, id: ResourceId) -> Result<DataDigest, ResourceError> {
        self.arena.read().digest(id)
    }

    async fn children_with_tag(
        &self,
        id: ResourceId,
        tag: ResourceTag,
    ) -> Result<Vec<ResourceId>, ResourceError> {
        self.arena.read().children_with_tag(id, &tag)
    }

    async fn descendants(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError> {
        self.arena.read().descendants(id)
    }

    async fn stage(
        &self,
        changes: &mut ChangeSet,
        change: Change,
    ) -> Result<ResourceId, ResourceError> {
        self.arena.read().stage(changes, change)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary, ResourceError> {
        let staged = changes.len();
        let summary = self.arena.write().commit(changes)?;
        tracing::debug!(
            "Committed {} changes: {} children, {} attributes, {} patches",
            staged,
            summary.created.len(),
            summary.attributes_added,
            summary.patches_queued
        );
        Ok(summary)
    }

    async fn commit_patches(&self, id: ResourceId) -> Result<PatchResolution, ResourceError> {
        let resolution = self.arena.write().resolve_patches(id)?;
        if resolution.changed() {
            tracing::debug!(
                "Resolved {} patches on {}: {} -> {} bytes",
                resolution.patches_applied,
                id,
                resolution.old_len,
                resolution.new_len
            );
        }
        Ok(resolution)
    }

    async fn delete(&self, id: ResourceId) -> Result<Vec<ResourceId>, ResourceError> {
        let orphaned = self.arena.write().delete(id)?;
        tracing::info!("Deleted {} ({} children orphaned)", id, orphaned.len());
        Ok(orphaned)
    }

    async fn prune_orphans(&self) -> usize {
        let pruned = self.arena.write().prune_orphans();
        if pruned > 0 {
            tracing::info!("Pruned {} orphaned resources", pruned);
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpk_patch::{ByteRange, Patch};
    use rpk_resource::GENERIC_BINARY;

    const PART: ResourceTag = ResourceTag::new("Part", &[GENERIC_BINARY]);

    #[tokio::test]
    async fn store_root_and_read() {
        let store = InMemoryStore::new();
        let root = store
            .instantiate_root(TagSet::from([GENERIC_BINARY]), b"abc".to_vec(), Vec::new())
            .await
            .unwrap();

        assert_eq!(store.get_data(root).await.unwrap(), b"abc");
        assert_eq!(store.get_data_length(root).await.unwrap(), 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn store_stage_then_commit() {
        let store = InMemoryStore::new();
        let root = store
            .instantiate_root(TagSet::from([GENERIC_BINARY]), b"abcdef".to_vec(), Vec::new())
            .await
            .unwrap();

        let mut changes = ChangeSet::new([PART]);
        let child = store
            .stage(
                &mut changes,
                Change::Child {
                    parent: root,
                    spec: ChildSpec::view([PART], ByteRange::new(1, 3).unwrap()),
                },
            )
            .await
            .unwrap();
        assert!(store.get_node(child).await.is_err());

        store.commit(changes).await.unwrap();
        assert_eq!(store.get_data(child).await.unwrap(), b"bc");
        assert_eq!(
            store.children_with_tag(root, PART).await.unwrap(),
            vec![child]
        );
    }

    #[tokio::test]
    async fn store_commit_patches() {
        let store = InMemoryStore::new();
        let root = store
            .instantiate_root(TagSet::from([GENERIC_BINARY]), b"abc".to_vec(), Vec::new())
            .await
            .unwrap();

        let mut changes = ChangeSet::default();
        store
            .stage(
                &mut changes,
                Change::Patch {
                    resource: root,
                    patch: Patch::overwrite(3, b"xyz".to_vec()),
                },
            )
            .await
            .unwrap();
        store.commit(changes).await.unwrap();
        assert_eq!(store.get_data(root).await.unwrap(), b"abc");

        let resolution = store.commit_patches(root).await.unwrap();
        assert!(resolution.changed());
        assert_eq!(store.get_data(root).await.unwrap(), b"xyz");
    }

    #[tokio::test]
    async fn store_delete_and_prune() {
        let store = InMemoryStore::new();
        let root = store
            .instantiate_root(TagSet::from([GENERIC_BINARY]), b"abcdef".to_vec(), Vec::new())
            .await
            .unwrap();
        let child = store
            .with_arena(|arena| arena.reserve_id());
        let mut changes = ChangeSet::new([PART]);
        store
            .stage(
                &mut changes,
                Change::Child {
                    parent: root,
                    spec: ChildSpec::view([PART], ByteRange::new(0, 4).unwrap()).with_id(child),
                },
            )
            .await
            .unwrap();
        store
            .stage(
                &mut changes,
                Change::Child {
                    parent: child,
                    spec: ChildSpec::view([PART], ByteRange::new(0, 2).unwrap()),
                },
            )
            .await
            .unwrap();
        let summary = store.commit(changes).await.unwrap();

        store.delete(child).await.unwrap();
        assert!(matches!(
            store.get_data(summary.created[1]).await,
            Err(ResourceError::NotMaterialized { .. })
        ));
        assert_eq!(store.prune_orphans().await, 1);
        assert_eq!(store.descendants(root).await.unwrap(), vec![root]);
    }
}
