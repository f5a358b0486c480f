//! Component run context
//!
//! A component never writes to the store directly. Everything it creates,
//! attaches or queues is staged in its context, validated at the call site,
//! and committed by the pipeline only if the run returns `Ok`. Dropping the
//! context (failure or cancellation) discards the batch.

use crate::error::ComponentError;
use crate::store::ResourceStore;
use rpk_patch::Patch;
use rpk_resource::{
    AttributeValue, Change, ChangeSet, ChildSpec, ResourceAttributes, ResourceError, ResourceId,
    ResourceNode, ResourceTag,
};
use std::sync::Arc;

/// Handle given to a component for one run on one resource
pub struct ComponentContext {
    store: Arc<dyn ResourceStore>,
    resource: ResourceId,
    component: &'static str,
    changes: ChangeSet,
}

impl ComponentContext {
    /// Create a context whose children may carry `declared` tags
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        resource: ResourceId,
        component: &'static str,
        declared: &[ResourceTag],
    ) -> Self {
        Self {
            store,
            resource,
            component,
            changes: ChangeSet::new(declared),
        }
    }

    /// Resource the component runs on
    #[inline]
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource
    }

    /// Running component id
    #[inline]
    #[must_use]
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Changes staged so far
    #[inline]
    #[must_use]
    pub fn staged(&self) -> &ChangeSet {
        &self.changes
    }

    pub(crate) fn into_changes(self) -> ChangeSet {
        self.changes
    }

    /// Snapshot of the resource
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub async fn node(&self) -> Result<ResourceNode, ComponentError> {
        Ok(self.store.get_node(self.resource).await?)
    }

    /// Current bytes of the resource (pending patches not applied)
    ///
    /// # Errors
    /// [`ResourceError::NotMaterialized`] for views under a deleted node.
    pub async fn get_data(&self) -> Result<Vec<u8>, ComponentError> {
        self.get_data_of(self.resource).await
    }

    /// Current bytes of another committed resource
    ///
    /// # Errors
    /// See [`ComponentContext::get_data`].
    pub async fn get_data_of(&self, id: ResourceId) -> Result<Vec<u8>, ComponentError> {
        Ok(self.store.get_data(id).await?)
    }

    /// Length of the resource's current bytes
    ///
    /// # Errors
    /// See [`ComponentContext::get_data`].
    pub async fn get_data_length(&self) -> Result<usize, ComponentError> {
        Ok(self.store.get_data_length(self.resource).await?)
    }

    /// Typed attributes of the resource
    ///
    /// # Errors
    /// [`ResourceError::AttributeNotFound`] if kind `A` is absent.
    pub async fn get_attributes<A>(&self) -> Result<A, ComponentError>
    where
        A: ResourceAttributes + Clone,
    {
        let node = self.node().await?;
        Ok(node.attribute::<A>()?.clone())
    }

    /// Parent of the resource
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub async fn parent(&self) -> Result<Option<ResourceId>, ComponentError> {
        Ok(self.node().await?.parent())
    }

    /// Committed children carrying `tag`, in creation order
    ///
    /// # Errors
    /// [`ResourceError::NotFound`].
    pub async fn children_with_tag(
        &self,
        tag: ResourceTag,
    ) -> Result<Vec<ResourceId>, ComponentError> {
        Ok(self.store.children_with_tag(self.resource, tag).await?)
    }

    /// Stage a child of the resource
    ///
    /// The returned id can parent further children in the same run.
    ///
    /// # Errors
    /// [`ResourceError::UndeclaredChildTag`], [`ResourceError::RangeOutOfBounds`]
    /// and other creation checks, reported here rather than at commit.
    pub async fn create_child(&mut self, spec: ChildSpec) -> Result<ResourceId, ComponentError> {
        self.create_child_of(self.resource, spec).await
    }

    /// Stage a child of any resource, including one staged in this run
    ///
    /// # Errors
    /// See [`ComponentContext::create_child`].
    pub async fn create_child_of(
        &mut self,
        parent: ResourceId,
        spec: ChildSpec,
    ) -> Result<ResourceId, ComponentError> {
        self.stage(Change::Child { parent, spec }).await
    }

    /// Stage new attributes on the resource
    ///
    /// # Errors
    /// [`ResourceError::AttributeAlreadyPresent`] if the kind is attached.
    pub async fn add_attributes<A: ResourceAttributes>(
        &mut self,
        value: A,
    ) -> Result<(), ComponentError> {
        let resource = self.resource;
        self.stage(Change::Attributes {
            resource,
            value: AttributeValue::new(value),
        })
        .await
        .map(|_| ())
    }

    /// Stage a patch on the resource
    ///
    /// # Errors
    /// [`ResourceError::Patch`] wrapping `OutOfBounds` or `OverlappingPatch`.
    pub async fn queue_patch(&mut self, patch: Patch) -> Result<(), ComponentError> {
        self.queue_patch_on(self.resource, patch).await
    }

    /// Stage a patch on another resource
    ///
    /// # Errors
    /// See [`ComponentContext::queue_patch`].
    pub async fn queue_patch_on(
        &mut self,
        resource: ResourceId,
        patch: Patch,
    ) -> Result<(), ComponentError> {
        let patch = match patch.origin() {
            Some(_) => patch,
            None => patch.with_origin(self.component),
        };
        self.stage(Change::Patch { resource, patch }).await.map(|_| ())
    }

    async fn stage(&mut self, change: Change) -> Result<ResourceId, ComponentError> {
        self.store
            .stage(&mut self.changes, change)
            .await
            .map_err(|err: ResourceError| {
                tracing::debug!("{} rejected change on {}: {}", self.component, self.resource, err);
                ComponentError::from(err)
            })
    }
}

impl std::fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("resource", &self.resource)
            .field("component", &self.component)
            .field("staged", &self.changes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use rpk_patch::ByteRange;
    use rpk_resource::{TagSet, GENERIC_BINARY};

    const CHUNK: ResourceTag = ResourceTag::new("Chunk", &[GENERIC_BINARY]);
    const OTHER: ResourceTag = ResourceTag::new("Other", &[GENERIC_BINARY]);

    async fn setup() -> (Arc<InMemoryStore>, ResourceId) {
        let store = Arc::new(InMemoryStore::new());
        let root = store
            .instantiate_root(TagSet::from([GENERIC_BINARY]), b"0123456789".to_vec(), Vec::new())
            .await
            .unwrap();
        (store, root)
    }

    #[tokio::test]
    async fn context_stages_without_committing() {
        let (store, root) = setup().await;
        let mut ctx = ComponentContext::new(store.clone(), root, "Test", &[CHUNK]);

        let child = ctx
            .create_child(ChildSpec::view([CHUNK], ByteRange::new(0, 4).unwrap()))
            .await
            .unwrap();
        ctx.create_child_of(child, ChildSpec::view([CHUNK], ByteRange::new(1, 2).unwrap()))
            .await
            .unwrap();
        ctx.queue_patch(Patch::new(ByteRange::new(5, 6).unwrap(), b"x".to_vec()))
            .await
            .unwrap();

        assert_eq!(ctx.staged().len(), 3);
        assert_eq!(store.len(), 1);
        assert!(store.get_node(root).await.unwrap().children().is_empty());
    }

    #[tokio::test]
    async fn context_rejects_at_call_site() {
        let (store, root) = setup().await;
        let mut ctx = ComponentContext::new(store, root, "Test", &[CHUNK]);

        let err = ctx
            .create_child(ChildSpec::owned([OTHER], b"x".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Resource(ResourceError::UndeclaredChildTag { .. })
        ));

        ctx.queue_patch(Patch::new(ByteRange::new(0, 4).unwrap(), b"abcd".to_vec()))
            .await
            .unwrap();
        let err = ctx
            .queue_patch(Patch::new(ByteRange::new(2, 6).unwrap(), b"efgh".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ComponentError::Resource(ResourceError::Patch { .. })));
        assert_eq!(ctx.staged().len(), 1);
    }

    #[tokio::test]
    async fn context_patch_origin_defaults_to_component() {
        let (store, root) = setup().await;
        let mut ctx = ComponentContext::new(store.clone(), root, "OriginTest", &[]);
        ctx.queue_patch(Patch::overwrite(2, b"zz".to_vec())).await.unwrap();

        store.commit(ctx.into_changes()).await.unwrap();
        let node = store.get_node(root).await.unwrap();
        assert_eq!(node.pending_patches().patches()[0].origin(), Some("OriginTest"));
    }

    #[tokio::test]
    async fn context_missing_attributes() {
        #[derive(Debug, Clone)]
        struct Absent;
        impl ResourceAttributes for Absent {
            const KIND: &'static str = "Absent";
        }

        let (store, root) = setup().await;
        let ctx = ComponentContext::new(store, root, "Test", &[]);
        let err = ctx.get_attributes::<Absent>().await.unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Resource(ResourceError::AttributeNotFound { kind: "Absent", .. })
        ));
    }
}
