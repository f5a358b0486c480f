//! Unpack and pack passes
//!
//! # Ordering
//! - Unpack is strictly top-down: a node's unpacker commits before any of
//!   its children is visited.
//! - Pack is strictly bottom-up: for each node, every child subtree is
//!   packed first, then the node's pending patches are resolved, then its
//!   packer runs on the resolved bytes, then the packer's own patches are
//!   resolved.
//!
//! Sibling subtrees may run concurrently. Dropping a pass future cancels
//! it; runs still in flight commit nothing.

use crate::component::{Packer, Unpacker};
use crate::config::PipelineConfig;
use crate::context::ComponentContext;
use crate::dispatcher::Dispatcher;
use crate::error::ComponentError;
use crate::store::ResourceStore;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use parking_lot::Mutex;
use rpk_resource::ResourceId;
use std::collections::HashSet;
use std::sync::Arc;

/// A component failure absorbed by a pass with `fail_fast` off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassFailure {
    /// Resource the failure concerns
    pub resource: ResourceId,
    /// Failing component, if one was running
    pub component: Option<&'static str>,
    /// Rendered error
    pub message: String,
}

/// Summary of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Nodes the pass looked at
    pub nodes_visited: usize,
    /// Component runs that committed
    pub components_run: usize,
    /// Children created by those runs
    pub children_created: usize,
    /// Patches folded into node data
    pub patches_resolved: usize,
    /// Failures skipped over
    pub failures: Vec<PassFailure>,
}

impl PassReport {
    /// Check if no failure was absorbed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-pass bookkeeping shared by concurrent subtrees
#[derive(Default)]
struct PassState {
    ran: Mutex<HashSet<ResourceId>>,
    report: Mutex<PassReport>,
}

impl PassState {
    fn visit(&self) {
        self.report.lock().nodes_visited += 1;
    }

    fn claim(&self, resource: ResourceId, component: &'static str) -> Result<(), ComponentError> {
        if self.ran.lock().insert(resource) {
            Ok(())
        } else {
            Err(ComponentError::AlreadyRun {
                component,
                resource,
            })
        }
    }

    fn record_run(&self, children_created: usize) {
        let mut report = self.report.lock();
        report.components_run += 1;
        report.children_created += children_created;
    }

    fn record_resolution(&self, patches: usize) {
        self.report.lock().patches_resolved += patches;
    }

    fn record_failure(&self, resource: ResourceId, err: &ComponentError) {
        self.report.lock().failures.push(PassFailure {
            resource: err.resource().unwrap_or(resource),
            component: err.component(),
            message: err.to_string(),
        });
    }

    fn into_report(self) -> PassReport {
        self.report.into_inner()
    }
}

/// Drives unpackers and packers over resource trees
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn ResourceStore>,
    dispatcher: Arc<dyn Dispatcher>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            config: PipelineConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Run the matching unpacker on one resource
    ///
    /// A resource no unpacker targets is left as is.
    ///
    /// # Errors
    /// [`ComponentError::UnpackerError`] naming the component and resource.
    pub async fn unpack(&self, id: ResourceId) -> Result<PassReport, ComponentError> {
        let pass = PassState::default();
        self.run_unpacker(id, &pass).await?;
        Ok(pass.into_report())
    }

    /// Resolve, run the matching packer, and resolve again on one resource
    ///
    /// Children are not visited.
    ///
    /// # Errors
    /// [`ComponentError::PackerError`] naming the component and resource, or
    /// a patch conflict while resolving.
    pub async fn pack(&self, id: ResourceId) -> Result<PassReport, ComponentError> {
        let pass = PassState::default();
        self.run_packer(id, &pass).await?;
        Ok(pass.into_report())
    }

    /// Unpack `root` and every descendant, top-down
    ///
    /// # Errors
    /// With `fail_fast`, the first component failure. Always:
    /// [`ComponentError::DepthExceeded`] and [`ComponentError::AlreadyRun`].
    pub async fn unpack_recursively(&self, root: ResourceId) -> Result<PassReport, ComponentError> {
        tracing::info!("Unpack pass from {}", root);
        let pass = PassState::default();
        self.unpack_subtree(root, 0, &pass).await?;
        let report = pass.into_report();
        tracing::info!(
            "Unpack pass from {} finished: {} nodes, {} components, {} children",
            root,
            report.nodes_visited,
            report.components_run,
            report.children_created
        );
        Ok(report)
    }

    /// Pack `root` and every descendant, bottom-up
    ///
    /// Children created during the pass (for example packed siblings) are
    /// not visited themselves.
    ///
    /// # Errors
    /// See [`Pipeline::unpack_recursively`].
    pub async fn pack_recursively(&self, root: ResourceId) -> Result<PassReport, ComponentError> {
        tracing::info!("Pack pass from {}", root);
        let pass = PassState::default();
        self.pack_subtree(root, 0, &pass).await?;
        let report = pass.into_report();
        tracing::info!(
            "Pack pass from {} finished: {} nodes, {} components, {} patches resolved",
            root,
            report.nodes_visited,
            report.components_run,
            report.patches_resolved
        );
        Ok(report)
    }

    fn unpack_subtree<'a>(
        &'a self,
        id: ResourceId,
        depth: usize,
        pass: &'a PassState,
    ) -> BoxFuture<'a, Result<(), ComponentError>> {
        async move {
            self.check_depth(id, depth)?;
            let result = self.run_unpacker(id, pass).await;
            if !self.absorb(id, pass, result)? {
                return Ok(());
            }

            let children = self.store.get_node(id).await?.children().to_vec();
            let visits = children
                .into_iter()
                .map(|child| self.unpack_subtree(child, depth + 1, pass))
                .collect();
            self.visit_children(visits).await
        }
        .boxed()
    }

    fn pack_subtree<'a>(
        &'a self,
        id: ResourceId,
        depth: usize,
        pass: &'a PassState,
    ) -> BoxFuture<'a, Result<(), ComponentError>> {
        async move {
            self.check_depth(id, depth)?;

            let children = self.store.get_node(id).await?.children().to_vec();
            let visits = children
                .into_iter()
                .map(|child| self.pack_subtree(child, depth + 1, pass))
                .collect();
            self.visit_children(visits).await?;

            let result = self.run_packer(id, pass).await;
            self.absorb(id, pass, result).map(|_| ())
        }
        .boxed()
    }

    async fn visit_children(
        &self,
        visits: Vec<BoxFuture<'_, Result<(), ComponentError>>>,
    ) -> Result<(), ComponentError> {
        if self.config.concurrent_siblings {
            try_join_all(visits).await?;
        } else {
            for visit in visits {
                visit.await?;
            }
        }
        Ok(())
    }

    async fn run_unpacker(&self, id: ResourceId, pass: &PassState) -> Result<(), ComponentError> {
        let node = self.store.get_node(id).await?;
        pass.visit();
        let Some(unpacker) = self.dispatcher.unpacker_for(node.tags()) else {
            tracing::trace!("No unpacker for {} tagged {}", id, node.tags());
            return Ok(());
        };
        pass.claim(id, unpacker.id())?;

        tracing::debug!("Running unpacker {} on {}", unpacker.id(), id);
        let created = self
            .unpack_and_commit(unpacker.as_ref(), id)
            .await
            .map_err(|err| ComponentError::unpacker(unpacker.id(), id, err))?;
        pass.record_run(created);
        Ok(())
    }

    async fn unpack_and_commit(
        &self,
        unpacker: &dyn Unpacker,
        id: ResourceId,
    ) -> Result<usize, ComponentError> {
        let mut ctx = ComponentContext::new(self.store.clone(), id, unpacker.id(), unpacker.children());
        unpacker.unpack(&mut ctx).await?;
        let summary = self.store.commit(ctx.into_changes()).await?;
        Ok(summary.created.len())
    }

    async fn run_packer(&self, id: ResourceId, pass: &PassState) -> Result<(), ComponentError> {
        self.resolve(id, pass).await?;

        let node = self.store.get_node(id).await?;
        pass.visit();
        let Some(packer) = self.dispatcher.packer_for(node.tags()) else {
            tracing::trace!("No packer for {} tagged {}", id, node.tags());
            return Ok(());
        };
        pass.claim(id, packer.id())?;

        tracing::debug!("Running packer {} on {}", packer.id(), id);
        let created = self
            .pack_and_commit(packer.as_ref(), id, pass)
            .await
            .map_err(|err| ComponentError::packer(packer.id(), id, err))?;
        pass.record_run(created);
        Ok(())
    }

    async fn pack_and_commit(
        &self,
        packer: &dyn Packer,
        id: ResourceId,
        pass: &PassState,
    ) -> Result<usize, ComponentError> {
        let mut ctx = ComponentContext::new(self.store.clone(), id, packer.id(), packer.children());
        packer.pack(&mut ctx).await?;
        let summary = self.store.commit(ctx.into_changes()).await?;
        self.resolve(id, pass).await?;
        Ok(summary.created.len())
    }

    async fn resolve(&self, id: ResourceId, pass: &PassState) -> Result<(), ComponentError> {
        let resolution = self.store.commit_patches(id).await?;
        pass.record_resolution(resolution.patches_applied);
        Ok(())
    }

    fn check_depth(&self, id: ResourceId, depth: usize) -> Result<(), ComponentError> {
        if depth > self.config.max_depth {
            return Err(ComponentError::DepthExceeded {
                resource: id,
                max_depth: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// Apply the fail-fast policy; `Ok(false)` means the failure was recorded
    fn absorb(
        &self,
        id: ResourceId,
        pass: &PassState,
        result: Result<(), ComponentError>,
    ) -> Result<bool, ComponentError> {
        match result {
            Ok(()) => Ok(true),
            Err(err) if self.config.fail_fast || err.is_fatal() => {
                tracing::error!("Pass aborted at {}: {}", id, err);
                Err(err)
            }
            Err(err) => {
                tracing::warn!("Skipping {}: {}", id, err);
                pass.record_failure(id, &err);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Unpacker;
    use crate::dispatcher::ComponentRegistry;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use rpk_patch::ByteRange;
    use rpk_resource::{ChildSpec, ResourceError, ResourceTag, TagSet, GENERIC_BINARY};

    const NESTED: ResourceTag = ResourceTag::new("Nested", &[GENERIC_BINARY]);

    /// Splits a node in half, forever
    struct Halver;

    #[async_trait]
    impl Unpacker for Halver {
        fn id(&self) -> &'static str {
            "Halver"
        }

        fn targets(&self) -> &[ResourceTag] {
            &[NESTED]
        }

        fn children(&self) -> &[ResourceTag] {
            &[NESTED]
        }

        async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
            let len = ctx.get_data_length().await?;
            if len < 2 {
                return Err(ComponentError::InvalidData {
                    resource: ctx.resource_id(),
                    reason: "too short to halve".into(),
                });
            }
            ctx.create_child(ChildSpec::view([NESTED], ByteRange::new(0, len / 2).map_err(ResourceError::from)?))
                .await?;
            Ok(())
        }
    }

    async fn pipeline(config: PipelineConfig, data: &[u8]) -> (Pipeline, ResourceId) {
        let store = Arc::new(InMemoryStore::new());
        let root = store
            .instantiate_root(TagSet::from([NESTED]), data.to_vec(), Vec::new())
            .await
            .unwrap();
        let registry = ComponentRegistry::new().with_unpacker(Arc::new(Halver));
        (Pipeline::new(store, Arc::new(registry)).with_config(config), root)
    }

    #[tokio::test]
    async fn pipeline_depth_limit() {
        let (pipeline, root) = pipeline(PipelineConfig::new().with_max_depth(2), &[0; 64]).await;
        let err = pipeline.unpack_recursively(root).await.unwrap_err();
        assert!(matches!(err, ComponentError::DepthExceeded { max_depth: 2, .. }));
    }

    #[tokio::test]
    async fn pipeline_fail_fast_reports_component() {
        let (pipeline, root) = pipeline(PipelineConfig::new(), &[0; 4]).await;
        let err = pipeline.unpack_recursively(root).await.unwrap_err();

        assert_eq!(err.component(), Some("Halver"));
        assert!(matches!(
            err.root_cause(),
            ComponentError::InvalidData { .. }
        ));
    }

    #[tokio::test]
    async fn pipeline_absorbs_failures_without_fail_fast() {
        let (pipeline, root) =
            pipeline(PipelineConfig::new().with_fail_fast(false), &[0; 4]).await;
        let report = pipeline.unpack_recursively(root).await.unwrap();

        // 4 -> 2 -> 1, the last split fails
        assert_eq!(report.components_run, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].component, Some("Halver"));
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn pipeline_single_unpack_does_not_recurse() {
        let (pipeline, root) = pipeline(PipelineConfig::new(), &[0; 8]).await;
        let report = pipeline.unpack(root).await.unwrap();
        assert_eq!(report.components_run, 1);
        assert_eq!(report.children_created, 1);

        let child = pipeline.store().get_node(root).await.unwrap().children()[0];
        assert!(pipeline.store().get_node(child).await.unwrap().children().is_empty());
    }
}
