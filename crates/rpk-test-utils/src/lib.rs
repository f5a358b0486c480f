//! Testing utilities for RPK workspace
//!
//! Shared fixtures: scrambled flash setups and small recording components
//! for checking pass ordering.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rpk_codec::{scramble, AddKey, EncodingPattern, Identity, Reverse, Xor};
use rpk_component::scrambled_flash::{
    register_attributes, register_components, ScrambledFlashAttributes, SCRAMBLED_FLASH,
};
use rpk_component::{
    ComponentContext, ComponentError, ComponentRegistry, InMemoryStore, Packer, Pipeline,
    PipelineConfig, ResourceStore, Unpacker,
};
use rpk_patch::{ByteRange, Patch};
use rpk_resource::{
    AttributeRegistry, AttributeValue, ChildSpec, ResourceAttributes, ResourceError, ResourceId,
    ResourceTag, TagSet,
};
use std::sync::Arc;

/// Pattern mixing keyed, keyless, fixed and terminal steps
pub fn sample_pattern() -> Vec<EncodingPattern> {
    vec![
        EncodingPattern::new(Arc::new(Xor), vec![0xA5, 0x5A], 5),
        EncodingPattern::new(Arc::new(Reverse), Vec::new(), 3),
        EncodingPattern::new(Arc::new(AddKey), vec![0x10], 4),
        EncodingPattern::new(Arc::new(Identity), Vec::new(), 2),
    ]
}

/// Scrambled bytes of `logical` under [`sample_pattern`]
pub fn scrambled_flash_fixture(logical: &[u8]) -> (Vec<u8>, ScrambledFlashAttributes) {
    let attributes = ScrambledFlashAttributes::new(sample_pattern());
    let scrambled = scramble(logical, &attributes.pattern).unwrap();
    (scrambled, attributes)
}

/// Store and pipeline with the scrambled flash components registered
pub fn scrambled_flash_pipeline(config: PipelineConfig) -> (Arc<InMemoryStore>, Pipeline) {
    let mut kinds = AttributeRegistry::new();
    register_attributes(&mut kinds).unwrap();
    let store = Arc::new(InMemoryStore::with_registry(Arc::new(kinds)));

    let mut components = ComponentRegistry::new();
    register_components(&mut components);

    let pipeline = Pipeline::new(store.clone(), Arc::new(components)).with_config(config);
    (store, pipeline)
}

/// Root `ScrambledFlash` resource holding `logical` scrambled
pub async fn instantiate_flash(store: &InMemoryStore, logical: &[u8]) -> ResourceId {
    let (scrambled, attributes) = scrambled_flash_fixture(logical);
    store
        .instantiate_root(
            TagSet::from([SCRAMBLED_FLASH]),
            scrambled,
            vec![AttributeValue::new(attributes)],
        )
        .await
        .unwrap()
}

/// What a recording component saw when it ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub component: &'static str,
    pub resource: ResourceId,
    pub observed: Vec<u8>,
}

/// Shared, ordered log of component runs
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, component: &'static str, resource: ResourceId, observed: Vec<u8>) {
        self.0.lock().push(Event {
            component,
            resource,
            observed,
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn components(&self) -> Vec<&'static str> {
        self.0.lock().iter().map(|e| e.component).collect()
    }
}

/// Where a child created by [`ViewUnpacker`] sits in its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub range: ByteRange,
}

impl ResourceAttributes for Placement {
    const KIND: &'static str = "Placement";
}

/// Creates one view child covering the data minus `trim` bytes each side
pub struct ViewUnpacker {
    pub id: &'static str,
    pub target: ResourceTag,
    pub child: ResourceTag,
    pub trim: usize,
    pub log: EventLog,
}

#[async_trait]
impl Unpacker for ViewUnpacker {
    fn id(&self) -> &'static str {
        self.id
    }

    fn targets(&self) -> &[ResourceTag] {
        std::slice::from_ref(&self.target)
    }

    fn children(&self) -> &[ResourceTag] {
        std::slice::from_ref(&self.child)
    }

    async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        let data = ctx.get_data().await?;
        let end = data.len().saturating_sub(self.trim);
        let range = ByteRange::new(self.trim.min(end), end).map_err(ResourceError::from)?;
        ctx.create_child(
            ChildSpec::view(TagSet::from([self.child]), range)
                .with_attributes(AttributeValue::new(Placement { range })),
        )
        .await?;
        self.log.record(self.id, ctx.resource_id(), data);
        Ok(())
    }
}

/// Patches its parent at its [`Placement`] with its (optionally
/// upper-cased) bytes, recording the bytes it observed
pub struct SpliceBackPacker {
    pub id: &'static str,
    pub target: ResourceTag,
    pub uppercase: bool,
    pub log: EventLog,
}

#[async_trait]
impl Packer for SpliceBackPacker {
    fn id(&self) -> &'static str {
        self.id
    }

    fn targets(&self) -> &[ResourceTag] {
        std::slice::from_ref(&self.target)
    }

    fn children(&self) -> &[ResourceTag] {
        &[]
    }

    async fn pack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        let data = ctx.get_data().await?;
        self.log.record(self.id, ctx.resource_id(), data.clone());

        let node = ctx.node().await?;
        let (Some(parent), Ok(placement)) = (node.parent(), node.attribute::<Placement>()) else {
            return Ok(());
        };
        let replacement = if self.uppercase {
            data.to_ascii_uppercase()
        } else {
            data
        };
        ctx.queue_patch_on(parent, Patch::new(placement.range, replacement))
            .await
    }
}
