//! Scrambled flash components
//!
//! Flash dumps whose contents were scrambled with a cycled pattern of
//! simple per-segment transforms.
//!
//! - [`ScrambledFlashUnpacker`] decodes a `ScrambledFlash` resource into a
//!   `ScrambledFlashLogicalData` child
//! - [`ScrambledFlashLogicalDataPacker`] re-encodes the logical data into a
//!   `ScrambledFlashPackedData` sibling
//! - [`ScrambledFlashPacker`] overwrites the flash resource with the most
//!   recent packed sibling

use crate::component::{Packer, Unpacker};
use crate::context::ComponentContext;
use crate::dispatcher::ComponentRegistry;
use crate::error::ComponentError;
use async_trait::async_trait;
use rpk_codec::{descramble, scramble, AlgorithmRegistry, EncodingPattern, ScrambleConfig};
use rpk_patch::Patch;
use rpk_resource::{
    AttributeRegistry, AttributeValue, ChildSpec, ResourceAttributes, ResourceError, ResourceTag,
    GENERIC_BINARY,
};
use std::sync::Arc;

/// Scrambled flash dump
pub const SCRAMBLED_FLASH: ResourceTag = ResourceTag::new("ScrambledFlash", &[GENERIC_BINARY]);

/// Descrambled contents of a flash dump
pub const SCRAMBLED_FLASH_LOGICAL_DATA: ResourceTag =
    ResourceTag::new("ScrambledFlashLogicalData", &[GENERIC_BINARY]);

/// Re-scrambled contents waiting to replace the flash dump
pub const SCRAMBLED_FLASH_PACKED_DATA: ResourceTag =
    ResourceTag::new("ScrambledFlashPackedData", &[GENERIC_BINARY]);

/// How a flash dump is scrambled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrambledFlashAttributes {
    /// Pattern steps cycled over the dump
    pub pattern: Vec<EncodingPattern>,
}

impl ScrambledFlashAttributes {
    /// Create from a pattern list
    #[must_use]
    pub fn new(pattern: Vec<EncodingPattern>) -> Self {
        Self { pattern }
    }

    /// Build from a scramble config
    ///
    /// # Errors
    /// Unknown algorithms or malformed keys in `config`.
    pub fn from_config(
        config: &ScrambleConfig,
        algorithms: &AlgorithmRegistry,
    ) -> Result<Self, ComponentError> {
        Ok(Self::new(config.build(algorithms)?))
    }
}

impl ResourceAttributes for ScrambledFlashAttributes {
    const KIND: &'static str = "ScrambledFlashAttributes";
}

/// Decodes a scrambled flash dump into its logical data
#[derive(Debug, Default)]
pub struct ScrambledFlashUnpacker;

#[async_trait]
impl Unpacker for ScrambledFlashUnpacker {
    fn id(&self) -> &'static str {
        "ScrambledFlashUnpacker"
    }

    fn targets(&self) -> &[ResourceTag] {
        &[SCRAMBLED_FLASH]
    }

    fn children(&self) -> &[ResourceTag] {
        &[SCRAMBLED_FLASH_LOGICAL_DATA]
    }

    async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        let attributes = ctx
            .get_attributes::<ScrambledFlashAttributes>()
            .await
            .map_err(|err| ComponentError::unpacker(self.id(), ctx.resource_id(), err))?;
        let data = ctx.get_data().await?;
        let logical = descramble(&data, &attributes.pattern)?;

        tracing::debug!(
            "Descrambled {} bytes of {} with {} pattern steps",
            data.len(),
            ctx.resource_id(),
            attributes.pattern.len()
        );
        ctx.create_child(
            ChildSpec::owned([SCRAMBLED_FLASH_LOGICAL_DATA], logical)
                .with_attributes(AttributeValue::new(attributes)),
        )
        .await?;
        Ok(())
    }
}

/// Re-encodes logical data into a packed sibling under the flash dump
#[derive(Debug, Default)]
pub struct ScrambledFlashLogicalDataPacker;

#[async_trait]
impl Packer for ScrambledFlashLogicalDataPacker {
    fn id(&self) -> &'static str {
        "ScrambledFlashLogicalDataPacker"
    }

    fn targets(&self) -> &[ResourceTag] {
        &[SCRAMBLED_FLASH_LOGICAL_DATA]
    }

    fn children(&self) -> &[ResourceTag] {
        &[SCRAMBLED_FLASH_PACKED_DATA]
    }

    async fn pack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        let attributes = ctx
            .get_attributes::<ScrambledFlashAttributes>()
            .await
            .map_err(|err| ComponentError::packer(self.id(), ctx.resource_id(), err))?;
        let data = ctx.get_data().await?;
        let packed = scramble(&data, &attributes.pattern)?;

        let parent = ctx.parent().await?.ok_or_else(|| ComponentError::InvalidData {
            resource: ctx.resource_id(),
            reason: "logical data has no flash resource above it".into(),
        })?;
        ctx.create_child_of(
            parent,
            ChildSpec::owned([SCRAMBLED_FLASH_PACKED_DATA], packed)
                .with_attributes(AttributeValue::new(attributes)),
        )
        .await?;
        Ok(())
    }
}

/// Overwrites a flash dump with its most recent packed sibling
#[derive(Debug, Default)]
pub struct ScrambledFlashPacker;

#[async_trait]
impl Packer for ScrambledFlashPacker {
    fn id(&self) -> &'static str {
        "ScrambledFlashPacker"
    }

    fn targets(&self) -> &[ResourceTag] {
        &[SCRAMBLED_FLASH]
    }

    fn children(&self) -> &[ResourceTag] {
        &[]
    }

    async fn pack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError> {
        let packed = ctx.children_with_tag(SCRAMBLED_FLASH_PACKED_DATA).await?;
        let Some(latest) = packed.last().copied() else {
            tracing::debug!("No packed data under {}; leaving it as is", ctx.resource_id());
            return Ok(());
        };

        let data = ctx.get_data_of(latest).await?;
        let original_len = ctx.get_data_length().await?;
        ctx.queue_patch(Patch::overwrite(original_len, data)).await
    }
}

/// Register the scrambled flash components
pub fn register_components(registry: &mut ComponentRegistry) {
    registry.register_unpacker(Arc::new(ScrambledFlashUnpacker));
    registry.register_packer(Arc::new(ScrambledFlashLogicalDataPacker));
    registry.register_packer(Arc::new(ScrambledFlashPacker));
}

/// Register the scrambled flash attribute kinds
///
/// # Errors
/// [`ResourceError::AttributeKindCollision`] if the kind name is taken.
pub fn register_attributes(registry: &mut AttributeRegistry) -> Result<(), ResourceError> {
    registry.register::<ScrambledFlashAttributes>("scramble pattern of a flash dump")
}
