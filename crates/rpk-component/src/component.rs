//! Unpacker and packer contracts
//!
//! An [`Unpacker`] decodes a resource into typed children; a [`Packer`]
//! re-encodes a resource after its children were packed, either by
//! queuing a patch over its own bytes or by producing a sibling that an
//! ancestor's packer consumes.

use crate::context::ComponentContext;
use crate::error::ComponentError;
use async_trait::async_trait;
use rpk_resource::{ResourceTag, TagSet};

/// Decoder for resources carrying one of `targets`
///
/// # Contract
/// - Reads data and attributes through the context
/// - Every child it creates carries tags covered by `children`
/// - Runs at most once per resource per pass
#[async_trait]
pub trait Unpacker: Send + Sync {
    /// Component id used in errors and logs
    fn id(&self) -> &'static str;

    /// Tags this unpacker applies to
    fn targets(&self) -> &[ResourceTag];

    /// Tags of the children it may create
    fn children(&self) -> &[ResourceTag];

    /// Decode the context's resource
    async fn unpack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError>;
}

/// Encoder for resources carrying one of `targets`
///
/// # Contract
/// - Runs only after every child of the resource has been packed and the
///   resource's own pending patches were resolved
/// - Patches it queues are resolved right after it returns
#[async_trait]
pub trait Packer: Send + Sync {
    /// Component id used in errors and logs
    fn id(&self) -> &'static str;

    /// Tags this packer applies to
    fn targets(&self) -> &[ResourceTag];

    /// Tags of the children it may create
    fn children(&self) -> &[ResourceTag];

    /// Re-encode the context's resource
    async fn pack(&self, ctx: &mut ComponentContext) -> Result<(), ComponentError>;
}

/// Check if a component targeting `targets` applies to a node tagged `tags`
#[inline]
#[must_use]
pub fn applies_to(targets: &[ResourceTag], tags: &TagSet) -> bool {
    tags.satisfies_any(targets)
}
