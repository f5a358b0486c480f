//! Error types for the resource tree

use crate::id::ResourceId;
use rpk_patch::{ByteRange, PatchError, RangeError};

/// Resource tree errors
///
/// Every variant that concerns a node names it, so failures surfaced to the
/// scheduler always carry the resource id.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// No live node with this id
    #[error("{0} not found")]
    NotFound(ResourceId),

    /// View whose ancestor is gone
    #[error("{resource} is not materialized: ancestor {missing} no longer exists")]
    NotMaterialized {
        resource: ResourceId,
        missing: ResourceId,
    },

    /// Attribute kind absent (recoverable precondition failure)
    #[error("{resource} has no {kind} attributes")]
    AttributeNotFound {
        resource: ResourceId,
        kind: &'static str,
    },

    /// Attribute kind already attached
    #[error("{resource} already has {kind} attributes")]
    AttributeAlreadyPresent {
        resource: ResourceId,
        kind: &'static str,
    },

    /// Kind name claimed by two different types
    #[error("attribute kind '{kind}' registered as {registered}, attempted as {attempted}")]
    AttributeKindCollision {
        kind: &'static str,
        registered: &'static str,
        attempted: &'static str,
    },

    /// Kind name unknown to the registry
    #[error("attribute kind '{kind}' is not registered")]
    UnregisteredAttributeKind { kind: &'static str },

    /// Child tag outside the creating component's declared set
    #[error("child of {parent} tagged {tag} is not among declared children [{declared}]")]
    UndeclaredChildTag {
        parent: ResourceId,
        tag: &'static str,
        declared: String,
    },

    /// Child created without any tag
    #[error("child of {parent} has no tags")]
    UntaggedChild { parent: ResourceId },

    /// Derived range outside the data it views
    #[error("range {range} exceeds data length {parent_len} of {resource}")]
    RangeOutOfBounds {
        resource: ResourceId,
        range: ByteRange,
        parent_len: usize,
    },

    /// Root resources cannot be views
    #[error("{0} has no parent to view")]
    OrphanView(ResourceId),

    /// Id already in use
    #[error("{0} already exists")]
    DuplicateId(ResourceId),

    /// Patch queue/resolution failure
    #[error("patch failed on {resource}: {source}")]
    Patch {
        resource: ResourceId,
        #[source]
        source: PatchError,
    },

    /// Malformed range
    #[error(transparent)]
    Range(#[from] RangeError),
}

impl ResourceError {
    /// Check if the caller can recover without changing its inputs
    ///
    /// Missing attributes can be defaulted; dangling views can be
    /// re-fetched from the store.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound { .. } | Self::NotMaterialized { .. }
        )
    }

    /// Underlying patch error, if any
    #[inline]
    #[must_use]
    pub fn patch_error(&self) -> Option<&PatchError> {
        match self {
            Self::Patch { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Resource the error concerns, if any
    #[must_use]
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::NotFound(id) | Self::OrphanView(id) | Self::DuplicateId(id) => Some(*id),
            Self::NotMaterialized { resource, .. }
            | Self::AttributeNotFound { resource, .. }
            | Self::AttributeAlreadyPresent { resource, .. }
            | Self::RangeOutOfBounds { resource, .. }
            | Self::Patch { resource, .. } => Some(*resource),
            Self::UndeclaredChildTag { parent, .. } | Self::UntaggedChild { parent } => {
                Some(*parent)
            }
            Self::AttributeKindCollision { .. }
            | Self::UnregisteredAttributeKind { .. }
            | Self::Range(_) => None,
        }
    }
}
