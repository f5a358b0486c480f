//! Error types for component runs
//!
//! Component failures surfaced by the pipeline always carry:
//! - the component id
//! - the resource id it ran on
//! - the underlying condition as the error source

use rpk_codec::CodecError;
use rpk_patch::PatchError;
use rpk_resource::{ResourceError, ResourceId};
use std::path::PathBuf;

/// Component and pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// Unpacker run failed; nothing it staged was committed
    #[error("unpacker {component} failed on {resource}: {cause}")]
    UnpackerError {
        component: &'static str,
        resource: ResourceId,
        #[source]
        cause: Box<ComponentError>,
    },

    /// Packer run failed; nothing it staged was committed
    #[error("packer {component} failed on {resource}: {cause}")]
    PackerError {
        component: &'static str,
        resource: ResourceId,
        #[source]
        cause: Box<ComponentError>,
    },

    /// Resource data does not have the expected shape
    #[error("invalid data in {resource}: {reason}")]
    InvalidData { resource: ResourceId, reason: String },

    /// Resource tree failure
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Codec failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Pass recursed deeper than configured
    #[error("maximum depth {max_depth} exceeded at {resource}")]
    DepthExceeded { resource: ResourceId, max_depth: usize },

    /// Second run of the same kind on one node within a pass
    #[error("{component} already ran on {resource} in this pass")]
    AlreadyRun {
        component: &'static str,
        resource: ResourceId,
    },

    /// Config file could not be read
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for the schema
    #[error("invalid pipeline config: {0}")]
    Config(#[from] toml::de::Error),
}

impl ComponentError {
    /// Wrap a failure raised while unpacking
    ///
    /// Errors that already name their component are passed through.
    #[must_use]
    pub fn unpacker(component: &'static str, resource: ResourceId, cause: Self) -> Self {
        if cause.component().is_some() {
            return cause;
        }
        Self::UnpackerError {
            component,
            resource,
            cause: Box::new(cause),
        }
    }

    /// Wrap a failure raised while packing
    ///
    /// Errors that already name their component are passed through.
    #[must_use]
    pub fn packer(component: &'static str, resource: ResourceId, cause: Self) -> Self {
        if cause.component().is_some() {
            return cause;
        }
        Self::PackerError {
            component,
            resource,
            cause: Box::new(cause),
        }
    }

    /// Check if the same run could succeed later without changing inputs
    ///
    /// Nothing is retried automatically; this only classifies.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnpackerError { cause, .. } | Self::PackerError { cause, .. } => {
                cause.is_retryable()
            }
            Self::Resource(err) => matches!(err, ResourceError::NotMaterialized { .. }),
            Self::Io { .. } => true,
            _ => false,
        }
    }

    /// Check if the error aborts the whole pass regardless of `fail_fast`
    ///
    /// A rejected or conflicting patch leaves an ancestor's queue incomplete,
    /// so it is fatal even when raised inside a component run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::UnpackerError { cause, .. } | Self::PackerError { cause, .. } => cause.is_fatal(),
            Self::Resource(err) => err.patch_error().is_some_and(PatchError::is_fatal),
            Self::DepthExceeded { .. } | Self::AlreadyRun { .. } | Self::Config(_) => true,
            _ => false,
        }
    }

    /// Id of the failing component, if known
    #[must_use]
    pub fn component(&self) -> Option<&'static str> {
        match self {
            Self::UnpackerError { component, .. }
            | Self::PackerError { component, .. }
            | Self::AlreadyRun { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// Resource the failure concerns, if known
    #[must_use]
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::UnpackerError { resource, .. }
            | Self::PackerError { resource, .. }
            | Self::InvalidData { resource, .. }
            | Self::DepthExceeded { resource, .. }
            | Self::AlreadyRun { resource, .. } => Some(*resource),
            Self::Resource(err) => err.resource(),
            _ => None,
        }
    }

    /// Innermost error, unwrapping component wrappers
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::UnpackerError { cause, .. } | Self::PackerError { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }
}
