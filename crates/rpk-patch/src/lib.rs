//! RPK Patch System
//!
//! Deferred, range-scoped byte replacement for resource recomposition.
//!
//! # Core Concepts
//!
//! - [`ByteRange`]: Half-open byte interval within a buffer
//! - [`Patch`]: Request to replace a range with new bytes
//! - [`PatchQueue`]: Per-resource queue with overlap rejection at queue time
//! - [`apply_in_order`]: Resolution in queue order with conflict cross-check
//!
//! # Example
//!
//! ```rust
//! use rpk_patch::{ByteRange, Patch, PatchQueue};
//!
//! let mut queue = PatchQueue::new();
//! queue.queue(Patch::new(ByteRange::new(0, 2).unwrap(), b"AB".to_vec()), 4).unwrap();
//! queue.queue(Patch::new(ByteRange::new(3, 4).unwrap(), b"D".to_vec()), 4).unwrap();
//!
//! let resolved = queue.resolve(b"wxyz").unwrap();
//! assert_eq!(resolved, b"AByD");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod patch;
mod queue;
mod range;

// Re-exports
pub use patch::Patch;
pub use queue::{
    apply_in_order, validate_patches, ConflictDiagnostic, ConflictKind, PatchError, PatchQueue,
    ResolutionPlan,
};
pub use range::{ByteRange, RangeError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
