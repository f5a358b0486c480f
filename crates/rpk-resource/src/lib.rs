//! RPK Resource Tree
//!
//! In-memory model of an unpacked binary: a tree of typed nodes whose bytes
//! are owned or viewed from the parent, with per-node attributes and
//! pending patches.
//!
//! # Core Concepts
//!
//! - [`ResourceTag`]: Semantic kind of a node, arranged in a hierarchy
//! - [`ResourceAttributes`]: Typed structured parameters, one per kind
//! - [`ResourceArena`]: Node storage; structural changes commit through a
//!   [`ChangeSet`] all-or-nothing
//! - [`ResourceData`]: Owned bytes or a view into the parent's bytes
//!
//! # Example
//!
//! ```rust
//! use rpk_patch::{ByteRange, Patch};
//! use rpk_resource::{ChildSpec, ResourceArena, ResourceTag, GENERIC_BINARY};
//!
//! const SECTION: ResourceTag = ResourceTag::new("Section", &[GENERIC_BINARY]);
//!
//! let mut arena = ResourceArena::new();
//! let root = arena
//!     .create_root(ChildSpec::owned([GENERIC_BINARY], b"hello world".to_vec()))
//!     .unwrap();
//! let word = arena
//!     .create_child(root, ChildSpec::view([SECTION], ByteRange::new(6, 11).unwrap()), &[SECTION])
//!     .unwrap();
//! assert_eq!(arena.data(word).unwrap(), b"world");
//!
//! arena.queue_patch(root, Patch::new(ByteRange::new(0, 5).unwrap(), b"HELLO".to_vec())).unwrap();
//! arena.resolve_patches(root).unwrap();
//! assert_eq!(arena.data(root).unwrap(), b"HELLO world");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod arena;
mod attributes;
mod digest;
mod error;
mod id;
mod node;
mod registry;
mod tag;

// Re-exports
pub use arena::{Change, ChangeSet, CommitSummary, PatchResolution, ResourceArena};
pub use attributes::{AttributeKind, AttributeStore, AttributeValue, ResourceAttributes};
pub use digest::{DataDigest, DigestError};
pub use error::ResourceError;
pub use id::ResourceId;
pub use node::{ChildSpec, ResourceData, ResourceNode};
pub use registry::{AttributeRegistry, RegisteredKind};
pub use tag::{ResourceTag, TagSet, GENERIC_BINARY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
