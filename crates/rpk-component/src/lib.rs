//! RPK Components
//!
//! The unpack/pack component contract and the machinery that runs it:
//! a resource store, a dispatcher selecting components by tag, and a
//! pipeline driving top-down unpack and bottom-up pack passes.
//!
//! # Core Concepts
//!
//! - [`Unpacker`] / [`Packer`]: Components declaring `targets` and `children`
//! - [`ComponentContext`]: Buffered, all-or-nothing view of one run
//! - [`ResourceStore`]: Async store boundary ([`InMemoryStore`] reference)
//! - [`Dispatcher`]: Tag-based component selection ([`ComponentRegistry`])
//! - [`Pipeline`]: Recursive passes producing a [`PassReport`]
//!
//! The [`scrambled_flash`] module is a complete component set for
//! scrambled flash dumps.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod component;
mod config;
mod context;
mod dispatcher;
mod error;
mod pipeline;
mod store;

pub mod scrambled_flash;

// Re-exports
pub use component::{applies_to, Packer, Unpacker};
pub use config::PipelineConfig;
pub use context::ComponentContext;
pub use dispatcher::{ComponentRegistry, Dispatcher};
pub use error::ComponentError;
pub use pipeline::{PassFailure, PassReport, Pipeline};
pub use store::{InMemoryStore, ResourceStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
