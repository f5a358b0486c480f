//! RPK Codec
//!
//! Pattern-driven stream scrambling: an ordered list of
//! `(algorithm, key, length)` steps is cycled over a buffer, each step
//! transforming the next `length` bytes.
//!
//! # Core Concepts
//!
//! - [`EncodingAlgorithm`]: Stateless, reversible per-segment transform
//! - [`EncodingPattern`]: One step of the walk (length 0 = rest of buffer)
//! - [`scramble`] / [`descramble`]: The walk in each direction
//! - [`ScrambleConfig`]: TOML pattern description resolved through an
//!   [`AlgorithmRegistry`]
//!
//! # Example
//!
//! ```rust
//! use rpk_codec::{descramble, scramble, EncodingPattern, Identity, Xor};
//! use std::sync::Arc;
//!
//! let patterns = vec![
//!     EncodingPattern::new(Arc::new(Xor), vec![0x5A], 4),
//!     EncodingPattern::terminal(Arc::new(Identity), Vec::new()),
//! ];
//!
//! let scrambled = scramble(b"firmware image", &patterns).unwrap();
//! assert_eq!(&scrambled[4..], b"ware image");
//! assert_eq!(descramble(&scrambled, &patterns).unwrap(), b"firmware image");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod algorithm;
mod config;
mod error;
mod pattern;
mod registry;
mod scramble;

// Re-exports
pub use algorithm::{AddKey, EncodingAlgorithm, Identity, Invert, Reverse, Xor};
pub use config::{PatternSpec, ScrambleConfig};
pub use error::CodecError;
pub use pattern::EncodingPattern;
pub use registry::AlgorithmRegistry;
pub use scramble::{descramble, scramble, segments, transform, Direction, Segment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
