//! Deferred byte-range replacements
//!
//! Provides [`Patch`], a request to replace one range of a buffer with new
//! bytes at resolution time.

use crate::range::ByteRange;
use std::fmt;

/// Deferred replacement of a byte range
///
/// NOT applied when created - patches wait in a [`PatchQueue`](crate::PatchQueue)
/// until the owning resource is resolved.
///
/// # Invariants
/// - `range` is expressed in the coordinates of the buffer as it was when
///   the patch was queued (pre-resolution)
/// - `replacement` may be shorter or longer than `range`
#[derive(Clone, PartialEq, Eq)]
pub struct Patch {
    /// Bytes being replaced
    range: ByteRange,

    /// Bytes written in their place
    replacement: Vec<u8>,

    /// Component or caller that requested the patch
    origin: Option<String>,
}

impl Patch {
    /// Create new patch
    #[inline]
    #[must_use]
    pub fn new(range: ByteRange, replacement: impl Into<Vec<u8>>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
            origin: None,
        }
    }

    /// Patch that overwrites a whole buffer of `len` bytes
    #[inline]
    #[must_use]
    pub fn overwrite(len: usize, replacement: impl Into<Vec<u8>>) -> Self {
        Self::new(ByteRange::whole(len), replacement)
    }

    /// Tag patch with the component that requested it
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Target range
    #[inline]
    #[must_use]
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Replacement bytes
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }

    /// Requesting component, if known
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Change in buffer length once applied
    #[inline]
    #[must_use]
    pub fn size_delta(&self) -> isize {
        self.replacement.len() as isize - self.range.len() as isize
    }

    /// Check if patch changes the buffer length
    #[inline]
    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.replacement.len() != self.range.len()
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("range", &self.range)
            .field("replacement_len", &self.replacement.len())
            .field("origin", &self.origin)
            .finish()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {} bytes", self.range, self.replacement.len())?;
        if let Some(origin) = &self.origin {
            write!(f, " ({origin})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_new() {
        let range = ByteRange::new(2, 4).unwrap();
        let patch = Patch::new(range, vec![0xAA, 0xBB]);

        assert_eq!(patch.range(), range);
        assert_eq!(patch.replacement(), &[0xAA, 0xBB]);
        assert!(patch.origin().is_none());
        assert!(!patch.is_resizing());
    }

    #[test]
    fn patch_overwrite_covers_whole_buffer() {
        let patch = Patch::overwrite(8, vec![1, 2, 3]);
        assert_eq!(patch.range(), ByteRange::whole(8));
        assert_eq!(patch.size_delta(), -5);
        assert!(patch.is_resizing());
    }

    #[test]
    fn patch_with_origin() {
        let patch = Patch::new(ByteRange::whole(1), vec![0]).with_origin("TestPacker");
        assert_eq!(patch.origin(), Some("TestPacker"));
        assert!(patch.to_string().contains("TestPacker"));
    }

    #[test]
    fn patch_debug_hides_payload() {
        let patch = Patch::new(ByteRange::whole(2), vec![0xFF; 64]);
        let debug = format!("{patch:?}");
        assert!(debug.contains("replacement_len: 64"));
    }
}
