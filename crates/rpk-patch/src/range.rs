//! Byte ranges for addressing within resource data
//!
//! Provides [`ByteRange`], a half-open `[start, end)` interval over a byte buffer.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Half-open byte interval `[start, end)`
///
/// Used to address the bytes a patch replaces and the bytes a derived
/// resource views within its parent.
///
/// # Examples
/// - `[0, 4)` covers bytes 0, 1, 2, 3
/// - `[7, 7)` is empty and marks an insertion point before byte 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    /// Create new range
    ///
    /// # Errors
    /// Returns error if `start > end`
    #[inline]
    pub fn new(start: usize, end: usize) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range of `len` bytes starting at `start`
    ///
    /// # Errors
    /// Returns error if `start + len` overflows
    #[inline]
    pub fn from_len(start: usize, len: usize) -> Result<Self, RangeError> {
        let end = start
            .checked_add(len)
            .ok_or(RangeError::Overflow { start, len })?;
        Ok(Self { start, end })
    }

    /// Range covering a whole buffer of `len` bytes
    #[inline]
    #[must_use]
    pub const fn whole(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    /// Start offset (inclusive)
    #[inline]
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// End offset (exclusive)
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Number of bytes covered
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if range covers no bytes
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if range fits in a buffer of `len` bytes
    #[inline]
    #[must_use]
    pub const fn fits_within(&self, len: usize) -> bool {
        self.end <= len
    }

    /// Check if `other` lies entirely inside this range
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if two ranges claim the same bytes
    ///
    /// Non-empty ranges overlap when they share at least one byte. An empty
    /// range (insertion point) overlaps another empty range at the same
    /// offset, or a non-empty range it falls strictly inside of. Ranges that
    /// merely touch (`[0, 4)` and `[4, 8)`) do not overlap.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Shift range right by `offset` bytes
    ///
    /// # Errors
    /// Returns error on overflow
    #[inline]
    pub fn shifted(&self, offset: usize) -> Result<Self, RangeError> {
        let start = self
            .start
            .checked_add(offset)
            .ok_or(RangeError::Overflow { start: self.start, len: offset })?;
        Self::from_len(start, self.len())
    }

    /// Convert to a standard library range for slicing
    #[inline]
    #[must_use]
    pub const fn as_std(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl Display for ByteRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

impl From<ByteRange> for std::ops::Range<usize> {
    fn from(range: ByteRange) -> Self {
        range.as_std()
    }
}

/// Errors constructing byte ranges
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// Start is after end
    #[error("inverted range: start {start} > end {end}")]
    Inverted { start: usize, end: usize },

    /// End offset does not fit in `usize`
    #[error("range overflow: {start} + {len}")]
    Overflow { start: usize, len: usize },
}
