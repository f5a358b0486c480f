//! Patch queue and ordered resolution
//!
//! Each resource owns one [`PatchQueue`]. Patches are checked for overlap
//! when queued (single writer per byte) and applied in queue order when the
//! resource is resolved.

use crate::patch::Patch;
use crate::range::{ByteRange, RangeError};

/// Pending patches against one buffer
///
/// # Invariants
/// - No two queued patches overlap (checked at queue time, re-checked at
///   resolution time)
/// - Every queued range fits in the buffer length it was queued against
/// - Queue order is resolution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchQueue {
    patches: Vec<Patch>,
}

impl PatchQueue {
    /// Create empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending patches
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Check if nothing is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Pending patches in queue order
    #[inline]
    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Check whether `patch` could be queued against a buffer of `data_len` bytes
    ///
    /// # Errors
    /// - [`PatchError::OutOfBounds`] if the range does not fit
    /// - [`PatchError::OverlappingPatch`] if it overlaps a queued patch
    pub fn check(&self, patch: &Patch, data_len: usize) -> Result<(), PatchError> {
        check_bounds(patch.range(), data_len)?;

        if let Some(existing) = self
            .patches
            .iter()
            .find(|queued| queued.range().overlaps(&patch.range()))
        {
            return Err(PatchError::OverlappingPatch {
                queued: existing.range(),
                requested: patch.range(),
            });
        }

        Ok(())
    }

    /// Queue a patch, returning its position in resolution order
    ///
    /// # Errors
    /// See [`PatchQueue::check`]; the queue is unchanged on error.
    pub fn queue(&mut self, patch: Patch, data_len: usize) -> Result<usize, PatchError> {
        self.check(&patch, data_len)?;
        self.patches.push(patch);
        Ok(self.patches.len() - 1)
    }

    /// Queue several patches atomically
    ///
    /// Either every patch is queued or none is.
    ///
    /// # Errors
    /// Returns the first bounds or overlap failure, against both the queue
    /// and earlier patches in `patches`.
    pub fn queue_all(&mut self, patches: Vec<Patch>, data_len: usize) -> Result<(), PatchError> {
        let mut staged = self.clone();
        for patch in patches {
            staged.queue(patch, data_len)?;
        }
        *self = staged;
        Ok(())
    }

    /// Validate the whole queue against a buffer of `data_len` bytes
    ///
    /// # Errors
    /// Returns [`PatchError::PatchConflict`] if any pair overlaps or
    /// [`PatchError::OutOfBounds`] if a range no longer fits.
    pub fn plan(&self, data_len: usize) -> Result<ResolutionPlan, PatchError> {
        validate_patches(&self.patches, data_len)
    }

    /// Apply all pending patches to `base` in queue order
    ///
    /// On success the queue is emptied. On failure it is left untouched so
    /// the caller can inspect or discard the patch set.
    ///
    /// # Errors
    /// See [`PatchQueue::plan`].
    pub fn resolve(&mut self, base: &[u8]) -> Result<Vec<u8>, PatchError> {
        let resolved = apply_in_order(base, &self.patches)?;
        self.patches.clear();
        Ok(resolved)
    }

    /// Drop all pending patches
    #[inline]
    pub fn clear(&mut self) {
        self.patches.clear();
    }
}

/// Summary of a validated patch set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPlan {
    /// Number of patches to apply
    pub patch_count: usize,

    /// Net change in buffer length
    pub size_delta: isize,

    /// Buffer length after resolution
    pub resolved_len: usize,
}

/// Validate that patches are in bounds and pairwise disjoint
///
/// # Performance
/// O(n²) in the number of patches. Queues are short in practice (one patch
/// per repacked child).
///
/// # Errors
/// See [`PatchQueue::plan`].
pub fn validate_patches(patches: &[Patch], data_len: usize) -> Result<ResolutionPlan, PatchError> {
    for patch in patches {
        check_bounds(patch.range(), data_len)?;
    }

    for i in 0..patches.len() {
        for j in (i + 1)..patches.len() {
            let (a, b) = (patches[i].range(), patches[j].range());
            if a.overlaps(&b) {
                return Err(PatchError::conflict(ConflictDiagnostic {
                    kind: ConflictKind::OverlappingRanges,
                    involved_patches: vec![i, j],
                    description: format!("{a} overlaps {b}"),
                }));
            }
        }
    }

    let size_delta: isize = patches.iter().map(Patch::size_delta).sum();
    let resolved_len = data_len
        .checked_add_signed(size_delta)
        .ok_or_else(|| {
            PatchError::conflict(ConflictDiagnostic {
                kind: ConflictKind::LengthUnderflow,
                involved_patches: (0..patches.len()).collect(),
                description: format!("net size change {size_delta} on {data_len} bytes"),
            })
        })?;

    Ok(ResolutionPlan {
        patch_count: patches.len(),
        size_delta,
        resolved_len,
    })
}

/// Apply patches to `base` in the given order
///
/// Ranges are interpreted in `base` coordinates. Because patches are
/// disjoint, each one is shifted by the size change of already-applied
/// patches that lie entirely before it.
///
/// # Errors
/// See [`validate_patches`].
pub fn apply_in_order(base: &[u8], patches: &[Patch]) -> Result<Vec<u8>, PatchError> {
    let plan = validate_patches(patches, base.len())?;

    let mut out = base.to_vec();
    let mut applied: Vec<(usize, isize)> = Vec::with_capacity(patches.len());

    for patch in patches {
        let range = patch.range();
        let shift: isize = applied
            .iter()
            .filter(|(end, _)| *end <= range.start())
            .map(|(_, delta)| delta)
            .sum();

        // validated above: shifted ranges stay inside `out`
        let start = range.start().checked_add_signed(shift).unwrap_or(0);
        let end = start + range.len();
        out.splice(start..end, patch.replacement().iter().copied());
        applied.push((range.end(), patch.size_delta()));
    }

    debug_assert_eq!(out.len(), plan.resolved_len);
    Ok(out)
}

fn check_bounds(range: ByteRange, data_len: usize) -> Result<(), PatchError> {
    if range.fits_within(data_len) {
        Ok(())
    } else {
        Err(PatchError::OutOfBounds { range, data_len })
    }
}

/// Errors queuing or resolving patches
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// New patch overlaps one already queued (rejected at queue time)
    #[error("patch {requested} overlaps queued patch {queued}")]
    OverlappingPatch {
        queued: ByteRange,
        requested: ByteRange,
    },

    /// Patch set cannot be resolved
    #[error("patch conflict: {diagnostic}")]
    PatchConflict { diagnostic: ConflictDiagnostic },

    /// Patch range extends past the buffer
    #[error("patch range {range} out of bounds for {data_len} bytes")]
    OutOfBounds { range: ByteRange, data_len: usize },

    /// Malformed range
    #[error(transparent)]
    Range(#[from] RangeError),
}

impl PatchError {
    /// Create conflict error from diagnostic
    #[inline]
    #[must_use]
    pub fn conflict(diagnostic: ConflictDiagnostic) -> Self {
        Self::PatchConflict { diagnostic }
    }

    /// Check if error indicates a broken patch set
    ///
    /// These must not be retried without changing the patches.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OverlappingPatch { .. } | Self::PatchConflict { .. })
    }
}

/// Detailed resolution failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDiagnostic {
    /// Kind of conflict
    pub kind: ConflictKind,

    /// Indices (queue order) of the patches involved
    pub involved_patches: Vec<usize>,

    /// Human-readable description
    pub description: String,
}

impl std::fmt::Display for ConflictDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.description)
    }
}

/// Types of resolution conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Two patches claim the same bytes
    OverlappingRanges,

    /// Net size change would make the buffer negative length
    LengthUnderflow,
}
