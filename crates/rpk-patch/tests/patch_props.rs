//! Property tests for patch resolution.

use proptest::prelude::*;
use rpk_patch::{ByteRange, Patch, PatchError, PatchQueue};

/// Cut `len` bytes into disjoint ranges, keeping every other segment.
fn disjoint_ranges(len: usize, cuts: &[usize]) -> Vec<ByteRange> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (len + 1)).collect();
    points.push(0);
    points.push(len);
    points.sort_unstable();
    points.dedup();

    points
        .windows(2)
        .step_by(2)
        .map(|w| ByteRange::new(w[0], w[1]).unwrap())
        .filter(|r| !r.is_empty())
        .collect()
}

proptest! {
    #[test]
    fn prop_disjoint_patches_touch_only_their_ranges(
        base in proptest::collection::vec(any::<u8>(), 1..256),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
        fill in any::<u8>(),
    ) {
        let ranges = disjoint_ranges(base.len(), &cuts);
        let mut queue = PatchQueue::new();
        for range in &ranges {
            queue.queue(Patch::new(*range, vec![fill; range.len()]), base.len()).unwrap();
        }

        let out = queue.resolve(&base).unwrap();
        prop_assert_eq!(out.len(), base.len());

        for (i, byte) in out.iter().enumerate() {
            let patched = ranges.iter().any(|r| r.start() <= i && i < r.end());
            if patched {
                prop_assert_eq!(*byte, fill);
            } else {
                prop_assert_eq!(*byte, base[i]);
            }
        }
    }

    #[test]
    fn prop_queue_order_does_not_change_result(
        base in proptest::collection::vec(any::<u8>(), 1..128),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
        grow in 0usize..4,
    ) {
        let ranges = disjoint_ranges(base.len(), &cuts);
        let patches: Vec<Patch> = ranges
            .iter()
            .enumerate()
            .map(|(i, r)| Patch::new(*r, vec![i as u8; r.len() + grow]))
            .collect();

        let mut forward = PatchQueue::new();
        forward.queue_all(patches.clone(), base.len()).unwrap();
        let mut backward = PatchQueue::new();
        backward.queue_all(patches.into_iter().rev().collect(), base.len()).unwrap();

        prop_assert_eq!(forward.resolve(&base).unwrap(), backward.resolve(&base).unwrap());
    }

    #[test]
    fn prop_overlap_always_rejected(
        len in 4usize..64,
        start in 0usize..32,
        width in 1usize..16,
        offset in 0usize..16,
    ) {
        let start = start % len;
        let first = ByteRange::new(start, (start + width).min(len)).unwrap();
        prop_assume!(!first.is_empty());
        let second_start = first.start() + offset % first.len();
        let second = ByteRange::new(second_start, (second_start + 1).min(len)).unwrap();

        let mut queue = PatchQueue::new();
        queue.queue(Patch::new(first, vec![0; first.len()]), len).unwrap();
        let err = queue.queue(Patch::new(second, vec![1]), len).unwrap_err();
        let is_overlap = matches!(err, PatchError::OverlappingPatch { .. });
        prop_assert!(is_overlap);
        prop_assert_eq!(queue.len(), 1);
    }
}
