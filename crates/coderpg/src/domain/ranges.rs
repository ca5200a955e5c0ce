//! Pure merge/split algebra over line-range sets.
//!
//! A `got` event unions the selected lines into the set, fusing every
//! stored range it overlaps into one. A `not-got` event carves the
//! selected lines out, trimming or splitting the ranges it overlaps.
//! Nothing here performs I/O; the caller loads and persists the set.

use crate::domain::model::{MarkKind, Range, RangeSet};

/// Apply one mark event to an existing range set.
///
/// Expects `start <= end` (the service rejects anything else before it
/// gets here) and an `existing` set honoring the ordering invariant; the
/// returned set honors it again.
pub fn apply(existing: &RangeSet, start: u32, end: u32, kind: MarkKind) -> RangeSet {
    debug_assert!(start <= end, "caller must validate the event bounds");

    let (overlapping, mut result): (Vec<Range>, Vec<Range>) = existing
        .ranges()
        .iter()
        .copied()
        .partition(|r| r.overlaps(start, end));

    match kind {
        MarkKind::Got => {
            // Overlapping ranges collapse into one run spanning them all
            // together with the incoming selection. With no overlap this
            // degenerates to inserting the selection as-is.
            let mut merged = Range::new(start, end);
            for r in &overlapping {
                merged.start = merged.start.min(r.start);
                merged.end = merged.end.max(r.end);
            }
            result.push(merged);
        }
        MarkKind::NotGot => {
            // Each overlapped range keeps whatever sticks out on either
            // side of the selection. A range fully inside it disappears;
            // one straddling it splits in two. No overlap, no change.
            for r in &overlapping {
                if r.start < start {
                    result.push(Range::new(r.start, start - 1));
                }
                if r.end > end {
                    result.push(Range::new(end + 1, r.end));
                }
            }
        }
    }

    RangeSet::from_ranges(result)
}
