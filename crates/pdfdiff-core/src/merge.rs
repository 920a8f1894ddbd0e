//! Box merging: fold nearby candidate boxes together, then drop the ones
//! too small to report.
//!
//! The merge is a single greedy pass. Each candidate, in input order, is
//! unioned into the *first* already-emitted box it is close to (see
//! [`BoundingBox::is_close`]), or appended as a new output box.
//!
//! This is order-dependent and does not compute a transitive closure: an
//! output box that grows late in the pass is not re-tested against output
//! boxes emitted before it, so two output boxes may end up close to each
//! other. The approximation is kept as-is.

use crate::types::BoundingBox;

/// Greedy single-pass merge of `boxes` under `padding`.
///
/// Never returns more boxes than it was given, and every input box is
/// contained in some output box.
#[must_use = "returns the merged boxes"]
pub fn merge_boxes(boxes: &[BoundingBox], padding: u32) -> Vec<BoundingBox> {
    let mut out: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for &candidate in boxes {
        match out.iter_mut().find(|existing| candidate.is_close(**existing, padding)) {
            Some(existing) => *existing = existing.union(candidate),
            None => out.push(candidate),
        }
    }
    out
}

/// Keep only boxes whose corner-distance area is at least `min_area`.
#[must_use = "returns the filtered boxes"]
pub fn filter_min_area(boxes: Vec<BoundingBox>, min_area: u32) -> Vec<BoundingBox> {
    let min_area = u64::from(min_area);
    boxes.into_iter().filter(|b| b.area() >= min_area).collect()
}
