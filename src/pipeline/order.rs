//! Reading order: top-to-bottom row bands, left-to-right within a band.
//!
//! Two blocks share a row when their vertical extents overlap by more than
//! half the shorter block's height. That relation is not transitive, so it
//! cannot be used as a sort comparator directly. Instead blocks are sorted by
//! `(top, left, seq)` and swept once: each band is anchored on its first
//! block, and later blocks join while they share a row with that anchor.
//! Every band is then sorted by `(left, seq)`. The result is a total order
//! that depends only on the boxes and scan order.

use crate::geometry::BBox;

/// Share of the shorter height two blocks must overlap to sit in one row.
pub const ROW_OVERLAP_FRACTION: f32 = 0.5;

/// True when `a` and `b` belong to the same row band.
pub fn same_row(a: &BBox, b: &BBox) -> bool {
    let shorter = a.height().min(b.height());
    a.vertical_overlap(b) > ROW_OVERLAP_FRACTION * shorter
}

/// Permutation of `items` (box, scan-order seq) in reading order.
pub fn reading_order(items: &[(BBox, usize)]) -> Vec<usize> {
    let mut by_top: Vec<usize> = (0..items.len()).collect();
    by_top.sort_by(|&a, &b| {
        let (ba, sa) = &items[a];
        let (bb, sb) = &items[b];
        ba.top
            .total_cmp(&bb.top)
            .then(ba.left.total_cmp(&bb.left))
            .then(sa.cmp(sb))
    });

    let by_left = |band: &mut Vec<usize>| {
        band.sort_by(|&a, &b| {
            items[a]
                .0
                .left
                .total_cmp(&items[b].0.left)
                .then(items[a].1.cmp(&items[b].1))
        })
    };

    let mut order = Vec::with_capacity(items.len());
    let mut band: Vec<usize> = Vec::new();
    for idx in by_top {
        let joins = band
            .first()
            .is_some_and(|&anchor| same_row(&items[anchor].0, &items[idx].0));
        if !joins && !band.is_empty() {
            by_left(&mut band);
            order.append(&mut band);
        }
        band.push(idx);
    }
    by_left(&mut band);
    order.append(&mut band);
    order
}
