//! Axis-aligned boxes in top-down page coordinates.
//!
//! Pdfium reports rectangles with a bottom-left origin (y grows upwards).
//! Everything downstream of extraction works in a top-down frame where
//! `top < bottom`, which is what reading order and clipping both expect.
//! [`BBox::from_pdf_rect`] performs the flip once, at the boundary.

use serde::{Deserialize, Serialize};

/// A rectangle `(left, top, right, bottom)` in page units (PDF points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BBox {
    /// Build a box from two corners in any order.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Convert a bottom-left-origin rectangle into the top-down frame.
    pub fn from_pdf_rect(left: f32, bottom: f32, right: f32, top: f32, page_height: f32) -> Self {
        Self::new(left, page_height - top, right, page_height - bottom)
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Overlapping region, or `None` when the boxes do not share any area.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if right > left && bottom > top {
            Some(BBox {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        self.intersection(other).map_or(0.0, |b| b.area())
    }

    /// Per-axis gap `(dx, dy)`; an axis on which the boxes overlap has zero gap.
    pub fn gap(&self, other: &BBox) -> (f32, f32) {
        let dx = (self.left.max(other.left) - self.right.min(other.right)).max(0.0);
        let dy = (self.top.max(other.top) - self.bottom.min(other.bottom)).max(0.0);
        (dx, dy)
    }

    /// True when both per-axis gaps are at most `threshold`.
    pub fn is_within(&self, other: &BBox, threshold: f32) -> bool {
        let (dx, dy) = self.gap(other);
        dx <= threshold && dy <= threshold
    }

    /// Intersection area divided by the smaller of the two areas.
    ///
    /// 1.0 means one box is fully inside the other. Degenerate boxes with
    /// zero area report 1.0 when they lie inside the other box.
    pub fn overlap_ratio(&self, other: &BBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return if self.contains(other) || other.contains(self) {
                1.0
            } else {
                0.0
            };
        }
        self.intersection_area(other) / smaller
    }

    /// Fraction of `self` covered by `other`.
    pub fn coverage_by(&self, other: &BBox) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return if other.contains(self) { 1.0 } else { 0.0 };
        }
        self.intersection_area(other) / area
    }

    /// True when `other` lies entirely within `self` (edges inclusive).
    pub fn contains(&self, other: &BBox) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    pub fn expand(&self, pad: f32) -> BBox {
        BBox {
            left: self.left - pad,
            top: self.top - pad,
            right: self.right + pad,
            bottom: self.bottom + pad,
        }
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> BBox {
        BBox {
            left: self.left.clamp(0.0, width),
            top: self.top.clamp(0.0, height),
            right: self.right.clamp(0.0, width),
            bottom: self.bottom.clamp(0.0, height),
        }
    }

    /// Length of the vertical overlap between two boxes (zero if disjoint).
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0)
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.1},{:.1},{:.1},{:.1})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalises_corners() {
        let b = BBox::new(40.0, 30.0, 10.0, 5.0);
        assert_eq!(b, BBox::new(10.0, 5.0, 40.0, 30.0));
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.height(), 25.0);
    }

    #[test]
    fn pdf_rect_is_flipped() {
        // 792pt high page, rect near the top edge in PDF space.
        let b = BBox::from_pdf_rect(72.0, 700.0, 144.0, 750.0, 792.0);
        assert_eq!(b.top, 42.0);
        assert_eq!(b.bottom, 92.0);
    }

    #[test]
    fn gap_is_zero_on_overlapping_axis() {
        let a = BBox::new(10.0, 10.0, 40.0, 40.0);
        let b = BBox::new(42.0, 10.0, 70.0, 40.0);
        assert_eq!(a.gap(&b), (2.0, 0.0));
        assert!(a.is_within(&b, 5.0));
        assert!(!a.is_within(&b, 1.0));
    }

    #[test]
    fn far_apart_on_one_axis_is_not_within() {
        let a = BBox::new(0.0, 0.0, 100.0, 10.0);
        let b = BBox::new(0.0, 300.0, 100.0, 310.0);
        assert!(!a.is_within(&b, 6.0));
    }

    #[test]
    fn overlap_ratio_of_contained_box_is_one() {
        let outer = BBox::new(0.0, 0.0, 100.0, 50.0);
        let inner = BBox::new(20.0, 10.0, 60.0, 30.0);
        assert_eq!(outer.overlap_ratio(&inner), 1.0);
        assert_eq!(inner.overlap_ratio(&outer), 1.0);
    }

    #[test]
    fn overlap_ratio_of_disjoint_boxes_is_zero() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.overlap_ratio(&b), 0.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn coverage_handles_partial_overlap() {
        let text = BBox::new(0.0, 0.0, 10.0, 10.0);
        let image = BBox::new(5.0, 0.0, 100.0, 100.0);
        assert!((text.coverage_by(&image) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn clamp_keeps_box_on_page() {
        let b = BBox::new(-5.0, -5.0, 700.0, 900.0).clamp_to(612.0, 792.0);
        assert_eq!(b, BBox::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn vertical_overlap_measures_shared_band() {
        let a = BBox::new(0.0, 10.0, 50.0, 20.0);
        let b = BBox::new(60.0, 15.0, 90.0, 30.0);
        assert_eq!(a.vertical_overlap(&b), 5.0);
    }
}
