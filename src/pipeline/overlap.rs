//! Image candidate assembly and overlap resolution.
//!
//! Every cluster and every eligible embedded raster starts as one
//! [`ImageCandidate`]. Anchored clusters are folded into their raster's
//! candidate straight away. Candidates are then merged pairwise until no two
//! of them overlap by more than `image_overlap_tolerance`; containment always
//! merges, which covers the raster-under-vector-annotations case. Each
//! surviving candidate is rendered exactly once.
//!
//! Text runs are checked against the final image boxes last.

use crate::config::{DecomposeConfig, TextOverlapPolicy};
use crate::geometry::BBox;
use crate::output::{FragmentAccounting, ImageOrigin};
use crate::pipeline::cluster::ClusterOutcome;
use crate::pipeline::extract::{PageContent, RasterPlacement, TextRun};
use tracing::debug;

/// A region of the page that will become one image block.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    /// Render region: padded, clamped to the page.
    pub bbox: BBox,
    /// Indices into the page's raster placements, ascending.
    pub rasters: Vec<usize>,
    /// Indices into the page's fragments, ascending.
    pub fragments: Vec<usize>,
    /// How many of `fragments` came in through raster anchoring.
    pub anchored: usize,
    /// Smallest scan-order number among the sources.
    pub seq: usize,
}

impl ImageCandidate {
    pub fn origin(&self) -> ImageOrigin {
        match (self.rasters.is_empty(), self.fragments.is_empty()) {
            (false, true) => ImageOrigin::Embedded,
            (true, _) => ImageOrigin::Vector,
            (false, false) => ImageOrigin::Composite,
        }
    }

    fn absorb(&mut self, other: ImageCandidate) {
        self.bbox = self.bbox.union(&other.bbox);
        self.rasters.extend(other.rasters);
        self.rasters.sort_unstable();
        self.fragments.extend(other.fragments);
        self.fragments.sort_unstable();
        self.anchored += other.anchored;
        self.seq = self.seq.min(other.seq);
    }
}

/// Indices of the rasters large enough to keep and visible on the page.
pub fn eligible_rasters(
    rasters: &[RasterPlacement],
    page_width: f32,
    page_height: f32,
    min_area: f32,
) -> Vec<usize> {
    rasters
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            let on_page = r.bbox.clamp_to(page_width, page_height);
            !on_page.is_empty() && on_page.area() >= min_area
        })
        .map(|(i, _)| i)
        .collect()
}

/// Turn rasters and clusters into candidates.
///
/// `raster_ids` are the eligible raster indices and `fragment_ids` the
/// fragments clustering was given; cluster members and anchors are
/// positions in those lists.
pub fn build_candidates(
    content: &PageContent,
    raster_ids: &[usize],
    fragment_ids: &[usize],
    clustering: &ClusterOutcome,
    config: &DecomposeConfig,
    accounting: &mut FragmentAccounting,
) -> Vec<ImageCandidate> {
    let rasters = &content.rasters;
    let fragments = &content.fragments;
    let region = |b: BBox| {
        b.expand(config.region_padding)
            .clamp_to(content.width, content.height)
    };

    let mut candidates: Vec<ImageCandidate> = raster_ids
        .iter()
        .map(|&r| ImageCandidate {
            bbox: region(rasters[r].bbox),
            rasters: vec![r],
            fragments: Vec::new(),
            anchored: 0,
            seq: rasters[r].seq,
        })
        .collect();

    for cluster in &clustering.clusters {
        let members: Vec<usize> = cluster.members.iter().map(|&m| fragment_ids[m]).collect();
        let seq = members
            .iter()
            .map(|&m| fragments[m].seq)
            .min()
            .unwrap_or(usize::MAX);
        let candidate = ImageCandidate {
            bbox: region(cluster.bbox),
            anchored: if cluster.is_anchored() { members.len() } else { 0 },
            fragments: members,
            rasters: Vec::new(),
            seq,
        };
        match cluster.anchor {
            Some(slot) if slot < raster_ids.len() => candidates[slot].absorb(candidate),
            _ => candidates.push(candidate),
        }
    }

    let (mut candidates, empty): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(|c| !c.bbox.is_empty());
    for dropped in empty {
        discard(&dropped, accounting);
        debug!("Dropping image region {} with no visible area", dropped.bbox);
    }
    candidates.sort_by_key(|c| c.seq);
    candidates
}

/// Move the fragments of a dropped candidate to `discarded`.
fn discard(dropped: &ImageCandidate, accounting: &mut FragmentAccounting) {
    let anchored = dropped.anchored;
    let clustered = dropped.fragments.len() - anchored;
    accounting.anchored -= anchored;
    accounting.clustered -= clustered;
    accounting.discarded += anchored + clustered;
}

/// True when two image regions must become one.
fn must_merge(a: &BBox, b: &BBox, tolerance: f32) -> bool {
    a.contains(b) || b.contains(a) || a.overlap_ratio(b) > tolerance
}

/// Merge candidates until no pair overlaps beyond `tolerance`.
///
/// A merge grows a box, which can create new overlaps, so this repeats until
/// a pass makes no change. The result is sorted by `seq`.
pub fn merge_candidates(mut candidates: Vec<ImageCandidate>, tolerance: f32) -> Vec<ImageCandidate> {
    loop {
        let pair = (0..candidates.len()).find_map(|i| {
            (i + 1..candidates.len())
                .find(|&j| must_merge(&candidates[i].bbox, &candidates[j].bbox, tolerance))
                .map(|j| (i, j))
        });
        match pair {
            Some((i, j)) => {
                let other = candidates.remove(j);
                debug!("Merging image region {} into {}", other.bbox, candidates[i].bbox);
                candidates[i].absorb(other);
            }
            None => break,
        }
    }
    candidates.sort_by_key(|c| c.seq);
    candidates
}

/// Keep the `max` largest candidates; fragments of dropped ones are moved
/// to `discarded` in `accounting`.
pub fn cap_images(
    mut candidates: Vec<ImageCandidate>,
    max: Option<usize>,
    accounting: &mut FragmentAccounting,
) -> Vec<ImageCandidate> {
    let Some(max) = max else {
        return candidates;
    };
    if candidates.len() <= max {
        return candidates;
    }

    candidates.sort_by(|a, b| {
        b.bbox
            .area()
            .total_cmp(&a.bbox.area())
            .then(a.seq.cmp(&b.seq))
    });
    for dropped in candidates.drain(max..) {
        discard(&dropped, accounting);
        debug!("Dropping image region {} over the image limit", dropped.bbox);
    }
    candidates.sort_by_key(|c| c.seq);
    candidates
}

/// Split text runs into those to emit and the count suppressed.
///
/// A run is inside an image when more than `tolerance` of its box is covered
/// by that image's box.
pub fn partition_text<'a>(
    runs: &'a [TextRun],
    images: &[BBox],
    tolerance: f32,
    policy: TextOverlapPolicy,
) -> (Vec<&'a TextRun>, usize) {
    if policy == TextOverlapPolicy::Keep || images.is_empty() {
        return (runs.iter().collect(), 0);
    }
    let (kept, suppressed): (Vec<&TextRun>, Vec<&TextRun>) = runs
        .iter()
        .partition(|run| !images.iter().any(|img| run.bbox.coverage_by(img) > tolerance));
    (kept, suppressed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cluster::cluster_fragments;

    fn candidate(bbox: BBox, seq: usize) -> ImageCandidate {
        ImageCandidate {
            bbox,
            rasters: Vec::new(),
            fragments: vec![seq],
            anchored: 0,
            seq,
        }
    }

    fn assemble(content: &PageContent, config: &DecomposeConfig) -> Vec<ImageCandidate> {
        assemble_counted(content, config).0
    }

    fn assemble_counted(
        content: &PageContent,
        config: &DecomposeConfig,
    ) -> (Vec<ImageCandidate>, FragmentAccounting) {
        let raster_ids = eligible_rasters(
            &content.rasters,
            content.width,
            content.height,
            config.min_raster_area,
        );
        let raster_boxes: Vec<BBox> = raster_ids.iter().map(|&r| content.rasters[r].bbox).collect();
        let fragment_ids: Vec<usize> = (0..content.fragments.len()).collect();
        let fragment_boxes: Vec<BBox> = content.fragments.iter().map(|f| f.bbox).collect();
        let clustering = cluster_fragments(&fragment_boxes, &raster_boxes, config);
        let mut accounting = clustering.accounting;
        let candidates = build_candidates(
            content,
            &raster_ids,
            &fragment_ids,
            &clustering,
            config,
            &mut accounting,
        );
        (
            merge_candidates(candidates, config.image_overlap_tolerance),
            accounting,
        )
    }

    #[test]
    fn raster_with_inner_cluster_becomes_one_region() {
        let mut content = PageContent::new(0, 612.0, 792.0);
        content
            .push_raster(BBox::new(0.0, 0.0, 100.0, 50.0))
            .push_fragment(BBox::new(20.0, 10.0, 60.0, 30.0));
        let config = DecomposeConfig::builder().min_fragment_area(500.0).build().unwrap();

        let merged = assemble(&content, &config);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(merged[0].origin(), ImageOrigin::Composite);
        assert_eq!(merged[0].rasters, vec![0]);
        assert_eq!(merged[0].fragments, vec![0]);
    }

    #[test]
    fn cluster_with_no_visible_area_is_discarded() {
        let mut content = PageContent::new(0, 200.0, 100.0);
        content.push_fragment(BBox::new(-50.0, 10.0, 0.0, 60.0));

        let (merged, accounting) = assemble_counted(&content, &DecomposeConfig::default());
        assert!(merged.is_empty());
        assert_eq!(accounting.clustered, 0);
        assert_eq!(accounting.discarded, 1);
        assert!(accounting.is_balanced());
    }

    #[test]
    fn containment_merges_even_at_full_tolerance() {
        let outer = candidate(BBox::new(0.0, 0.0, 100.0, 100.0), 0);
        let inner = candidate(BBox::new(10.0, 10.0, 20.0, 20.0), 1);
        let merged = merge_candidates(vec![outer, inner], 1.0);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn touching_regions_do_not_merge() {
        let a = candidate(BBox::new(0.0, 0.0, 50.0, 50.0), 0);
        let b = candidate(BBox::new(50.0, 0.0, 100.0, 50.0), 1);
        assert_eq!(merge_candidates(vec![a, b], 0.0).len(), 2);
    }

    #[test]
    fn merging_repeats_until_stable() {
        // a and c are disjoint, but the union of a and b reaches c.
        let a = candidate(BBox::new(0.0, 0.0, 40.0, 40.0), 0);
        let b = candidate(BBox::new(30.0, 30.0, 80.0, 45.0), 1);
        let c = candidate(BBox::new(60.0, 0.0, 90.0, 20.0), 2);
        let merged = merge_candidates(vec![c, a, b], 0.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 90.0, 45.0));
        assert_eq!(merged[0].seq, 0);
        assert_eq!(merged[0].fragments, vec![0, 1, 2]);
    }

    #[test]
    fn tolerance_allows_small_overlap() {
        let a = candidate(BBox::new(0.0, 0.0, 100.0, 100.0), 0);
        let b = candidate(BBox::new(95.0, 0.0, 195.0, 100.0), 1);
        assert_eq!(merge_candidates(vec![a.clone(), b.clone()], 0.1).len(), 2);
        assert_eq!(merge_candidates(vec![a, b], 0.0).len(), 1);
    }

    #[test]
    fn no_pair_exceeds_tolerance_after_merge() {
        let boxes = [
            BBox::new(0.0, 0.0, 30.0, 30.0),
            BBox::new(20.0, 20.0, 60.0, 60.0),
            BBox::new(100.0, 100.0, 150.0, 150.0),
            BBox::new(140.0, 90.0, 200.0, 120.0),
            BBox::new(300.0, 300.0, 310.0, 310.0),
        ];
        let candidates = boxes.iter().enumerate().map(|(i, b)| candidate(*b, i)).collect();
        let merged = merge_candidates(candidates, 0.0);
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                assert!(a.bbox.overlap_ratio(&b.bbox) <= 0.0);
            }
        }
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn padding_is_clamped_to_page() {
        let mut content = PageContent::new(0, 200.0, 200.0);
        content.push_raster(BBox::new(5.0, 5.0, 100.0, 100.0));
        let config = DecomposeConfig::builder().region_padding(10.0).build().unwrap();
        let merged = assemble(&content, &config);
        assert_eq!(merged[0].bbox, BBox::new(0.0, 0.0, 110.0, 110.0));
    }

    #[test]
    fn small_and_offpage_rasters_are_not_eligible() {
        let rasters = [
            RasterPlacement {
                bbox: BBox::new(0.0, 0.0, 5.0, 5.0),
                seq: 0,
            },
            RasterPlacement {
                bbox: BBox::new(700.0, 0.0, 800.0, 100.0),
                seq: 1,
            },
            RasterPlacement {
                bbox: BBox::new(10.0, 10.0, 110.0, 110.0),
                seq: 2,
            },
        ];
        assert_eq!(eligible_rasters(&rasters, 612.0, 792.0, 100.0), vec![2]);
    }

    #[test]
    fn cap_keeps_largest_and_rebalances_accounting() {
        let small = ImageCandidate {
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            rasters: Vec::new(),
            fragments: vec![0, 1],
            anchored: 0,
            seq: 0,
        };
        let large = ImageCandidate {
            bbox: BBox::new(0.0, 100.0, 100.0, 200.0),
            rasters: Vec::new(),
            fragments: vec![2],
            anchored: 0,
            seq: 2,
        };
        let mut accounting = FragmentAccounting {
            total: 3,
            clustered: 3,
            anchored: 0,
            discarded: 0,
        };
        let kept = cap_images(vec![small, large], Some(1), &mut accounting);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].seq, 2);
        assert_eq!(accounting.discarded, 2);
        assert!(accounting.is_balanced());
    }

    #[test]
    fn text_inside_image_is_suppressed() {
        let runs = vec![
            TextRun {
                bbox: BBox::new(10.0, 10.0, 40.0, 20.0),
                text: "axis label".into(),
                seq: 0,
            },
            TextRun {
                bbox: BBox::new(0.0, 200.0, 100.0, 210.0),
                text: "Body text".into(),
                seq: 1,
            },
        ];
        let images = [BBox::new(0.0, 0.0, 100.0, 100.0)];

        let (kept, suppressed) = partition_text(&runs, &images, 0.5, TextOverlapPolicy::Suppress);
        assert_eq!(suppressed, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "Body text");

        let (kept, suppressed) = partition_text(&runs, &images, 0.5, TextOverlapPolicy::Keep);
        assert_eq!(suppressed, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn text_partially_overlapping_image_is_kept() {
        let runs = vec![TextRun {
            bbox: BBox::new(90.0, 0.0, 130.0, 10.0),
            text: "caption".into(),
            seq: 0,
        }];
        let images = [BBox::new(0.0, 0.0, 100.0, 100.0)];
        let (kept, _) = partition_text(&runs, &images, 0.5, TextOverlapPolicy::Suppress);
        assert_eq!(kept.len(), 1);
    }
}
