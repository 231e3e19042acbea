//! Vector-fragment clustering.
//!
//! A chart or logo usually arrives as dozens of small filled paths. None of
//! them looks like a picture on its own; only their aggregate does. Two
//! fragments are adjacent when both per-axis gaps between their boxes are at
//! most `proximity_threshold`, and a picture candidate is a connected
//! component of that relation.
//!
//! Components are found with an indexed disjoint set over the fragment
//! arena. Candidate pairs come from a sweep over fragments sorted by their
//! left edge, so only boxes whose x-ranges come within the threshold of each
//! other are ever compared, and pairs already in one set are skipped.
//!
//! A component becomes a [`Cluster`] when its union area reaches
//! `min_fragment_area`. A smaller component survives only when it lies
//! within the threshold of an embedded raster (arrows and callouts drawn on
//! top of a photo), in which case it is anchored to that raster. Everything
//! else is decorative noise: rules, bullets, underlines.

use crate::config::DecomposeConfig;
use crate::geometry::BBox;
use crate::output::FragmentAccounting;
use tracing::debug;

/// Disjoint-set forest over `0..n` with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `x`'s set.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. Returns `false` if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// All sets, each sorted ascending, ordered by their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for x in 0..n {
            let root = self.find(x);
            match slot_of_root[root] {
                Some(slot) => groups[slot].push(x),
                None => {
                    slot_of_root[root] = Some(groups.len());
                    groups.push(vec![x]);
                }
            }
        }
        groups
    }
}

/// Join every pair of boxes within `threshold` of each other on both axes.
///
/// Returns the number of unions that merged two sets. Pairs are visited in a
/// sweep over the boxes sorted by left edge and joined as they are found, so
/// memory stays linear in the number of boxes.
pub fn union_adjacent(set: &mut DisjointSet, boxes: &[BBox], threshold: f32) -> usize {
    let mut by_left: Vec<usize> = (0..boxes.len()).collect();
    by_left.sort_by(|&a, &b| {
        boxes[a]
            .left
            .total_cmp(&boxes[b].left)
            .then(a.cmp(&b))
    });

    let mut merged = 0;
    for (pos, &i) in by_left.iter().enumerate() {
        let reach = boxes[i].right + threshold;
        for &j in &by_left[pos + 1..] {
            if boxes[j].left > reach {
                break;
            }
            if set.find(i) != set.find(j)
                && boxes[i].is_within(&boxes[j], threshold)
                && set.union(i, j)
            {
                merged += 1;
            }
        }
    }
    merged
}

/// A set of mutually proximate fragments and the union of their boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Fragment indices, ascending.
    pub members: Vec<usize>,
    pub bbox: BBox,
    /// Raster this small component was attached to, if any.
    pub anchor: Option<usize>,
}

impl Cluster {
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Result of clustering one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    pub clusters: Vec<Cluster>,
    /// Fragment indices dropped as noise, ascending.
    pub discarded: Vec<usize>,
    pub accounting: FragmentAccounting,
}

/// Group `fragments` into clusters; `rasters` are the embedded raster boxes
/// small components may anchor to.
pub fn cluster_fragments(
    fragments: &[BBox],
    rasters: &[BBox],
    config: &DecomposeConfig,
) -> ClusterOutcome {
    let threshold = config.proximity_threshold;
    let mut set = DisjointSet::new(fragments.len());
    union_adjacent(&mut set, fragments, threshold);

    let mut outcome = ClusterOutcome {
        accounting: FragmentAccounting {
            total: fragments.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for members in set.groups() {
        let bbox = union_of(fragments, &members);
        let area = bbox.area();

        if area > 0.0 && area >= config.min_fragment_area {
            outcome.accounting.clustered += members.len();
            outcome.clusters.push(Cluster {
                members,
                bbox,
                anchor: None,
            });
            continue;
        }

        let anchor = rasters.iter().position(|raster| {
            members
                .iter()
                .any(|&m| fragments[m].is_within(raster, threshold))
        });

        match anchor {
            Some(r) => {
                outcome.accounting.anchored += members.len();
                outcome.clusters.push(Cluster {
                    members,
                    bbox,
                    anchor: Some(r),
                });
            }
            None => {
                outcome.accounting.discarded += members.len();
                outcome.discarded.extend(members);
            }
        }
    }

    outcome.discarded.sort_unstable();
    debug!(
        "Clustered {} fragments → {} clusters ({} anchored fragments, {} discarded)",
        fragments.len(),
        outcome.clusters.len(),
        outcome.accounting.anchored,
        outcome.accounting.discarded
    );
    outcome
}

fn union_of(boxes: &[BBox], members: &[usize]) -> BBox {
    members
        .iter()
        .skip(1)
        .fold(boxes[members[0]], |acc, &m| acc.union(&boxes[m]))
}
