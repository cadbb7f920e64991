//! Self-intersection checks backed by an R*-tree of segment envelopes.
//!
//! Each segment of a ring or line is indexed by its bounding rectangle; only
//! pairs whose envelopes overlap are tested exactly.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Line, LineString};
use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};

type IndexedSegment = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Whether a closed ring touches itself only at consecutive vertices.
///
/// # Examples
/// ```
/// use geo::line_string;
/// use strata_core::ring_is_simple;
///
/// let square = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
/// let bowtie = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
/// assert!(ring_is_simple(&square));
/// assert!(!ring_is_simple(&bowtie));
/// ```
pub fn ring_is_simple(ring: &LineString<f64>) -> bool {
    is_simple(ring, true)
}

/// Whether a polyline never crosses or overlaps itself.
///
/// A line whose first and last coordinates coincide is checked as a ring.
pub fn line_is_simple(line: &LineString<f64>) -> bool {
    is_simple(line, line.is_closed())
}

fn is_simple(line: &LineString<f64>, closed: bool) -> bool {
    let segments: Vec<Line<f64>> = line
        .lines()
        .filter(|segment| segment.start != segment.end)
        .collect();
    let count = segments.len();
    if count < 2 {
        return true;
    }
    let tree = RTree::bulk_load(
        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| index_segment(index, segment))
            .collect(),
    );
    tree.intersection_candidates_with_other_tree(&tree)
        .filter(|(a, b)| a.data < b.data)
        .all(|(a, b)| {
            let (first, second) = (a.data, b.data);
            let adjacent = second == first + 1 || (closed && first == 0 && second == count - 1);
            match (segments.get(first), segments.get(second)) {
                (Some(&left), Some(&right)) => segments_may_meet(left, right, adjacent),
                _ => true,
            }
        })
}

fn index_segment(index: usize, segment: &Line<f64>) -> IndexedSegment {
    GeomWithData::new(
        Rectangle::from_corners(
            [segment.start.x, segment.start.y],
            [segment.end.x, segment.end.y],
        ),
        index,
    )
}

/// Adjacent segments may share their common vertex; others must be disjoint.
fn segments_may_meet(left: Line<f64>, right: Line<f64>, adjacent: bool) -> bool {
    match line_intersection(left, right) {
        None => true,
        Some(LineIntersection::SinglePoint { .. }) => adjacent,
        Some(LineIntersection::Collinear { intersection }) => {
            adjacent && intersection.start == intersection.end
        }
    }
}
