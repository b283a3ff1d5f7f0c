use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Minimum gap kept between a dragged edge and its neighbors, in seconds.
pub const BOUNDARY_GAP: f64 = 0.01;

/// A labeled time interval over the audio timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

/// Which edge of a segment a drag gesture grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// Ordered, non-overlapping collection of labeled segments.
///
/// Invariants: every segment satisfies `start < end`, segments are sorted by
/// `start`, and adjacent segments never overlap (`segments[i].end <=
/// segments[i + 1].start`; touching is allowed). Every mutating operation
/// either upholds the invariants or leaves the store unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Auto-generated display label for the segment at `index`.
    pub fn default_label(index: usize) -> String {
        format!("segment_{index}")
    }

    /// Replaces all segments by greedily grouping boundary times.
    ///
    /// Walks the monotonically increasing `boundaries` and cuts a segment
    /// whenever the span since the previous cut reaches `min_len` seconds.
    /// A remaining tail shorter than `min_len` is carried as a final
    /// trailing segment. Fails without touching the store when fewer than
    /// two boundaries are supplied.
    pub fn analyze(&mut self, boundaries: &[f64], min_len: f64) -> Result<()> {
        if boundaries.len() < 2 {
            warn!(count = boundaries.len(), "analyze rejected: too few boundaries");
            return Err(EngineError::InsufficientBoundaries {
                count: boundaries.len(),
            });
        }

        let mut segments = Vec::new();
        let mut start = boundaries[0];
        for &boundary in &boundaries[1..] {
            if boundary - start >= min_len {
                segments.push(Segment {
                    start,
                    end: boundary,
                    label: Self::default_label(segments.len()),
                });
                start = boundary;
            }
        }
        let last = boundaries[boundaries.len() - 1];
        if start < last {
            segments.push(Segment {
                start,
                end: last,
                label: Self::default_label(segments.len()),
            });
        }

        debug!(
            boundary_count = boundaries.len(),
            segment_count = segments.len(),
            min_len,
            "analyze accepted"
        );
        self.segments = segments;
        self.debug_check_invariants();
        Ok(())
    }

    /// Moves one segment edge to `proposed` seconds, clamping the result.
    ///
    /// The edge is clamped into `[0, duration]`, kept [`BOUNDARY_GAP`] away
    /// from the facing edge of the neighboring segment, and kept the same
    /// gap away from its own opposite edge. When no valid position exists
    /// (the segment is already at minimum size) the call is a no-op.
    /// Returns the edge time actually in effect afterwards.
    pub fn move_boundary(
        &mut self,
        index: usize,
        edge: Edge,
        proposed: f64,
        duration: f64,
    ) -> Result<f64> {
        let len = self.segments.len();
        if index >= len {
            return Err(EngineError::InvalidIndex { index, len });
        }

        let (lower, upper, current) = match edge {
            Edge::Start => {
                let lower = if index > 0 {
                    self.segments[index - 1].end + BOUNDARY_GAP
                } else {
                    0.0
                };
                let upper = self.segments[index].end - BOUNDARY_GAP;
                (lower, upper, self.segments[index].start)
            }
            Edge::End => {
                let lower = self.segments[index].start + BOUNDARY_GAP;
                let upper = if index + 1 < len {
                    self.segments[index + 1].start - BOUNDARY_GAP
                } else {
                    duration
                };
                (lower, upper.min(duration), self.segments[index].end)
            }
        };

        if lower > upper {
            debug!(index, ?edge, proposed, "boundary move ignored: no valid position");
            return Ok(current);
        }

        let clamped = proposed.clamp(lower, upper);
        match edge {
            Edge::Start => self.segments[index].start = clamped,
            Edge::End => self.segments[index].end = clamped,
        }
        self.debug_check_invariants();
        Ok(clamped)
    }

    /// Replaces the label of one segment; empty labels are ignored.
    pub fn rename(&mut self, index: usize, label: &str) -> Result<()> {
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(EngineError::InvalidIndex { index, len })?;
        let label = label.trim();
        if label.is_empty() {
            return Ok(());
        }
        segment.label = label.to_owned();
        Ok(())
    }

    /// Merges the segments at `indices` into one spanning segment.
    ///
    /// The replacement covers `[min start, max end]` of the selected
    /// segments — any unselected segment lying between two selected ones is
    /// swallowed — and is inserted at the smallest selected index. Requires
    /// at least two distinct valid indices.
    pub fn merge(&mut self, indices: &[usize], label: Option<String>) -> Result<Segment> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        if sorted.len() < 2 {
            warn!(count = sorted.len(), "merge rejected: need at least two segments");
            return Err(EngineError::InsufficientSelection {
                count: sorted.len(),
            });
        }
        let len = self.segments.len();
        if let Some(&out_of_range) = sorted.iter().find(|&&index| index >= len) {
            return Err(EngineError::InvalidIndex {
                index: out_of_range,
                len,
            });
        }

        let start = sorted
            .iter()
            .map(|&index| self.segments[index].start)
            .fold(f64::INFINITY, f64::min);
        let end = sorted
            .iter()
            .map(|&index| self.segments[index].end)
            .fold(f64::NEG_INFINITY, f64::max);
        let insert_at = sorted[0];
        let label = label
            .map(|label| label.trim().to_owned())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| Self::default_label(insert_at));

        let merged = Segment { start, end, label };
        // Swallowed in-between segments are removed along with the selected
        // ones so the non-overlap invariant survives the insertion.
        let swallowed = sorted[0]..=sorted[sorted.len() - 1];
        for index in swallowed.clone().rev() {
            self.segments.remove(index);
        }
        self.segments.insert(insert_at, merged.clone());

        debug!(
            merged_range = ?swallowed,
            start,
            end,
            segment_count = self.segments.len(),
            "merge accepted"
        );
        self.debug_check_invariants();
        Ok(merged)
    }

    /// Segments intersecting `[start, end)`, with their indices.
    pub fn overlapping(&self, start: f64, end: f64) -> impl Iterator<Item = (usize, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .filter(move |(_, segment)| segment.end >= start && segment.start <= end)
    }

    /// Rebuilds a store from already validated segments (project loading).
    pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
        let store = Self { segments };
        store.debug_check_invariants();
        store
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.segments.iter().all(|segment| segment.start < segment.end),
            "segment with non-positive length"
        );
        debug_assert!(
            self.segments
                .windows(2)
                .all(|pair| pair[0].end <= pair[1].start),
            "segments overlap or are out of order"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{BOUNDARY_GAP, Edge, Segment, SegmentStore};
    use crate::error::EngineError;

    fn store_with(spans: &[(f64, f64)]) -> SegmentStore {
        SegmentStore::from_segments(
            spans
                .iter()
                .enumerate()
                .map(|(index, &(start, end))| Segment {
                    start,
                    end,
                    label: SegmentStore::default_label(index),
                })
                .collect(),
        )
    }

    fn spans(store: &SegmentStore) -> Vec<(f64, f64)> {
        store.iter().map(|segment| (segment.start, segment.end)).collect()
    }

    #[test]
    fn analyze_cuts_whenever_the_running_span_reaches_the_minimum() {
        let mut store = SegmentStore::new();
        store
            .analyze(&[0.0, 5.0, 9.0, 12.0, 18.0], 8.0)
            .expect("analyze should succeed");
        assert_eq!(spans(&store), vec![(0.0, 9.0), (9.0, 18.0)]);
    }

    #[test]
    fn analyze_keeps_a_short_trailing_remainder() {
        let mut store = SegmentStore::new();
        store
            .analyze(&[0.0, 9.0, 14.0], 8.0)
            .expect("analyze should succeed");
        assert_eq!(spans(&store), vec![(0.0, 9.0), (9.0, 14.0)]);
    }

    #[test]
    fn analyze_with_evenly_spaced_boundaries_cuts_at_every_boundary() {
        let mut store = SegmentStore::new();
        store
            .analyze(&[0.0, 9.0, 18.0, 30.0], 8.0)
            .expect("analyze should succeed");
        assert_eq!(spans(&store), vec![(0.0, 9.0), (9.0, 18.0), (18.0, 30.0)]);
    }

    #[test]
    fn analyze_generates_sequential_default_labels() {
        let mut store = SegmentStore::new();
        store
            .analyze(&[0.0, 10.0, 20.0], 8.0)
            .expect("analyze should succeed");
        let labels: Vec<&str> = store.iter().map(|segment| segment.label.as_str()).collect();
        assert_eq!(labels, vec!["segment_0", "segment_1"]);
    }

    #[test]
    fn analyze_with_too_few_boundaries_leaves_the_store_untouched() {
        let mut store = store_with(&[(0.0, 5.0)]);
        let result = store.analyze(&[3.0], 8.0);
        assert!(matches!(
            result,
            Err(EngineError::InsufficientBoundaries { count: 1 })
        ));
        assert_eq!(spans(&store), vec![(0.0, 5.0)]);
    }

    #[test]
    fn move_start_clamps_against_the_previous_segment_end() {
        let mut store = store_with(&[(0.0, 5.0), (5.0, 9.0)]);
        let actual = store
            .move_boundary(1, Edge::Start, 2.0, 9.0)
            .expect("move should succeed");
        assert!((actual - (5.0 + BOUNDARY_GAP)).abs() < 1e-9);
        assert!((store.get(1).unwrap().start - (5.0 + BOUNDARY_GAP)).abs() < 1e-9);
    }

    #[test]
    fn move_start_of_first_segment_clamps_at_zero() {
        let mut store = store_with(&[(1.0, 5.0)]);
        let actual = store
            .move_boundary(0, Edge::Start, -3.0, 5.0)
            .expect("move should succeed");
        assert_eq!(actual, 0.0);
    }

    #[test]
    fn move_end_clamps_against_the_next_segment_start() {
        let mut store = store_with(&[(0.0, 5.0), (6.0, 9.0)]);
        let actual = store
            .move_boundary(0, Edge::End, 8.0, 9.0)
            .expect("move should succeed");
        assert!((actual - (6.0 - BOUNDARY_GAP)).abs() < 1e-9);
    }

    #[test]
    fn move_end_of_last_segment_clamps_at_the_timeline_duration() {
        let mut store = store_with(&[(0.0, 5.0)]);
        let actual = store
            .move_boundary(0, Edge::End, 99.0, 9.0)
            .expect("move should succeed");
        assert_eq!(actual, 9.0);
    }

    #[test]
    fn move_keeps_the_edge_on_the_correct_side_of_its_opposite_edge() {
        let mut store = store_with(&[(0.0, 5.0)]);
        let actual = store
            .move_boundary(0, Edge::Start, 4.999, 5.0)
            .expect("move should succeed");
        assert!((actual - (5.0 - BOUNDARY_GAP)).abs() < 1e-9);
        let segment = store.get(0).unwrap();
        assert!(segment.start < segment.end);
    }

    #[test]
    fn move_on_a_minimum_size_segment_is_a_no_op() {
        let mut store = store_with(&[(0.0, 5.0), (5.0, 5.005), (5.005, 9.0)]);
        let before = spans(&store);
        let actual = store
            .move_boundary(1, Edge::Start, 4.0, 9.0)
            .expect("move should succeed");
        assert!((actual - 5.0).abs() < 1e-9);
        assert_eq!(spans(&store), before);
    }

    #[test]
    fn move_with_invalid_index_is_rejected() {
        let mut store = store_with(&[(0.0, 5.0)]);
        assert!(matches!(
            store.move_boundary(3, Edge::End, 1.0, 5.0),
            Err(EngineError::InvalidIndex { index: 3, len: 1 })
        ));
    }

    #[test]
    fn ordering_invariant_survives_arbitrary_boundary_moves() {
        let mut store = store_with(&[(0.0, 3.0), (3.0, 6.0), (6.5, 9.0)]);
        let proposals = [
            (0, Edge::End, 7.5),
            (1, Edge::Start, -2.0),
            (1, Edge::End, 100.0),
            (2, Edge::Start, 0.0),
            (2, Edge::End, 6.0),
        ];
        for (index, edge, proposed) in proposals {
            store
                .move_boundary(index, edge, proposed, 9.0)
                .expect("move should succeed");
            let all = spans(&store);
            assert!(all.iter().all(|&(start, end)| start < end), "{all:?}");
            assert!(
                all.windows(2).all(|pair| pair[0].1 <= pair[1].0),
                "{all:?}"
            );
        }
    }

    #[test]
    fn rename_replaces_the_label() {
        let mut store = store_with(&[(0.0, 5.0)]);
        store.rename(0, "chorus").expect("rename should succeed");
        assert_eq!(store.get(0).unwrap().label, "chorus");
    }

    #[test]
    fn rename_with_blank_label_is_a_no_op() {
        let mut store = store_with(&[(0.0, 5.0)]);
        store.rename(0, "   ").expect("rename should succeed");
        assert_eq!(store.get(0).unwrap().label, "segment_0");
    }

    #[test]
    fn rename_with_invalid_index_is_rejected() {
        let mut store = store_with(&[(0.0, 5.0)]);
        assert!(matches!(
            store.rename(9, "x"),
            Err(EngineError::InvalidIndex { index: 9, len: 1 })
        ));
    }

    #[test]
    fn merge_of_adjacent_segments_spans_both() {
        let mut store = store_with(&[(0.0, 5.0), (5.0, 9.0)]);
        let merged = store
            .merge(&[0, 1], Some("combined".into()))
            .expect("merge should succeed");
        assert_eq!((merged.start, merged.end), (0.0, 9.0));
        assert_eq!(spans(&store), vec![(0.0, 9.0)]);
        assert_eq!(store.get(0).unwrap().label, "combined");
    }

    #[test]
    fn merge_swallows_unselected_segments_in_between() {
        let mut store = store_with(&[(0.0, 2.0), (2.0, 4.0), (4.0, 6.0)]);
        let merged = store.merge(&[0, 2], None).expect("merge should succeed");
        assert_eq!((merged.start, merged.end), (0.0, 6.0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn merge_defaults_the_label_from_the_insertion_index() {
        let mut store = store_with(&[(0.0, 2.0), (2.0, 4.0), (4.0, 6.0)]);
        store.merge(&[1, 2], None).expect("merge should succeed");
        assert_eq!(store.get(1).unwrap().label, "segment_1");
    }

    #[test]
    fn merge_with_a_single_index_is_rejected() {
        let mut store = store_with(&[(0.0, 2.0), (2.0, 4.0)]);
        let result = store.merge(&[1, 1], None);
        assert!(matches!(
            result,
            Err(EngineError::InsufficientSelection { count: 1 })
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn merge_with_an_out_of_range_index_leaves_the_store_unchanged() {
        let mut store = store_with(&[(0.0, 2.0), (2.0, 4.0)]);
        assert!(matches!(
            store.merge(&[0, 5], None),
            Err(EngineError::InvalidIndex { index: 5, len: 2 })
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn overlapping_yields_only_segments_touching_the_range() {
        let store = store_with(&[(0.0, 2.0), (3.0, 5.0), (6.0, 8.0)]);
        let hits: Vec<usize> = store.overlapping(2.5, 5.5).map(|(index, _)| index).collect();
        assert_eq!(hits, vec![1]);

        let hits: Vec<usize> = store.overlapping(2.0, 6.0).map(|(index, _)| index).collect();
        assert_eq!(hits, vec![0, 1, 2]);
    }
}
