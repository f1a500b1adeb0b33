//! Segment aggregation
//!
//! Groups labeled samples by (segment id, label) into intervals with timing and
//! position summaries. No duration filtering happens here.

use crate::types::{GazeLabel, LabeledSample, Segment};
use std::collections::BTreeMap;

/// Aggregator for contiguous same-label runs
pub struct SegmentAggregator;

impl SegmentAggregator {
    /// Aggregate labeled samples into segments ordered by (segment id, label).
    ///
    /// Start/end coordinates come from the first/last sample of each group in
    /// arrival order; start/end times are the group's min/max time.
    pub fn aggregate(samples: &[LabeledSample]) -> Vec<Segment> {
        let mut groups: BTreeMap<(u32, GazeLabel), Segment> = BTreeMap::new();

        for labeled in samples {
            let s = &labeled.sample;
            groups
                .entry((labeled.segment_id, labeled.label))
                .and_modify(|seg| {
                    seg.t_start = seg.t_start.min(s.time_sec);
                    seg.t_end = seg.t_end.max(s.time_sec);
                    seg.sample_count += 1;
                    seg.end_x = s.x;
                    seg.end_y = s.y;
                })
                .or_insert_with(|| Segment {
                    segment_id: labeled.segment_id,
                    label: labeled.label,
                    t_start: s.time_sec,
                    t_end: s.time_sec,
                    duration: 0.0,
                    sample_count: 1,
                    start_x: s.x,
                    start_y: s.y,
                    end_x: s.x,
                    end_y: s.y,
                });
        }

        groups
            .into_values()
            .map(|mut seg| {
                seg.duration = seg.t_end - seg.t_start;
                seg
            })
            .collect()
    }
}
