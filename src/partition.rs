//! Subject and stimulus partitions
//!
//! Per-subject transforms are a plain map of one single-partition function over
//! every subject partition, so one subject and many subjects go through exactly
//! the same code path.

use crate::types::Sample;
use std::collections::BTreeMap;

/// Group samples by subject id. Partitions iterate in subject-id order and keep
/// the input order of their samples.
pub fn by_subject(samples: &[Sample]) -> BTreeMap<String, Vec<Sample>> {
    group_by(samples, |s| &s.subject_id)
}

/// Group samples by stimulus id, in stimulus-id order
pub fn by_stimulus(samples: &[Sample]) -> BTreeMap<String, Vec<Sample>> {
    group_by(samples, |s| &s.stimulus_id)
}

fn group_by<F>(samples: &[Sample], key: F) -> BTreeMap<String, Vec<Sample>>
where
    F: Fn(&Sample) -> &String,
{
    let mut groups: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(key(sample).clone())
            .or_default()
            .push(sample.clone());
    }
    groups
}

/// Apply `f` to every subject partition and concatenate the results in
/// subject-id order.
pub fn map_subjects<F>(samples: &[Sample], f: F) -> Vec<Sample>
where
    F: Fn(&[Sample]) -> Vec<Sample>,
{
    by_subject(samples)
        .values()
        .flat_map(|partition| f(partition))
        .collect()
}
