//! Response-window extraction
//!
//! Splits one subject-stimulus trial into its exploration window: the
//! no-response samples preceding the first registered answer.

use crate::types::{ExplorationWindow, Sample};

/// Extractor for the pre-response exploration window
pub struct ResponseWindowExtractor;

impl ResponseWindowExtractor {
    /// Extract the exploration window and response timing from the samples of
    /// one (subject, stimulus) pair. Empty input yields an all-undefined window.
    pub fn extract(samples: &[Sample]) -> ExplorationWindow {
        let mut ordered = samples.to_vec();
        ordered.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

        let (first, last) = match (ordered.first(), ordered.last()) {
            (Some(first), Some(last)) => (first.time_sec, last.time_sec),
            _ => return ExplorationWindow::default(),
        };

        let (t_response, response_code, cutoff) =
            match ordered.iter().position(Sample::has_response) {
                Some(k) => (ordered[k].time_sec, Some(ordered[k].response_code), k),
                None => (last, None, ordered.len()),
            };

        let exploration: Vec<Sample> = ordered
            .into_iter()
            .take(cutoff)
            .filter(|s| !s.has_response())
            .collect();

        ExplorationWindow {
            samples: exploration,
            t0: Some(first),
            t_response: Some(t_response),
            response_time: Some(t_response - first),
            response_code,
        }
    }
}
