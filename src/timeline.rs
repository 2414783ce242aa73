//! Derives contiguous "which process was active" segments for a window.

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::Sample;
use crate::window::TimeWindow;

/// A run of consecutive samples sharing one process label, clipped to
/// the window. An empty label means the GPU was idle.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSegment {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Builds the ordered segment list for one GPU's windowed samples.
///
/// Adjacent samples with identical labels merge regardless of sampling
/// gaps, unless a gap exceeds `max_gap`; a stall that long closes the
/// segment rather than implying continuous activity across it.
pub fn segments(
    samples: &[Sample],
    window: &TimeWindow,
    max_gap: TimeDelta,
) -> Vec<ProcessSegment> {
    let mut out = Vec::new();
    let mut current: Option<(String, DateTime<Utc>, DateTime<Utc>)> = None;

    for sample in samples {
        if !window.contains(sample.timestamp) {
            continue;
        }
        let extends = match &current {
            Some((label, _, last)) => {
                *label == sample.process_label && sample.timestamp - *last <= max_gap
            }
            None => false,
        };
        if extends {
            if let Some((_, _, last)) = current.as_mut() {
                *last = sample.timestamp;
            }
        } else {
            if let Some((label, start, last)) = current.take() {
                out.push(clip(label, start, last, window));
            }
            current = Some((
                sample.process_label.clone(),
                sample.timestamp,
                sample.timestamp,
            ));
        }
    }

    if let Some((label, start, last)) = current {
        out.push(clip(label, start, last, window));
    }
    out
}

fn clip(
    label: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: &TimeWindow,
) -> ProcessSegment {
    ProcessSegment {
        label,
        start: start.max(window.start()),
        end: end.min(window.end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    fn window_secs(span: i64) -> TimeWindow {
        TimeWindow::anchored(
            t0() + TimeDelta::seconds(span),
            TimeDelta::seconds(span),
            TimeDelta::seconds(5),
            TimeDelta::hours(1),
        )
    }

    fn sample_at(offset_secs: i64, label: &str) -> Sample {
        Sample {
            timestamp: t0() + TimeDelta::seconds(offset_secs),
            gpu_id: 0,
            utilization_pct: 50.0,
            memory_used_mb: 1024.0,
            memory_total_mb: 8192.0,
            temperature_c: 50.0,
            power_draw_w: 150.0,
            process_label: label.to_string(),
        }
    }

    const GAP: TimeDelta = TimeDelta::seconds(5);

    #[test]
    fn constant_label_yields_one_segment() {
        let window = window_secs(10);
        let samples: Vec<Sample> = (0..10).map(|i| sample_at(i, "idle")).collect();
        let segs = segments(&samples, &window, GAP);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].label, "idle");
        assert_eq!(segs[0].start, t0());
        assert_eq!(segs[0].end, t0() + TimeDelta::seconds(9));
    }

    #[test]
    fn label_change_starts_a_new_segment() {
        let window = window_secs(10);
        let samples = vec![
            sample_at(0, ""),
            sample_at(1, ""),
            sample_at(2, "train.py"),
            sample_at(3, "train.py"),
            sample_at(4, ""),
        ];
        let segs = segments(&samples, &window, GAP);
        let labels: Vec<&str> = segs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["", "train.py", ""]);
        assert_eq!(segs[1].start, t0() + TimeDelta::seconds(2));
        assert_eq!(segs[1].end, t0() + TimeDelta::seconds(3));
    }

    #[test]
    fn long_gap_splits_identical_labels() {
        let window = window_secs(30);
        let samples = vec![
            sample_at(0, "train.py"),
            sample_at(1, "train.py"),
            // 9 second stall, over the 5 second gap limit
            sample_at(10, "train.py"),
        ];
        let segs = segments(&samples, &window, GAP);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].end, t0() + TimeDelta::seconds(1));
        assert_eq!(segs[1].start, t0() + TimeDelta::seconds(10));
    }

    #[test]
    fn short_gap_merges_identical_labels() {
        let window = window_secs(30);
        let samples = vec![sample_at(0, "train.py"), sample_at(4, "train.py")];
        let segs = segments(&samples, &window, GAP);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn samples_outside_the_window_are_ignored() {
        let window = window_secs(10);
        let samples = vec![
            sample_at(-5, "before"),
            sample_at(2, "inside"),
            sample_at(20, "after"),
        ];
        let segs = segments(&samples, &window, GAP);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].label, "inside");
    }

    #[test]
    fn empty_input_yields_no_segments() {
        let window = window_secs(10);
        assert!(segments(&[], &window, GAP).is_empty());
    }
}
