//! Reduces a windowed sample slice into fixed-width display buckets and
//! axis ticks.

use crate::models::{Metric, Sample};
use crate::window::TimeWindow;

/// How samples within one bucket collapse to a single value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BucketAgg {
    #[default]
    Mean,
    Last,
}

/// Y-axis extremes and x-axis edge labels for the visible slice.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisTicks {
    pub min_value: f64,
    pub max_value: f64,
    pub start_label: String,
    pub end_label: String,
}

/// Splits the window into `bucket_count` equal sub-intervals and reduces
/// the samples falling in each one. Always returns exactly `bucket_count`
/// entries; buckets with no samples stay `None`, never interpolated.
/// How to depict a gap is the renderer's call.
pub fn bucketize(
    samples: &[Sample],
    metric: Metric,
    window: &TimeWindow,
    bucket_count: usize,
    agg: BucketAgg,
) -> Vec<Option<f64>> {
    if bucket_count == 0 {
        return Vec::new();
    }

    let span_ms = window.span().num_milliseconds().max(1);
    let mut sums = vec![0.0f64; bucket_count];
    let mut counts = vec![0usize; bucket_count];
    let mut lasts = vec![None; bucket_count];

    for sample in samples {
        if !window.contains(sample.timestamp) {
            continue;
        }
        let value = sample.value(metric);
        if !value.is_finite() {
            continue;
        }
        let offset_ms = (sample.timestamp - window.start()).num_milliseconds();
        let idx = ((offset_ms * bucket_count as i64) / span_ms) as usize;
        let idx = idx.min(bucket_count - 1);
        sums[idx] += value;
        counts[idx] += 1;
        lasts[idx] = Some(value);
    }

    (0..bucket_count)
        .map(|i| {
            if counts[i] == 0 {
                None
            } else {
                match agg {
                    BucketAgg::Mean => Some(sums[i] / counts[i] as f64),
                    BucketAgg::Last => lasts[i],
                }
            }
        })
        .collect()
}

/// Computes axis ticks from the window-clipped slice only, so the y-axis
/// tracks the visible data rather than full-history extremes. `None` when
/// no sample falls in the window.
pub fn axis_ticks(samples: &[Sample], metric: Metric, window: &TimeWindow) -> Option<AxisTicks> {
    let mut min_value = f64::INFINITY;
    let mut max_value = f64::NEG_INFINITY;
    let mut seen = false;

    for sample in samples {
        if !window.contains(sample.timestamp) {
            continue;
        }
        let value = sample.value(metric);
        if !value.is_finite() {
            continue;
        }
        min_value = min_value.min(value);
        max_value = max_value.max(value);
        seen = true;
    }

    if !seen {
        return None;
    }

    Some(AxisTicks {
        min_value,
        max_value,
        start_label: window.start().format("%H:%M:%S").to_string(),
        end_label: window.end().format("%H:%M:%S").to_string(),
    })
}
