//! Per-GPU sample history with ordered append and windowed queries.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, ViewerError};
use crate::models::Sample;

#[derive(Debug, Default)]
struct Inner {
    series: HashMap<u32, VecDeque<Sample>>,
    /// GPU ids in order of first appearance; keys only ever accumulate
    /// within a run.
    order: Vec<u32>,
}

impl Inner {
    fn series_mut(&mut self, gpu_id: u32) -> &mut VecDeque<Sample> {
        if !self.series.contains_key(&gpu_id) {
            self.order.push(gpu_id);
        }
        self.series.entry(gpu_id).or_default()
    }
}

/// Append-only ordered sample history, one sequence per GPU.
///
/// Cloning is cheap and shares the underlying data, so a producer thread
/// can append while the viewer reads. Queries return owned snapshots;
/// nothing holds a lock while a renderer works.
#[derive(Debug)]
pub struct SeriesStore {
    inner: Arc<RwLock<Inner>>,
    /// Per-GPU sample cap. `None` means unbounded for the session.
    cap: Option<usize>,
}

impl SeriesStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            cap: None,
        }
    }

    /// Creates a store that keeps at most `cap` samples per GPU,
    /// evicting the oldest.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            cap: Some(cap),
        }
    }

    /// Pre-announces a GPU so it occupies a grid slot before its first
    /// sample arrives.
    pub fn register(&self, gpu_id: u32) {
        let mut inner = self.inner.write();
        inner.series_mut(gpu_id);
    }

    /// Appends a sample to its GPU's series.
    ///
    /// # Errors
    ///
    /// Returns `OutOfOrderSample` if the timestamp precedes the last
    /// stored sample for that GPU; the store is left unchanged (the GPU
    /// id itself is still registered). Equal timestamps are accepted.
    pub fn append(&self, sample: Sample) -> Result<()> {
        let mut inner = self.inner.write();
        let gpu_id = sample.gpu_id;
        let series = inner.series_mut(gpu_id);

        if let Some(last) = series.back() {
            if sample.timestamp < last.timestamp {
                return Err(ViewerError::OutOfOrderSample {
                    gpu_id,
                    timestamp: sample.timestamp,
                    last: last.timestamp,
                });
            }
        }

        series.push_back(sample);
        if let Some(cap) = self.cap {
            while series.len() > cap {
                series.pop_front();
            }
        }

        debug!(gpu_id, points = series.len(), "appended sample");
        Ok(())
    }

    /// Returns the samples for `gpu_id` with timestamps in `[start, end)`.
    ///
    /// Unknown GPUs and empty windows yield an empty vector. The bounds
    /// are located by binary search, so the cost is O(log n + k).
    pub fn range(
        &self,
        gpu_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Sample> {
        let inner = self.inner.read();
        let Some(series) = inner.series.get(&gpu_id) else {
            return Vec::new();
        };
        let lo = series.partition_point(|s| s.timestamp < start);
        let hi = series.partition_point(|s| s.timestamp < end);
        series.iter().skip(lo).take(hi - lo).cloned().collect()
    }

    /// Most recent sample for `gpu_id`, if any.
    pub fn latest(&self, gpu_id: u32) -> Option<Sample> {
        self.inner.read().series.get(&gpu_id)?.back().cloned()
    }

    /// GPU ids discovered so far, in order of first appearance.
    pub fn known_gpu_ids(&self) -> Vec<u32> {
        self.inner.read().order.clone()
    }

    /// Earliest and latest timestamp across all GPUs, or `None` while
    /// the store holds no samples at all.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let inner = self.inner.read();
        let first = inner
            .series
            .values()
            .filter_map(|s| s.front())
            .map(|s| s.timestamp)
            .min()?;
        let last = inner
            .series
            .values()
            .filter_map(|s| s.back())
            .map(|s| s.timestamp)
            .max()?;
        Some((first, last))
    }

    /// Number of stored samples for `gpu_id` (0 for unknown GPUs).
    pub fn len(&self, gpu_id: u32) -> usize {
        self.inner.read().series.get(&gpu_id).map_or(0, VecDeque::len)
    }

    /// True when no GPU holds any samples.
    pub fn is_empty(&self) -> bool {
        self.inner.read().series.values().all(VecDeque::is_empty)
    }
}

impl Clone for SeriesStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cap: self.cap,
        }
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}
