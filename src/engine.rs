//! The viewer engine: owns the sample history, the time window, and the
//! live/paused/static mode, and turns them into an immutable view-model
//! once per refresh tick.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::classify;
use crate::downsample::{self, AxisTicks, BucketAgg};
use crate::error::{Result, ViewerError};
use crate::models::{Metric, Mode, Sample, SeverityBand, StatusLabel, ViewerConfig};
use crate::store::SeriesStore;
use crate::timeline::{self, ProcessSegment};
use crate::window::{DataBounds, PanDirection, TimeWindow};

/// Producer-side handle for feeding samples into the engine.
///
/// Cloneable and cheap; `push` only appends to a shared inbox under a
/// short lock, so a sampler thread can call it while the viewer thread
/// refreshes. Samples are applied to the store on the next `refresh`.
#[derive(Clone, Debug, Default)]
pub struct SampleSink {
    inbox: Arc<Mutex<Vec<Sample>>>,
}

impl SampleSink {
    pub fn push(&self, sample: Sample) {
        self.inbox.lock().push(sample);
    }

    pub fn push_batch(&self, batch: Vec<Sample>) {
        self.inbox.lock().extend(batch);
    }
}

/// One bucketed series for a metric, plus its axis ticks. `None` buckets
/// mark sub-intervals with no samples.
#[derive(Clone, Debug)]
pub struct MetricSeries {
    pub metric: Metric,
    pub buckets: Vec<Option<f64>>,
    pub ticks: Option<AxisTicks>,
}

/// Everything a renderer needs for one GPU this refresh.
#[derive(Clone, Debug)]
pub struct GpuView {
    pub gpu_id: u32,
    /// Last sample in the window, falling back to the newest stored one
    /// when the window holds none. `None` only for a GPU with no data at
    /// all.
    pub latest: Option<Sample>,
    pub status: StatusLabel,
    pub bands: Vec<(Metric, SeverityBand)>,
    pub series: Vec<MetricSeries>,
    pub timeline: Vec<ProcessSegment>,
    pub visible_samples: usize,
}

/// Immutable per-refresh output. Freshly constructed each tick; safe to
/// hand to a renderer without synchronization.
#[derive(Clone, Debug)]
pub struct ViewModel {
    pub mode: Mode,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub span: TimeDelta,
    pub visible_samples: usize,
    /// Samples dropped for ordering violations since the run started.
    pub dropped_samples: u64,
    /// One entry per known GPU, in order of first appearance. Present
    /// even when a GPU has no data, so grid layouts stay stable.
    pub gpus: Vec<GpuView>,
}

/// Orchestrates store, window, and mode for one viewing session.
pub struct ViewerEngine {
    store: SeriesStore,
    sink: SampleSink,
    window: TimeWindow,
    mode: Mode,
    config: ViewerConfig,
    dropped: u64,
}

impl ViewerEngine {
    /// Engine for a live telemetry source, with the window pinned to
    /// `now`.
    pub fn live(config: ViewerConfig, now: DateTime<Utc>) -> Self {
        let window =
            TimeWindow::anchored(now, config.default_span, config.min_span, config.max_span);
        Self {
            store: SeriesStore::new(),
            sink: SampleSink::default(),
            window,
            mode: Mode::Live,
            config,
            dropped: 0,
        }
    }

    /// Engine over a finished recording. Samples violating per-GPU order
    /// are dropped with a warning, matching live ingestion. The window
    /// opens on the default span anchored at the recording's end, clamped
    /// to its start for short recordings.
    pub fn from_recording(samples: Vec<Sample>, config: ViewerConfig) -> Self {
        let store = SeriesStore::new();
        let mut dropped = 0;
        for sample in samples {
            if let Err(err) = store.append(sample) {
                warn!(%err, "dropping recorded sample");
                dropped += 1;
            }
        }
        let bounds = store.bounds();
        let anchor = bounds.map_or_else(Utc::now, |(_, last)| last);
        let mut window =
            TimeWindow::anchored(anchor, config.default_span, config.min_span, config.max_span);
        if let Some((first, _)) = bounds {
            window.reset(anchor, config.default_span, Some(first));
        }
        Self {
            store,
            sink: SampleSink::default(),
            window,
            mode: Mode::Static,
            config,
            dropped,
        }
    }

    /// Handle for the producer thread. Clones share one inbox.
    pub fn sink(&self) -> SampleSink {
        self.sink.clone()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Pre-announces a GPU so it appears in view-models before its first
    /// sample.
    pub fn register_gpu(&self, gpu_id: u32) {
        self.store.register(gpu_id);
    }

    fn data_bounds(&self) -> Option<DataBounds> {
        self.store
            .bounds()
            .map(|(first, last)| DataBounds { first, last })
    }

    /// Ingests pending samples, advances the window in live mode, and
    /// builds the view-model for every known GPU. Never blocks beyond
    /// the short inbox/store critical sections and never fails: ordering
    /// violations drop the offending sample and are surfaced through
    /// `dropped_samples`.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> ViewModel {
        let metrics = self.config.metrics.clone();
        self.refresh_with(now, &metrics)
    }

    /// `refresh` with an explicit series selection for this tick.
    pub fn refresh_with(&mut self, now: DateTime<Utc>, metrics: &[Metric]) -> ViewModel {
        let pending = std::mem::take(&mut *self.sink.inbox.lock());
        for sample in pending {
            if let Err(err) = self.store.append(sample) {
                warn!(%err, "dropping out-of-order sample");
                self.dropped += 1;
            }
        }

        if self.mode == Mode::Live {
            self.window.pin_end(now);
        }

        let mut gpus = Vec::new();
        let mut visible = 0;
        for gpu_id in self.store.known_gpu_ids() {
            let samples = self
                .store
                .range(gpu_id, self.window.start(), self.window.end());
            visible += samples.len();
            gpus.push(self.gpu_view(gpu_id, samples, metrics));
        }

        ViewModel {
            mode: self.mode,
            window_start: self.window.start(),
            window_end: self.window.end(),
            span: self.window.span(),
            visible_samples: visible,
            dropped_samples: self.dropped,
            gpus,
        }
    }

    fn gpu_view(&self, gpu_id: u32, samples: Vec<Sample>, metrics: &[Metric]) -> GpuView {
        let latest = samples
            .last()
            .cloned()
            .or_else(|| self.store.latest(gpu_id));
        let status = latest
            .as_ref()
            .map_or(StatusLabel::Unknown, |s| classify::status(s.utilization_pct));
        let bands = Metric::ALL
            .iter()
            .map(|&metric| {
                let band = latest
                    .as_ref()
                    .map_or(SeverityBand::Unknown, |s| classify::band_for(s, metric));
                (metric, band)
            })
            .collect();
        let series = metrics
            .iter()
            .map(|&metric| MetricSeries {
                metric,
                buckets: downsample::bucketize(
                    &samples,
                    metric,
                    &self.window,
                    self.config.bucket_count,
                    BucketAgg::Mean,
                ),
                ticks: downsample::axis_ticks(&samples, metric, &self.window),
            })
            .collect();
        let timeline =
            timeline::segments(&samples, &self.window, self.config.timeline_max_gap);
        GpuView {
            gpu_id,
            latest,
            status,
            bands,
            series,
            visible_samples: samples.len(),
            timeline,
        }
    }

    /// Pans back in time. From `Live` this implicitly pauses, since the
    /// window cannot move while pinned to now.
    pub fn pan_left(&mut self) -> Result<()> {
        self.window
            .pan(PanDirection::Back, self.config.pan_fraction, self.data_bounds())?;
        if self.mode == Mode::Live {
            self.mode = Mode::Paused;
        }
        Ok(())
    }

    /// Pans forward, clamping at the newest data. Reaching the live edge
    /// does not resume live mode; resume is explicit.
    pub fn pan_right(&mut self) -> Result<()> {
        self.window
            .pan(PanDirection::Forward, self.config.pan_fraction, self.data_bounds())
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.apply_zoom(1.0 / self.config.zoom_factor)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.apply_zoom(self.config.zoom_factor)
    }

    fn apply_zoom(&mut self, factor: f64) -> Result<()> {
        let pin_end = self.mode == Mode::Live;
        let bounds = if pin_end { None } else { self.data_bounds() };
        self.window.zoom(factor, pin_end, bounds)
    }

    /// Snaps to the beginning of available data; pauses a live view.
    pub fn jump_start(&mut self) -> Result<()> {
        if let Some(bounds) = self.data_bounds() {
            self.window.jump_start(bounds);
            if self.mode == Mode::Live {
                self.mode = Mode::Paused;
            }
        }
        Ok(())
    }

    /// Snaps to the end of available data, preserving the span.
    pub fn jump_end(&mut self) -> Result<()> {
        if let Some(bounds) = self.data_bounds() {
            self.window.jump_end(bounds);
        }
        Ok(())
    }

    /// Returns to the default span at the live edge (resuming `Live` for
    /// a live source) or at the recording's end in static mode.
    pub fn reset_view(&mut self, now: DateTime<Utc>) {
        match self.mode {
            Mode::Static => {
                if let Some(bounds) = self.data_bounds() {
                    self.window
                        .reset(bounds.last, self.config.default_span, Some(bounds.first));
                }
            }
            Mode::Live | Mode::Paused => {
                self.mode = Mode::Live;
                self.window.reset(now, self.config.default_span, None);
            }
        }
    }

    /// Swaps `Live` and `Paused`. Freezing keeps the bounds where they
    /// are; resuming re-pins the end to `now` with the span preserved.
    ///
    /// # Errors
    ///
    /// `InvalidNavigation` in static mode, where there is nothing to
    /// pause.
    pub fn toggle_pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.mode {
            Mode::Live => {
                self.mode = Mode::Paused;
                Ok(())
            }
            Mode::Paused => {
                self.mode = Mode::Live;
                self.window.pin_end(now);
                Ok(())
            }
            Mode::Static => Err(ViewerError::InvalidNavigation {
                reason: "pause is only available on a live source".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    fn sample_at(gpu_id: u32, offset_secs: i64, util: f64) -> Sample {
        Sample {
            timestamp: t0() + TimeDelta::seconds(offset_secs),
            gpu_id,
            utilization_pct: util,
            memory_used_mb: 1024.0,
            memory_total_mb: 8192.0,
            temperature_c: 50.0,
            power_draw_w: 150.0,
            process_label: String::new(),
        }
    }

    fn live_engine() -> ViewerEngine {
        ViewerEngine::live(ViewerConfig::default(), t0())
    }

    mod refresh_tests {
        use super::*;

        #[test]
        fn live_refresh_pins_window_end() {
            let mut engine = live_engine();
            let later = t0() + TimeDelta::seconds(30);
            let vm = engine.refresh(later);
            assert_eq!(vm.window_end, later);
            assert_eq!(vm.span, TimeDelta::seconds(60));
        }

        #[test]
        fn refresh_ingests_sink_samples() {
            let mut engine = live_engine();
            let sink = engine.sink();
            sink.push(sample_at(0, 0, 40.0));
            sink.push(sample_at(0, 1, 60.0));
            let vm = engine.refresh(t0() + TimeDelta::seconds(2));
            assert_eq!(vm.gpus.len(), 1);
            assert_eq!(vm.gpus[0].visible_samples, 2);
        }

        #[test]
        fn out_of_order_sample_is_dropped_not_fatal() {
            let mut engine = live_engine();
            let sink = engine.sink();
            sink.push(sample_at(0, 10, 40.0));
            sink.push(sample_at(0, 5, 40.0));
            sink.push(sample_at(0, 11, 40.0));
            let vm = engine.refresh(t0() + TimeDelta::seconds(12));
            assert_eq!(vm.dropped_samples, 1);
            assert_eq!(vm.gpus[0].visible_samples, 2);
        }

        #[test]
        fn registered_gpu_with_no_samples_still_present() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            engine.register_gpu(1);
            let vm = engine.refresh(t0() + TimeDelta::seconds(1));
            assert_eq!(vm.gpus.len(), 2);
            let gpu1 = vm.gpus.iter().find(|g| g.gpu_id == 1).unwrap();
            assert!(gpu1.latest.is_none());
            assert_eq!(gpu1.status, StatusLabel::Unknown);
            assert!(gpu1.timeline.is_empty());
            assert!(gpu1.series[0].ticks.is_none());
        }

        #[test]
        fn paused_refresh_keeps_the_window_but_ingests() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            engine.refresh(t0() + TimeDelta::seconds(1));
            engine.toggle_pause(t0() + TimeDelta::seconds(1)).unwrap();

            engine.sink().push(sample_at(0, 5, 40.0));
            let vm = engine.refresh(t0() + TimeDelta::seconds(6));
            assert_eq!(vm.window_end, t0() + TimeDelta::seconds(1));
            // The store still grew while paused.
            assert_eq!(engine.store.len(0), 2);
        }

        #[test]
        fn refresh_with_selects_series() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            let vm = engine.refresh_with(
                t0() + TimeDelta::seconds(1),
                &[Metric::Utilization, Metric::Temperature],
            );
            let metrics: Vec<Metric> =
                vm.gpus[0].series.iter().map(|s| s.metric).collect();
            assert_eq!(metrics, vec![Metric::Utilization, Metric::Temperature]);
        }
    }

    mod mode_tests {
        use super::*;

        #[test]
        fn pan_left_from_live_pauses() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            engine.refresh(t0() + TimeDelta::seconds(10));
            engine.pan_left().unwrap();
            assert_eq!(engine.mode(), Mode::Paused);
        }

        #[test]
        fn pan_back_to_live_edge_does_not_resume() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            engine.sink().push(sample_at(0, 10, 40.0));
            engine.refresh(t0() + TimeDelta::seconds(10));
            engine.pan_left().unwrap();
            engine.pan_right().unwrap();
            engine.pan_right().unwrap();
            assert_eq!(engine.mode(), Mode::Paused);
        }

        #[test]
        fn toggle_pause_twice_repins_to_now() {
            let mut engine = live_engine();
            engine.refresh(t0() + TimeDelta::seconds(5));
            engine.toggle_pause(t0() + TimeDelta::seconds(5)).unwrap();
            assert_eq!(engine.mode(), Mode::Paused);

            let much_later = t0() + TimeDelta::seconds(120);
            engine.toggle_pause(much_later).unwrap();
            assert_eq!(engine.mode(), Mode::Live);
            assert_eq!(engine.window().end(), much_later);
            assert_eq!(engine.window().span(), TimeDelta::seconds(60));
        }

        #[test]
        fn toggle_pause_in_static_is_invalid() {
            let mut engine =
                ViewerEngine::from_recording(vec![sample_at(0, 0, 10.0)], ViewerConfig::default());
            let err = engine.toggle_pause(t0()).unwrap_err();
            assert!(matches!(err, ViewerError::InvalidNavigation { .. }));
            assert_eq!(engine.mode(), Mode::Static);
        }

        #[test]
        fn reset_resumes_live() {
            let mut engine = live_engine();
            engine.refresh(t0() + TimeDelta::seconds(5));
            engine.toggle_pause(t0() + TimeDelta::seconds(5)).unwrap();
            let now = t0() + TimeDelta::seconds(200);
            engine.reset_view(now);
            assert_eq!(engine.mode(), Mode::Live);
            assert_eq!(engine.window().end(), now);
        }

        #[test]
        fn jump_start_pauses_a_live_view() {
            let mut engine = live_engine();
            engine.sink().push(sample_at(0, 0, 40.0));
            engine.sink().push(sample_at(0, 100, 40.0));
            engine.refresh(t0() + TimeDelta::seconds(100));
            engine.jump_start().unwrap();
            assert_eq!(engine.mode(), Mode::Paused);
            assert_eq!(engine.window().start(), t0());
        }
    }

    mod static_tests {
        use super::*;

        #[test]
        fn recording_opens_anchored_at_its_end() {
            let samples: Vec<Sample> =
                (0..300).map(|i| sample_at(0, i, 50.0)).collect();
            let engine = ViewerEngine::from_recording(samples, ViewerConfig::default());
            assert_eq!(engine.mode(), Mode::Static);
            assert_eq!(engine.window().end(), t0() + TimeDelta::seconds(299));
            assert_eq!(engine.window().span(), TimeDelta::seconds(60));
        }

        #[test]
        fn short_recording_clamps_reset_to_its_start() {
            let samples: Vec<Sample> = (0..=20).map(|i| sample_at(0, i, 50.0)).collect();
            let mut engine = ViewerEngine::from_recording(samples, ViewerConfig::default());
            engine.reset_view(t0());
            assert_eq!(engine.window().start(), t0());
            assert_eq!(engine.window().end(), t0() + TimeDelta::seconds(20));
        }

        #[test]
        fn static_pan_clamps_at_recording_bounds() {
            let samples: Vec<Sample> =
                (0..300).map(|i| sample_at(0, i, 50.0)).collect();
            let mut engine = ViewerEngine::from_recording(samples, ViewerConfig::default());
            for _ in 0..100 {
                engine.pan_left().unwrap();
            }
            assert_eq!(engine.window().start(), t0());
            for _ in 0..100 {
                engine.pan_right().unwrap();
            }
            assert_eq!(engine.window().end(), t0() + TimeDelta::seconds(299));
        }

        #[test]
        fn zoom_roundtrip_preserves_span() {
            let samples: Vec<Sample> =
                (0..600).map(|i| sample_at(0, i, 50.0)).collect();
            let mut engine = ViewerEngine::from_recording(samples, ViewerConfig::default());
            let span = engine.window().span();
            engine.zoom_out().unwrap();
            engine.zoom_in().unwrap();
            assert_eq!(engine.window().span(), span);
        }
    }
}
