//! GPU telemetry viewer engine and its collaborators.
//!
//! The core is renderer-agnostic: [`store::SeriesStore`] accumulates
//! per-GPU samples, [`window::TimeWindow`] navigates wall-clock time,
//! and [`engine::ViewerEngine`] turns both into an immutable
//! [`engine::ViewModel`] once per refresh tick. The nvidia-smi poller,
//! CSV log layer, and ratatui front end sit around that core and can be
//! replaced without touching it.

pub mod classify;
pub mod cli;
pub mod downsample;
pub mod engine;
pub mod error;
pub mod logfile;
pub mod models;
pub mod nvidia;
pub mod store;
pub mod theme;
pub mod timeline;
pub mod ui;
pub mod window;

pub use engine::{GpuView, MetricSeries, SampleSink, ViewModel, ViewerEngine};
pub use error::{Result, ViewerError};
pub use models::{Metric, Mode, Sample, SeverityBand, StatusLabel, ViewerConfig};
pub use store::SeriesStore;
pub use window::{DataBounds, PanDirection, TimeWindow};
