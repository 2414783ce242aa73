use chrono::{DateTime, TimeDelta, Utc};

/// One GPU's telemetry at one instant. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub gpu_id: u32,
    pub utilization_pct: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_c: f64,
    pub power_draw_w: f64,
    /// Active process/function on the GPU. Empty means idle.
    pub process_label: String,
}

impl Sample {
    /// Extracts the scalar for the given metric.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Utilization => self.utilization_pct,
            Metric::MemoryUsed => self.memory_used_mb,
            Metric::Temperature => self.temperature_c,
            Metric::Power => self.power_draw_w,
        }
    }

    /// Memory usage as percent of total. NaN when total is unknown.
    pub fn memory_pct(&self) -> f64 {
        if self.memory_total_mb > 0.0 {
            self.memory_used_mb / self.memory_total_mb * 100.0
        } else {
            f64::NAN
        }
    }
}

/// Which telemetry series to extract from a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Utilization,
    MemoryUsed,
    Temperature,
    Power,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Utilization,
        Metric::MemoryUsed,
        Metric::Temperature,
        Metric::Power,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Utilization => "UTIL",
            Metric::MemoryUsed => "MEM",
            Metric::Temperature => "TEMP",
            Metric::Power => "PWR",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Utilization => "%",
            Metric::MemoryUsed => "MB",
            Metric::Temperature => "°C",
            Metric::Power => "W",
        }
    }
}

/// Severity classification of a metric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeverityBand {
    Safe,
    Moderate,
    High,
    Unknown,
}

/// Coarse GPU status derived from utilization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLabel {
    Idle,
    Active,
    Hot,
    Unknown,
}

impl StatusLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLabel::Idle => "IDLE",
            StatusLabel::Active => "ACTIVE",
            StatusLabel::Hot => "HOT",
            StatusLabel::Unknown => "N/A",
        }
    }
}

/// Viewing mode. `Live`/`Paused` are reachable only with a live source,
/// `Static` only when viewing a finished recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Live,
    Paused,
    Static,
}

/// Tunables for the viewer engine: 60 s default window, 5 s zoom
/// floor, quarter-window pan steps.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub default_span: TimeDelta,
    pub min_span: TimeDelta,
    pub max_span: TimeDelta,
    pub pan_fraction: f64,
    pub zoom_factor: f64,
    pub bucket_count: usize,
    /// Sampling gaps longer than this split a process-timeline segment.
    pub timeline_max_gap: TimeDelta,
    /// Which series get bucketed each refresh.
    pub metrics: Vec<Metric>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_span: TimeDelta::seconds(60),
            min_span: TimeDelta::seconds(5),
            max_span: TimeDelta::hours(1),
            pan_fraction: 0.25,
            zoom_factor: 2.0,
            bucket_count: 40,
            timeline_max_gap: TimeDelta::seconds(5),
            metrics: vec![Metric::MemoryUsed],
        }
    }
}
