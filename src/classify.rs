//! Pure value classification: severity bands and status labels.
//!
//! Thresholds are fixed by design and shared by every front end; color
//! and icon choices belong to the renderer.

use crate::models::{Metric, Sample, SeverityBand, StatusLabel};

/// Classifies a percentage-scale value into a severity band.
///
/// Ties resolve to the lower-severity band: exactly 50 is `Moderate`,
/// exactly 75 is `Moderate`. Non-finite input classifies as `Unknown`.
pub fn band(pct: f64) -> SeverityBand {
    if !pct.is_finite() {
        return SeverityBand::Unknown;
    }
    if pct < 50.0 {
        SeverityBand::Safe
    } else if pct <= 75.0 {
        SeverityBand::Moderate
    } else {
        SeverityBand::High
    }
}

/// Derives the GPU status label from utilization.
///
/// Exactly 30 is `Active`, exactly 80 is `Active`; anything above 80 is
/// `Hot`. Non-finite input classifies as `Unknown`.
pub fn status(utilization_pct: f64) -> StatusLabel {
    if !utilization_pct.is_finite() {
        return StatusLabel::Unknown;
    }
    if utilization_pct < 30.0 {
        StatusLabel::Idle
    } else if utilization_pct <= 80.0 {
        StatusLabel::Active
    } else {
        StatusLabel::Hot
    }
}

/// Bands one of a sample's metrics, normalizing to a percent scale first.
///
/// Utilization and temperature are already on a 0-100 display scale;
/// memory is judged as percent of total; power against a 400 W envelope.
pub fn band_for(sample: &Sample, metric: Metric) -> SeverityBand {
    let pct = match metric {
        Metric::Utilization => sample.utilization_pct,
        Metric::MemoryUsed => sample.memory_pct(),
        Metric::Temperature => sample.temperature_c,
        Metric::Power => sample.power_draw_w / 400.0 * 100.0,
    };
    band(pct)
}
