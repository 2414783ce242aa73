//! The navigable time window over sample history.
//!
//! `TimeWindow` is pure geometry: it holds no reference to any data and
//! is evaluated against whichever store is live. Callers pass in the
//! data's `DataBounds` when an operation should clamp to them.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{Result, ViewerError};

/// Earliest and latest sample timestamps known to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataBounds {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Direction of a pan step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanDirection {
    Back,
    Forward,
}

/// A `[start, end)` view over wall-clock time with a clamped span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_span: TimeDelta,
    max_span: TimeDelta,
}

fn scale(span: TimeDelta, factor: f64) -> TimeDelta {
    TimeDelta::milliseconds((span.num_milliseconds() as f64 * factor).round() as i64)
}

impl TimeWindow {
    /// Creates a window of `span` ending at `end`. The span is clamped
    /// into `[min_span, max_span]`.
    pub fn anchored(
        end: DateTime<Utc>,
        span: TimeDelta,
        min_span: TimeDelta,
        max_span: TimeDelta,
    ) -> Self {
        let span = span.clamp(min_span, max_span);
        Self {
            start: end - span,
            end,
            min_span,
            max_span,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Current span, `end - start`.
    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Half-open containment: `start <= ts < end`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Re-pins the end to `now`, preserving the span. Used on every live
    /// refresh.
    pub fn pin_end(&mut self, now: DateTime<Utc>) {
        let span = self.span();
        self.end = now;
        self.start = now - span;
    }

    /// Shifts the window by `fraction` of its span, clamping to the data
    /// bounds when given.
    ///
    /// # Errors
    ///
    /// `InvalidNavigation` when `fraction` is not a positive finite
    /// number; the window is unchanged.
    pub fn pan(
        &mut self,
        direction: PanDirection,
        fraction: f64,
        bounds: Option<DataBounds>,
    ) -> Result<()> {
        if !fraction.is_finite() || fraction <= 0.0 {
            return Err(ViewerError::InvalidNavigation {
                reason: format!("pan fraction must be positive and finite, got {fraction}"),
            });
        }
        let shift = scale(self.span(), fraction);
        match direction {
            PanDirection::Back => {
                self.start -= shift;
                self.end -= shift;
            }
            PanDirection::Forward => {
                self.start += shift;
                self.end += shift;
            }
        }
        self.clamp_to(bounds);
        Ok(())
    }

    /// Multiplies the span by `factor` (`>1` zooms out, `<1` zooms in),
    /// clamped to `[min_span, max_span]`. With `pin_end` the end stays
    /// fixed (live viewing); otherwise the center is held.
    ///
    /// # Errors
    ///
    /// `InvalidNavigation` when `factor` is not a positive finite number;
    /// the window is unchanged.
    pub fn zoom(&mut self, factor: f64, pin_end: bool, bounds: Option<DataBounds>) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewerError::InvalidNavigation {
                reason: format!("zoom factor must be positive and finite, got {factor}"),
            });
        }
        let new_span = scale(self.span(), factor).clamp(self.min_span, self.max_span);
        if pin_end {
            self.start = self.end - new_span;
        } else {
            let center = self.start + self.span() / 2;
            self.start = center - new_span / 2;
            self.end = self.start + new_span;
        }
        self.clamp_to(bounds);
        Ok(())
    }

    /// Snaps the window to the beginning of the data, preserving the span.
    pub fn jump_start(&mut self, bounds: DataBounds) {
        let span = self.span();
        self.start = bounds.first;
        self.end = bounds.first + span;
    }

    /// Snaps the window to the end of the data, preserving the span.
    pub fn jump_end(&mut self, bounds: DataBounds) {
        let span = self.span();
        self.end = bounds.last;
        self.start = bounds.last - span;
    }

    /// Returns to the default span anchored at `anchor_end`. When `floor`
    /// is given (a recording shorter than the default span), the start is
    /// clamped up to it, shrinking the window to the recorded range.
    pub fn reset(
        &mut self,
        anchor_end: DateTime<Utc>,
        default_span: TimeDelta,
        floor: Option<DateTime<Utc>>,
    ) {
        let span = default_span.clamp(self.min_span, self.max_span);
        self.end = anchor_end;
        self.start = anchor_end - span;
        if let Some(floor) = floor {
            if self.start < floor {
                self.start = floor;
            }
        }
    }

    /// Keeps the window inside the data bounds without shrinking the
    /// span. When the span exceeds the recorded range the window covers
    /// the recording from its start and runs past the last sample.
    fn clamp_to(&mut self, bounds: Option<DataBounds>) {
        let Some(bounds) = bounds else { return };
        let span = self.span();
        let available = bounds.last - bounds.first;
        if span >= available {
            self.start = bounds.first;
            self.end = bounds.first + span;
        } else if self.start < bounds.first {
            self.start = bounds.first;
            self.end = bounds.first + span;
        } else if self.end > bounds.last {
            self.end = bounds.last;
            self.start = bounds.last - span;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: TimeDelta = TimeDelta::seconds(5);
    const MAX: TimeDelta = TimeDelta::seconds(3600);

    fn t0() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    fn window_secs(span: i64) -> TimeWindow {
        TimeWindow::anchored(t0(), TimeDelta::seconds(span), MIN, MAX)
    }

    mod span_tests {
        use super::*;

        #[test]
        fn anchored_clamps_span() {
            let w = TimeWindow::anchored(t0(), TimeDelta::seconds(1), MIN, MAX);
            assert_eq!(w.span(), MIN);
            let w = TimeWindow::anchored(t0(), TimeDelta::hours(5), MIN, MAX);
            assert_eq!(w.span(), MAX);
        }

        #[test]
        fn contains_is_half_open() {
            let w = window_secs(60);
            assert!(w.contains(w.start()));
            assert!(!w.contains(w.end()));
            assert!(w.contains(w.end() - TimeDelta::milliseconds(1)));
        }

        #[test]
        fn pin_end_preserves_span() {
            let mut w = window_secs(60);
            let later = t0() + TimeDelta::seconds(30);
            w.pin_end(later);
            assert_eq!(w.end(), later);
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }
    }

    mod pan_tests {
        use super::*;

        #[test]
        fn pan_back_shifts_by_fraction() {
            let mut w = window_secs(60);
            w.pan(PanDirection::Back, 0.25, None).unwrap();
            assert_eq!(w.end(), t0() - TimeDelta::seconds(15));
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn pan_forward_clamps_at_data_end() {
            let mut w = window_secs(60);
            let bounds = DataBounds {
                first: t0() - TimeDelta::seconds(300),
                last: t0() + TimeDelta::seconds(5),
            };
            w.pan(PanDirection::Forward, 0.5, Some(bounds)).unwrap();
            assert_eq!(w.end(), bounds.last);
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn pan_back_clamps_at_data_start() {
            let mut w = window_secs(60);
            let bounds = DataBounds {
                first: t0() - TimeDelta::seconds(70),
                last: t0(),
            };
            w.pan(PanDirection::Back, 1.0, Some(bounds)).unwrap();
            assert_eq!(w.start(), bounds.first);
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn pan_rejects_bad_fraction() {
            let mut w = window_secs(60);
            let before = w;
            assert!(w.pan(PanDirection::Back, 0.0, None).is_err());
            assert!(w.pan(PanDirection::Back, -1.0, None).is_err());
            assert!(w.pan(PanDirection::Back, f64::NAN, None).is_err());
            assert_eq!(w, before);
        }
    }

    mod zoom_tests {
        use super::*;

        #[test]
        fn zoom_out_doubles_span_holding_center() {
            let mut w = window_secs(60);
            let center = w.start() + w.span() / 2;
            w.zoom(2.0, false, None).unwrap();
            assert_eq!(w.span(), TimeDelta::seconds(120));
            assert_eq!(w.start() + w.span() / 2, center);
        }

        #[test]
        fn zoom_then_inverse_restores_span() {
            let mut w = window_secs(60);
            w.zoom(2.0, false, None).unwrap();
            w.zoom(0.5, false, None).unwrap();
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn zoom_clamps_at_min_span() {
            let mut w = window_secs(8);
            w.zoom(0.5, false, None).unwrap();
            assert_eq!(w.span(), MIN);
        }

        #[test]
        fn zoom_with_pinned_end_keeps_end() {
            let mut w = window_secs(60);
            w.zoom(0.5, true, None).unwrap();
            assert_eq!(w.end(), t0());
            assert_eq!(w.span(), TimeDelta::seconds(30));
        }

        #[test]
        fn zoom_rejects_bad_factor() {
            let mut w = window_secs(60);
            let before = w;
            assert!(w.zoom(0.0, false, None).is_err());
            assert!(w.zoom(f64::INFINITY, false, None).is_err());
            assert_eq!(w, before);
        }
    }

    mod jump_and_reset_tests {
        use super::*;

        fn bounds() -> DataBounds {
            DataBounds {
                first: t0() - TimeDelta::seconds(600),
                last: t0(),
            }
        }

        #[test]
        fn jump_start_snaps_to_first() {
            let mut w = window_secs(60);
            w.jump_start(bounds());
            assert_eq!(w.start(), bounds().first);
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn jump_end_snaps_to_last() {
            let mut w = window_secs(60);
            w.jump_start(bounds());
            w.jump_end(bounds());
            assert_eq!(w.end(), bounds().last);
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn reset_anchors_default_span() {
            let mut w = window_secs(600);
            w.reset(t0(), TimeDelta::seconds(60), None);
            assert_eq!(w.end(), t0());
            assert_eq!(w.span(), TimeDelta::seconds(60));
        }

        #[test]
        fn reset_clamps_to_short_recording() {
            let mut w = window_secs(60);
            let recording_start = t0() - TimeDelta::seconds(20);
            w.reset(t0(), TimeDelta::seconds(60), Some(recording_start));
            assert_eq!(w.start(), recording_start);
            assert_eq!(w.end(), t0());
            assert_eq!(w.span(), TimeDelta::seconds(20));
        }
    }
}
