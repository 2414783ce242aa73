//! Palette and the mapping from classifier output to colors.
//!
//! The engine's severity bands are renderer-agnostic; everything
//! color-shaped lives here so alternate front ends can restyle without
//! touching classification.

use ratatui::style::Color;

use crate::models::{Metric, SeverityBand, StatusLabel};

pub const NEON_GREEN: Color = Color::Rgb(0, 160, 50);
pub const NEON_CYAN: Color = Color::Rgb(0, 150, 160);
pub const NEON_MAGENTA: Color = Color::Rgb(160, 60, 160);
pub const NEON_YELLOW: Color = Color::Rgb(180, 160, 60);
pub const NEON_RED: Color = Color::Rgb(180, 60, 60);
pub const DARK_BG: Color = Color::Rgb(15, 15, 25);
pub const MATRIX_GREEN: Color = Color::Rgb(30, 130, 30);
pub const CYBER_BLUE: Color = Color::Rgb(60, 130, 180);

pub fn band_color(band: SeverityBand) -> Color {
    match band {
        SeverityBand::Safe => NEON_GREEN,
        SeverityBand::Moderate => NEON_YELLOW,
        SeverityBand::High => NEON_RED,
        SeverityBand::Unknown => Color::DarkGray,
    }
}

pub fn status_color(status: StatusLabel) -> Color {
    match status {
        StatusLabel::Idle => NEON_GREEN,
        StatusLabel::Active => NEON_YELLOW,
        StatusLabel::Hot => NEON_RED,
        StatusLabel::Unknown => Color::DarkGray,
    }
}

pub fn metric_color(metric: Metric) -> Color {
    match metric {
        Metric::Utilization => MATRIX_GREEN,
        Metric::MemoryUsed => NEON_MAGENTA,
        Metric::Temperature => NEON_RED,
        Metric::Power => NEON_YELLOW,
    }
}
