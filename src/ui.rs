//! Ratatui renderer. Consumes the engine's [`ViewModel`] and nothing
//! else, so it can be swapped for another front end without touching
//! the core.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Sparkline},
    Frame,
};

use crate::engine::{GpuView, MetricSeries, ViewModel};
use crate::models::{Metric, Mode, SeverityBand};
use crate::theme::*;

/// Renders the full screen: header, one panel per GPU, controls footer.
pub fn render(frame: &mut Frame, vm: &ViewModel, frame_count: u64) {
    let main_block = Block::default().style(Style::default().bg(DARK_BG));
    frame.render_widget(main_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // GPU panels
            Constraint::Length(2), // Controls footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], vm);

    if vm.gpus.is_empty() {
        render_no_gpu(frame, chunks[1], frame_count);
    } else {
        let gpu_count = vm.gpus.len();
        let gpu_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                (0..gpu_count)
                    .map(|_| Constraint::Ratio(1, gpu_count as u32))
                    .collect::<Vec<_>>(),
            )
            .split(chunks[1]);

        for (idx, gpu) in vm.gpus.iter().enumerate() {
            render_gpu(frame, gpu, gpu_chunks[idx]);
        }
    }

    render_footer(frame, chunks[2], vm);
}

fn mode_badge(mode: Mode) -> (&'static str, Color) {
    match mode {
        Mode::Live => ("● LIVE", NEON_GREEN),
        Mode::Paused => ("▐▐ PAUSED", NEON_RED),
        Mode::Static => ("◼ STATIC", CYBER_BLUE),
    }
}

fn render_header(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let (badge, badge_color) = mode_badge(vm.mode);
    let line = Line::from(vec![
        Span::styled(" ◈ ", Style::default().fg(CYBER_BLUE)),
        Span::styled(
            "GPU SCOPE ",
            Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(
            vm.window_end.format("%H:%M:%S").to_string(),
            Style::default().fg(NEON_YELLOW),
        ),
        Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(
            format!("GPUs: {}", vm.gpus.len()),
            Style::default().fg(NEON_MAGENTA),
        ),
        Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(badge, Style::default().fg(badge_color).add_modifier(Modifier::BOLD)),
    ]);

    let header = Paragraph::new(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(MATRIX_GREEN))
                .style(Style::default().bg(DARK_BG)),
        )
        .alignment(Alignment::Left);
    frame.render_widget(header, area);
}

fn render_no_gpu(frame: &mut Frame, area: Rect, frame_count: u64) {
    let blink = if frame_count % 20 < 10 { "█" } else { " " };
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  [", Style::default().fg(NEON_RED)),
            Span::styled(
                "!",
                Style::default()
                    .fg(NEON_YELLOW)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("] ", Style::default().fg(NEON_RED)),
            Span::styled(
                "WAITING FOR GPU SAMPLES",
                Style::default().fg(NEON_RED).add_modifier(Modifier::BOLD),
            ),
            Span::styled(blink, Style::default().fg(NEON_GREEN)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "      No data in the current source yet...",
            Style::default().fg(Color::DarkGray),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(NEON_RED))
        .style(Style::default().bg(DARK_BG));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn band_of(gpu: &GpuView, metric: Metric) -> SeverityBand {
    gpu.bands
        .iter()
        .find(|(m, _)| *m == metric)
        .map_or(SeverityBand::Unknown, |(_, band)| *band)
}

fn render_gpu(frame: &mut Frame, gpu: &GpuView, area: Rect) {
    let status_style = Style::default().fg(status_color(gpu.status));

    let gpu_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(MATRIX_GREEN))
        .title(vec![
            Span::styled(" ◆ ", status_style),
            Span::styled(
                format!("GPU {} ", gpu.gpu_id),
                Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
            ),
            Span::styled("│ ", Style::default().fg(MATRIX_GREEN)),
            Span::styled(gpu.status.as_str(), status_style),
            Span::styled(" ", Style::default()),
        ])
        .style(Style::default().bg(DARK_BG));

    frame.render_widget(gpu_block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Stats line
            Constraint::Length(1), // Util bar
            Constraint::Length(1), // Memory bar
            Constraint::Min(3),    // Sparklines
            Constraint::Length(1), // Process timeline
        ])
        .split(area);

    render_stats_line(frame, inner[0], gpu);
    render_gauges(frame, inner[1], inner[2], gpu);
    render_sparklines(frame, inner[3], gpu);
    render_timeline(frame, inner[4], gpu);
}

fn render_stats_line(frame: &mut Frame, area: Rect, gpu: &GpuView) {
    let Some(latest) = gpu.latest.as_ref() else {
        let line = Line::from(vec![
            Span::styled("  GPU ", Style::default().fg(Color::DarkGray)),
            Span::styled("waiting for data...", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(DARK_BG)),
            area,
        );
        return;
    };

    let util_color = band_color(band_of(gpu, Metric::Utilization));
    let temp_color = band_color(band_of(gpu, Metric::Temperature));
    let power_color = band_color(band_of(gpu, Metric::Power));
    let mem_color = band_color(band_of(gpu, Metric::MemoryUsed));

    let mut spans = vec![
        Span::styled("  ┌─ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled("UTIL: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:5.1}%", latest.utilization_pct),
            Style::default().fg(util_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled("TEMP: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:3.0}°C", latest.temperature_c),
            Style::default().fg(temp_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled("PWR: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:6.1}W", latest.power_draw_w),
            Style::default().fg(power_color),
        ),
        Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled("MEM: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.0}/{:.0}MB", latest.memory_used_mb, latest.memory_total_mb),
            Style::default().fg(mem_color),
        ),
    ];
    if !latest.process_label.is_empty() {
        spans.push(Span::styled(" │ ⚙ ", Style::default().fg(MATRIX_GREEN)));
        spans.push(Span::styled(
            latest.process_label.clone(),
            Style::default().fg(NEON_MAGENTA),
        ));
    }
    spans.push(Span::styled(" ─┐", Style::default().fg(MATRIX_GREEN)));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(DARK_BG)),
        area,
    );
}

fn render_gauges(frame: &mut Frame, util_area: Rect, mem_area: Rect, gpu: &GpuView) {
    let Some(latest) = gpu.latest.as_ref() else {
        return;
    };

    let util = latest.utilization_pct.clamp(0.0, 100.0);
    let util_gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE).style(Style::default().bg(DARK_BG)))
        .gauge_style(
            Style::default()
                .fg(band_color(band_of(gpu, Metric::Utilization)))
                .bg(Color::Rgb(20, 20, 30)),
        )
        .percent(util as u16)
        .label(Span::styled(
            format!("▓ GPU {util:5.1}%"),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(util_gauge, util_area);

    let mem_pct = latest.memory_pct();
    let mem_pct = if mem_pct.is_finite() { mem_pct.clamp(0.0, 100.0) } else { 0.0 };
    let mem_gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE).style(Style::default().bg(DARK_BG)))
        .gauge_style(
            Style::default()
                .fg(band_color(band_of(gpu, Metric::MemoryUsed)))
                .bg(Color::Rgb(20, 20, 30)),
        )
        .percent(mem_pct as u16)
        .label(Span::styled(
            format!("▓ MEM {mem_pct:5.1}%"),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(mem_gauge, mem_area);
}

fn render_sparklines(frame: &mut Frame, area: Rect, gpu: &GpuView) {
    if gpu.series.is_empty() {
        return;
    }
    let count = gpu.series.len();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            (0..count)
                .map(|_| Constraint::Ratio(1, count as u32))
                .collect::<Vec<_>>(),
        )
        .split(area);

    for (idx, series) in gpu.series.iter().enumerate() {
        render_metric_sparkline(frame, chunks[idx], series);
    }
}

fn render_metric_sparkline(frame: &mut Frame, area: Rect, series: &MetricSeries) {
    // NoData buckets stay absent so the sparkline shows a real gap
    // instead of a zero.
    let data: Vec<Option<u64>> = series
        .buckets
        .iter()
        .map(|bucket| bucket.map(|v| v.max(0.0) as u64))
        .collect();

    let title = match &series.ticks {
        Some(ticks) => format!(
            " ◇ {} {}  {:.0}..{:.0}  {}→{} ",
            series.metric.label(),
            series.metric.unit(),
            ticks.min_value,
            ticks.max_value,
            ticks.start_label,
            ticks.end_label,
        ),
        None => format!(" ◇ {} {}  no data ", series.metric.label(), series.metric.unit()),
    };

    let max = match series.metric {
        Metric::Utilization => 100,
        _ => series
            .ticks
            .as_ref()
            .map_or(1, |t| (t.max_value.ceil() as u64).max(1)),
    };

    let color = metric_color(series.metric);
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Rgb(40, 80, 40)))
                .title(Span::styled(title, Style::default().fg(color)))
                .style(Style::default().bg(DARK_BG)),
        )
        .data(data)
        .style(Style::default().fg(color))
        .max(max);
    frame.render_widget(sparkline, area);
}

fn render_timeline(frame: &mut Frame, area: Rect, gpu: &GpuView) {
    let mut spans = vec![Span::styled("  ⚙ ", Style::default().fg(Color::DarkGray))];
    if gpu.timeline.is_empty() {
        spans.push(Span::styled("—", Style::default().fg(Color::DarkGray)));
    } else {
        for (idx, segment) in gpu.timeline.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)));
            }
            let label = if segment.label.is_empty() { "idle" } else { &segment.label };
            let style = if segment.label.is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(NEON_MAGENTA)
            };
            spans.push(Span::styled(label.to_string(), style));
            spans.push(Span::styled(
                format!(
                    " {}–{}",
                    segment.start.format("%H:%M:%S"),
                    segment.end.format("%H:%M:%S")
                ),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(DARK_BG)),
        area,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let (badge, badge_color) = mode_badge(vm.mode);
    let mut spans = vec![
        Span::styled("  ", Style::default()),
        Span::styled(
            vm.window_start.format("%H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(" → ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(
            vm.window_end.format("%H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("  {}s", vm.span.num_seconds()),
            Style::default().fg(CYBER_BLUE),
        ),
        Span::styled("  │  ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(badge, Style::default().fg(badge_color)),
        Span::styled("  │  ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(
            format!("{} samples", vm.visible_samples),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if vm.dropped_samples > 0 {
        spans.push(Span::styled("  │  ", Style::default().fg(MATRIX_GREEN)));
        spans.push(Span::styled(
            format!("{} dropped", vm.dropped_samples),
            Style::default().fg(NEON_RED),
        ));
    }

    let help = Line::from(vec![Span::styled(
        "  ←/h pan  →/l pan  +/k zoom in  -/j zoom out  Home/End jump  r reset  Space pause  q quit",
        Style::default().fg(Color::DarkGray),
    )]);

    let footer = Paragraph::new(vec![Line::from(spans), help]).style(Style::default().bg(DARK_BG));
    frame.render_widget(footer, area);
}
