//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::Metric;

/// Log and visualize NVIDIA GPU metrics.
///
/// With no subcommand, samples nvidia-smi, logs to an auto-named CSV,
/// and opens the live viewer in one process.
#[derive(Debug, Parser)]
#[command(name = "gpu-scope", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log GPU metrics to CSV without a UI.
    Log {
        /// Sampling interval in seconds.
        #[arg(long, default_value_t = 1.0)]
        interval: f64,

        /// Output log file path (default: auto-generated under logs/).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Visualize a recorded log file.
    View {
        /// Path to the log file to visualize.
        logfile: Option<PathBuf>,

        /// Visualize the most recent log file instead.
        #[arg(long)]
        latest: bool,

        /// Follow the file as new data is logged.
        #[arg(long)]
        live: bool,

        /// Plot GPU utilization.
        #[arg(long)]
        show_gpu: bool,

        /// Plot temperature.
        #[arg(long)]
        show_temp: bool,

        /// Plot power draw.
        #[arg(long)]
        show_power: bool,

        /// Plot every metric.
        #[arg(long)]
        show_all: bool,
    },

    /// List available log files.
    List,
}

/// Resolves the `--show-*` flags into the series selection. Memory is
/// always plotted; the flags add the rest.
pub fn selected_metrics(show_gpu: bool, show_temp: bool, show_power: bool, show_all: bool) -> Vec<Metric> {
    let mut metrics = Vec::new();
    if show_gpu || show_all {
        metrics.push(Metric::Utilization);
    }
    metrics.push(Metric::MemoryUsed);
    if show_temp || show_all {
        metrics.push(Metric::Temperature);
    }
    if show_power || show_all {
        metrics.push(Metric::Power);
    }
    metrics
}
