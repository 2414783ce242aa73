//! nvidia-smi telemetry source.
//!
//! Produces parsed [`Sample`] batches; the engine never sees raw
//! nvidia-smi output. Process labels come from a second query joined
//! through the GPU uuid map, since `--query-compute-apps` reports uuids
//! rather than indexes.

use std::collections::HashMap;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::engine::SampleSink;
use crate::error::{Result, ViewerError};
use crate::logfile::LogWriter;
use crate::models::Sample;

const METRICS_QUERY: &str =
    "--query-gpu=index,utilization.gpu,memory.used,memory.total,temperature.gpu,power.draw";
const UUID_QUERY: &str = "--query-gpu=index,uuid";
const PROCESS_QUERY: &str = "--query-compute-apps=pid,process_name,gpu_uuid";
const CSV_FORMAT: &str = "--format=csv,noheader,nounits";

fn run_query(query: &str) -> Result<String> {
    let output = Command::new("nvidia-smi")
        .arg(query)
        .arg(CSV_FORMAT)
        .output()
        .map_err(|e| ViewerError::Telemetry {
            reason: format!("failed to invoke nvidia-smi: {e}"),
        })?;
    if !output.status.success() {
        return Err(ViewerError::Telemetry {
            reason: format!("nvidia-smi exited with {}", output.status),
        });
    }
    String::from_utf8(output.stdout).map_err(|e| ViewerError::Telemetry {
        reason: format!("nvidia-smi output was not utf-8: {e}"),
    })
}

/// Maps GPU uuid to index. Best effort: failures yield an empty map and
/// samples simply carry no process label this tick.
fn query_uuid_map() -> HashMap<String, u32> {
    let Ok(output) = run_query(UUID_QUERY) else {
        return HashMap::new();
    };
    let mut map = HashMap::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() >= 2 {
            if let Ok(index) = parts[0].parse::<u32>() {
                map.insert(parts[1].to_string(), index);
            }
        }
    }
    map
}

/// Active compute processes per GPU index, multiple labels joined with
/// `"; "`. Best effort like the uuid map.
fn query_processes(uuid_map: &HashMap<String, u32>) -> HashMap<u32, String> {
    let Ok(output) = run_query(PROCESS_QUERY) else {
        return HashMap::new();
    };
    let mut processes: HashMap<u32, String> = HashMap::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() >= 3 {
            let name = parts[1];
            let Some(&gpu_id) = uuid_map.get(parts[2]) else {
                continue;
            };
            processes
                .entry(gpu_id)
                .and_modify(|joined| {
                    joined.push_str("; ");
                    joined.push_str(name);
                })
                .or_insert_with(|| name.to_string());
        }
    }
    processes
}

fn parse_metrics_line(
    line: &str,
    now: DateTime<Utc>,
    processes: &HashMap<u32, String>,
) -> Option<Sample> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        return None;
    }
    let gpu_id: u32 = parts[0].parse().ok()?;
    Some(Sample {
        timestamp: now,
        gpu_id,
        utilization_pct: parts[1].parse().unwrap_or(0.0),
        memory_used_mb: parts[2].parse().unwrap_or(0.0),
        memory_total_mb: parts[3].parse().unwrap_or(0.0),
        temperature_c: parts[4].parse().unwrap_or(0.0),
        power_draw_w: parts[5].parse().unwrap_or(0.0),
        process_label: processes.get(&gpu_id).cloned().unwrap_or_default(),
    })
}

/// Queries nvidia-smi once and returns one sample per discovered GPU.
///
/// # Errors
///
/// `Telemetry` when nvidia-smi cannot be invoked or fails; a missing
/// process query is not an error, the labels just stay empty.
pub fn sample_gpus() -> Result<Vec<Sample>> {
    let output = run_query(METRICS_QUERY)?;
    let uuid_map = query_uuid_map();
    let processes = query_processes(&uuid_map);

    // One timestamp for the whole batch keeps per-tick rows aligned.
    let now = Utc::now();
    let samples: Vec<Sample> = output
        .lines()
        .filter_map(|line| parse_metrics_line(line, now, &processes))
        .collect();
    debug!(gpus = samples.len(), "sampled nvidia-smi");
    Ok(samples)
}

/// Runs the poll loop on its own thread: sample, optionally log to CSV,
/// hand the batch to the engine's sink, sleep. Query failures skip the
/// tick with a warning; they never reach the core. Clearing `running`
/// stops the loop.
pub fn spawn_sampler(
    sink: SampleSink,
    interval: Duration,
    mut writer: Option<LogWriter>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            match sample_gpus() {
                Ok(batch) => {
                    if let Some(writer) = writer.as_mut() {
                        if let Err(err) = writer.append(&batch) {
                            warn!(%err, "failed to write log batch");
                        }
                    }
                    sink.push_batch(batch);
                }
                Err(err) => warn!(%err, "telemetry tick skipped"),
            }
            thread::sleep(interval);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn parse_metrics_line_full() {
        let processes = HashMap::from([(0, "train.py".to_string())]);
        let sample =
            parse_metrics_line("0, 87, 14890, 24576, 71, 289.40", now(), &processes).unwrap();
        assert_eq!(sample.timestamp, now());
        assert_eq!(sample.gpu_id, 0);
        assert_eq!(sample.utilization_pct, 87.0);
        assert_eq!(sample.memory_used_mb, 14890.0);
        assert_eq!(sample.memory_total_mb, 24576.0);
        assert_eq!(sample.temperature_c, 71.0);
        assert_eq!(sample.power_draw_w, 289.4);
        assert_eq!(sample.process_label, "train.py");
    }

    #[test]
    fn parse_metrics_line_tolerates_unparsable_fields() {
        let sample =
            parse_metrics_line("1, [N/A], 1024, 8192, 40, [N/A]", now(), &HashMap::new()).unwrap();
        assert_eq!(sample.gpu_id, 1);
        assert_eq!(sample.utilization_pct, 0.0);
        assert_eq!(sample.power_draw_w, 0.0);
        assert!(sample.process_label.is_empty());
    }

    #[test]
    fn parse_metrics_line_rejects_short_lines() {
        assert!(parse_metrics_line("0, 50", now(), &HashMap::new()).is_none());
        assert!(parse_metrics_line("", now(), &HashMap::new()).is_none());
    }
}
