//! CSV log format: writer, reader, and live follower.
//!
//! The format is owned here, not by the engine; the engine only ever
//! sees parsed [`Sample`]s. One row per GPU per tick, nvidia-smi style
//! timestamps, commas in process labels rewritten to `;` so rows stay
//! splittable.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::models::Sample;

pub const LOG_HEADER: &str =
    "timestamp,gpu_id,utilization_gpu,memory_used,memory_total,temperature,power_draw,process_info";

const TS_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";
const TS_FORMAT_NO_MILLIS: &str = "%Y/%m/%d %H:%M:%S";

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, TS_FORMAT_NO_MILLIS))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Renders one sample as a CSV row (no trailing newline).
pub fn format_line(sample: &Sample) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        format_timestamp(sample.timestamp),
        sample.gpu_id,
        sample.utilization_pct,
        sample.memory_used_mb,
        sample.memory_total_mb,
        sample.temperature_c,
        sample.power_draw_w,
        sample.process_label.replace(',', ";"),
    )
}

/// Parses one CSV row. `None` for headers, blank lines, and malformed
/// rows; callers skip and continue. The process column is optional for
/// logs written before it existed.
pub fn parse_line(line: &str) -> Option<Sample> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 7 {
        return None;
    }
    let timestamp = parse_timestamp(parts[0])?;
    Some(Sample {
        timestamp,
        gpu_id: parts[1].parse().ok()?,
        utilization_pct: parts[2].parse().ok()?,
        memory_used_mb: parts[3].parse().ok()?,
        memory_total_mb: parts[4].parse().ok()?,
        temperature_c: parts[5].parse().ok()?,
        power_draw_w: parts[6].parse().unwrap_or(0.0),
        process_label: parts.get(7).map(|s| s.to_string()).unwrap_or_default(),
    })
}

/// Append-only CSV writer, flushed per batch so a live viewer tailing
/// the file sees whole rows.
pub struct LogWriter {
    out: BufWriter<File>,
}

impl LogWriter {
    /// Opens `path` for appending, creating parent directories and
    /// writing the header when the file is new or empty.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut out = BufWriter::new(file);
        if is_empty {
            writeln!(out, "{LOG_HEADER}")?;
            out.flush()?;
        }
        Ok(Self { out })
    }

    /// Appends one batch of samples and flushes.
    pub fn append(&mut self, samples: &[Sample]) -> Result<()> {
        for sample in samples {
            writeln!(self.out, "{}", format_line(sample))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Reads a whole recording. Malformed rows are skipped, matching the
/// lenient readers this format has always had.
pub fn read_log(path: &Path) -> Result<Vec<Sample>> {
    let text = fs::read_to_string(path)?;
    let mut samples = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() || line.starts_with("timestamp") {
            continue;
        }
        match parse_line(line) {
            Some(sample) => samples.push(sample),
            None => debug!(line, "skipping malformed log row"),
        }
    }
    Ok(samples)
}

/// Incremental reader over a growing log file. Remembers the byte offset
/// of the last complete row, so each poll parses only appended data.
pub struct LogFollower {
    path: PathBuf,
    offset: u64,
}

impl LogFollower {
    /// Follower starting at the top of the file.
    pub fn new(path: PathBuf) -> Self {
        Self { path, offset: 0 }
    }

    /// Parses rows appended since the last poll. A file shorter than the
    /// remembered offset (rotated or truncated) restarts from the top.
    pub fn poll(&mut self) -> Result<Vec<Sample>> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len < self.offset {
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;

        // Only consume complete rows; a partial trailing row waits for
        // the next poll.
        let Some(complete) = text.rfind('\n') else {
            return Ok(Vec::new());
        };
        let chunk = &text[..=complete];
        self.offset += chunk.len() as u64;

        let samples = chunk
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with("timestamp"))
            .filter_map(parse_line)
            .collect();
        Ok(samples)
    }
}

/// All `gpu_*.csv` files under `dir`, oldest first by modification time.
pub fn find_logs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut logs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("gpu_") && name.ends_with(".csv"))
        })
        .collect();
    logs.sort_by_key(|path| {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });
    logs
}

/// The most recently modified log file, if any.
pub fn latest_log(dir: &Path) -> Option<PathBuf> {
    find_logs(dir).pop()
}

/// Default directory for recordings.
pub fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Auto-generated log name for a new run.
pub fn timestamped_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("gpu_{}.csv", Utc::now().format("%Y%m%d_%H%M%S")))
}
