use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use gpu_scope::cli::{self, Cli, Command};
use gpu_scope::engine::ViewerEngine;
use gpu_scope::logfile::{self, LogFollower, LogWriter};
use gpu_scope::models::{Metric, ViewerConfig};
use gpu_scope::{nvidia, ui};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);
const INPUT_POLL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        None => run_combined(),
        Some(Command::Log { interval, output }) => run_log(interval, output).await,
        Some(Command::View {
            logfile,
            latest,
            live,
            show_gpu,
            show_temp,
            show_power,
            show_all,
        }) => run_view(
            logfile,
            latest,
            live,
            cli::selected_metrics(show_gpu, show_temp, show_power, show_all),
        ),
        Some(Command::List) => run_list(),
    }
}

/// Default mode: sample, log, and view in one process.
fn run_combined() -> anyhow::Result<()> {
    let logs_dir = logfile::default_logs_dir();
    let path = logfile::timestamped_log_path(&logs_dir);
    let writer = LogWriter::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    let mut engine = ViewerEngine::live(ViewerConfig::default(), Utc::now());
    let running = Arc::new(AtomicBool::new(true));
    let sampler = nvidia::spawn_sampler(
        engine.sink(),
        REFRESH_INTERVAL,
        Some(writer),
        Arc::clone(&running),
    );

    let result = run_viewer(&mut engine, None);

    running.store(false, Ordering::Relaxed);
    let _ = sampler.join();
    result
}

/// Headless logging loop, stopped with Ctrl+C.
async fn run_log(interval: f64, output: Option<PathBuf>) -> anyhow::Result<()> {
    if !interval.is_finite() || interval <= 0.0 {
        bail!("--interval must be a positive number of seconds");
    }
    let path = output
        .unwrap_or_else(|| logfile::timestamped_log_path(&logfile::default_logs_dir()));
    let mut writer = LogWriter::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    println!("Logging GPU metrics to: {}", path.display());
    println!("Sampling interval: {interval}s");
    println!("Press Ctrl+C to stop");

    let interval = Duration::from_secs_f64(interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = tokio::time::sleep(interval) => {
                match nvidia::sample_gpus() {
                    Ok(batch) => writer.append(&batch)?,
                    Err(err) => warn!(%err, "telemetry tick skipped"),
                }
            }
        }
    }
    println!("\nStopped logging.");
    Ok(())
}

fn run_view(
    logfile_arg: Option<PathBuf>,
    latest: bool,
    live: bool,
    metrics: Vec<Metric>,
) -> anyhow::Result<()> {
    let path = if latest {
        logfile::latest_log(&logfile::default_logs_dir())
            .context("no log files found in logs/")?
    } else if let Some(path) = logfile_arg {
        if !path.exists() {
            bail!("log file not found: {}", path.display());
        }
        path
    } else {
        bail!("specify a log file or use --latest");
    };

    let config = ViewerConfig {
        metrics,
        ..ViewerConfig::default()
    };

    if live {
        // Follow the growing file; the first poll loads the history.
        let mut engine = ViewerEngine::live(config, Utc::now());
        let mut follower = LogFollower::new(path);
        run_viewer(&mut engine, Some(&mut follower))
    } else {
        let samples = logfile::read_log(&path)?;
        let mut engine = ViewerEngine::from_recording(samples, config);
        run_viewer(&mut engine, None)
    }
}

fn run_list() -> anyhow::Result<()> {
    let logs = logfile::find_logs(&logfile::default_logs_dir());
    if logs.is_empty() {
        println!("No log files found in logs/");
        return Ok(());
    }
    println!("Found {} log file(s):\n", logs.len());
    for path in logs {
        let meta = std::fs::metadata(&path)?;
        let modified: chrono::DateTime<chrono::Local> = meta.modified()?.into();
        println!("  {}", path.file_name().unwrap_or_default().to_string_lossy());
        println!("    Size: {} bytes", meta.len());
        println!("    Modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
        println!();
    }
    Ok(())
}

fn run_viewer(
    engine: &mut ViewerEngine,
    mut follower: Option<&mut LogFollower>,
) -> anyhow::Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(
        io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;

    let result = viewer_loop(&mut terminal, engine, follower.as_deref_mut());

    crossterm::execute!(
        io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    crossterm::terminal::disable_raw_mode()?;

    result
}

fn viewer_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &mut ViewerEngine,
    mut follower: Option<&mut LogFollower>,
) -> anyhow::Result<()> {
    let mut last_refresh: Option<Instant> = None;
    let mut frame_count: u64 = 0;
    let mut vm = engine.refresh(Utc::now());

    loop {
        if last_refresh.map_or(true, |t| t.elapsed() >= REFRESH_INTERVAL) {
            if let Some(follower) = follower.as_mut() {
                match follower.poll() {
                    Ok(batch) => engine.sink().push_batch(batch),
                    Err(err) => warn!(%err, "log follow tick skipped"),
                }
            }
            vm = engine.refresh(Utc::now());
            last_refresh = Some(Instant::now());
        }

        frame_count += 1;
        terminal.draw(|f| ui::render(f, &vm, frame_count))?;

        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let now = Utc::now();
                    let outcome = match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Left | KeyCode::Char('h') => engine.pan_left(),
                        KeyCode::Right | KeyCode::Char('l') => engine.pan_right(),
                        KeyCode::Char('+') | KeyCode::Char('k') => engine.zoom_in(),
                        KeyCode::Char('-') | KeyCode::Char('j') => engine.zoom_out(),
                        KeyCode::Home => engine.jump_start(),
                        KeyCode::End => engine.jump_end(),
                        KeyCode::Char('r') => {
                            engine.reset_view(now);
                            Ok(())
                        }
                        KeyCode::Char(' ') => engine.toggle_pause(now),
                        _ => Ok(()),
                    };
                    if let Err(err) = outcome {
                        debug!(%err, "navigation rejected");
                    }
                    vm = engine.refresh(now);
                    last_refresh = Some(Instant::now());
                }
            }
        }
    }

    Ok(())
}
