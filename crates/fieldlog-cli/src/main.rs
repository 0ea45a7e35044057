//! fieldlog command line: record demo measurement sessions onto a medium
//! directory and browse what a medium holds.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fieldlog_core::{
    format_row, Clock, DataLogger, DirMedium, Experiment, LoggerConfig, SampleRow, StatusFlag,
    StatusSink, SystemClock, TracingStatusSink,
};

#[derive(Parser)]
#[command(
    name = "fieldlog",
    about = "Field data logger: record and browse CSV measurement sessions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a demo measurement session onto a medium directory
    Record {
        /// Directory standing in for the medium mount point
        #[arg(long, default_value = "./fieldlog-data")]
        dir: PathBuf,
        /// Number of rows to record
        #[arg(long, short = 'n', default_value_t = 100)]
        samples: u64,
        /// Sampling rate in Hz
        #[arg(long, default_value_t = 10.0)]
        rate_hz: f64,
        /// Optional YAML file with logger settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the sessions stored on a medium directory
    List {
        /// Directory standing in for the medium mount point
        #[arg(default_value = "./fieldlog-data")]
        dir: PathBuf,
    },
    /// Summarize one session file
    Inspect {
        /// Path to the session CSV
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            dir,
            samples,
            rate_hz,
            config,
        } => {
            cmd_record(dir, samples, rate_hz, config)?;
        }
        Commands::List { dir } => {
            cmd_list(dir)?;
        }
        Commands::Inspect { file, json } => {
            cmd_inspect(file, json)?;
        }
    }

    Ok(())
}

// ─── Record ─────────────────────────────────────────────────────────────────

fn cmd_record(dir: PathBuf, samples: u64, rate_hz: f64, config_path: Option<PathBuf>) -> Result<()> {
    if rate_hz <= 0.0 {
        anyhow::bail!("--rate-hz must be positive");
    }
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => LoggerConfig::default(),
    };

    let clock = SystemClock;
    let sink = TracingStatusSink::default();
    let logger = DataLogger::builder()
        .medium(DirMedium::new(&dir))
        .clock(clock)
        .status(sink.clone())
        .config(config)
        .start()?;

    // Sessions are stamped with trusted time only.
    if !clock.is_available() {
        sink.raise(StatusFlag::NoClock);
        while !clock.is_available() {
            info!("Waiting for the time source");
            thread::sleep(Duration::from_secs(1));
        }
        sink.lower(StatusFlag::NoClock);
    }

    println!(
        "Recording {} samples at {} Hz into {}",
        samples,
        rate_hz,
        dir.display()
    );
    let mut experiment = logger.begin_experiment()?;
    declare_columns(&mut experiment)?;

    let started_at = experiment.started_at();
    let period = Duration::from_secs_f64(1.0 / rate_hz);
    let bar = ProgressBar::new(samples);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} rows {msg}",
    )?);

    for i in 0..samples {
        let tick_started = Instant::now();

        let offset_ms = match clock.millis_since(started_at) {
            Ok(ms) => ms,
            Err(e) => {
                warn!("Skipping sample {}: {}", i, e);
                continue;
            }
        };
        let mut row = experiment.new_row(offset_ms);
        collect_demo_signals(&mut row, i)?;
        if i % 10 == 0 {
            bar.set_message(format_row(&row));
        }
        if let Err(e) = experiment.push_row(row) {
            warn!("Failed to push row {}: {}", i, e);
        }
        bar.inc(1);

        let elapsed = tick_started.elapsed();
        match period.checked_sub(elapsed) {
            Some(remaining) => thread::sleep(remaining),
            None => warn!("Sampling is lagging behind the configured rate"),
        }
    }
    bar.finish_and_clear();

    let path = experiment.writer().path().to_path_buf();
    experiment.finish()?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Demo measurement axes, one per simulated channel.
fn declare_columns(experiment: &mut Experiment) -> Result<()> {
    experiment.add_column("Windspeed X", "m/s")?;
    experiment.add_column("Windspeed Y", "m/s")?;
    experiment.add_column("Temperature", "C")?;
    Ok(())
}

/// Deterministic stand-ins for the wind and temperature sensors.
fn collect_demo_signals(row: &mut SampleRow, sample_index: u64) -> Result<()> {
    let t = sample_index as f64 * 0.1;
    row.push_value(4.2 * (t * 0.8).sin())?;
    row.push_value(3.1 * (t * 0.8).cos())?;
    row.push_value(21.5 + 0.25 * (t * 0.05).sin())?;
    Ok(())
}

// ─── List ───────────────────────────────────────────────────────────────────

fn cmd_list(dir: PathBuf) -> Result<()> {
    let mut sessions = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                let name = entry.file_name().to_string_lossy().into_owned();
                let meta = entry.metadata()?;
                let modified: DateTime<Local> = meta.modified()?.into();
                sessions.push((name, meta.len(), modified));
            }
        }
    }

    if sessions.is_empty() {
        println!("No sessions found in '{}'", dir.display());
        return Ok(());
    }
    sessions.sort_by(|a, b| b.0.cmp(&a.0));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Session", "Size", "Modified"]);
    for (name, size, modified) in &sessions {
        table.add_row([
            name.clone(),
            format_size(*size),
            modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("Sessions in: {}", dir.display());
    println!("{}", table);
    Ok(())
}

// ─── Inspect ────────────────────────────────────────────────────────────────

fn cmd_inspect(file: PathBuf, json: bool) -> Result<()> {
    if !file.is_file() {
        anyhow::bail!("Session file not found: {}", file.display());
    }
    let content = fs::read_to_string(&file)?;

    let mut lines = content.lines();
    let header = lines.next().unwrap_or("");
    let columns: Vec<&str> = if header.is_empty() {
        Vec::new()
    } else {
        header.split(',').collect()
    };
    let rows: Vec<&str> = lines.collect();
    let first_offset = rows.first().and_then(|l| parse_offset(l));
    let last_offset = rows.last().and_then(|l| parse_offset(l));

    if json {
        let summary = serde_json::json!({
            "file": file.display().to_string(),
            "columns": columns,
            "rows": rows.len(),
            "first_offset_ms": first_offset,
            "last_offset_ms": last_offset,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Session: {}", file.display());
    println!("Rows: {}", rows.len());
    if let (Some(first), Some(last)) = (first_offset, last_offset) {
        println!("Covers: {} ms to {} ms", first, last);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["#", "Column"]);
    for (i, column) in columns.iter().enumerate() {
        table.add_row([i.to_string(), column.to_string()]);
    }
    println!("{}", table);
    Ok(())
}

fn parse_offset(line: &str) -> Option<u64> {
    line.split(',').next()?.parse().ok()
}

// ─── Utilities ──────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<LoggerConfig> {
    if !path.exists() {
        return Ok(LoggerConfig::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
