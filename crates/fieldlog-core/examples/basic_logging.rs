//! Minimal library usage: record a short demo session into ./fieldlog-data.

use std::thread;
use std::time::Duration;

use fieldlog_core::{Clock, DataLogger, DirMedium, LoggerConfig, SystemClock, TracingStatusSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let clock = SystemClock;
    let logger = DataLogger::builder()
        .medium(DirMedium::new("./fieldlog-data"))
        .clock(clock)
        .status(TracingStatusSink::default())
        .config(LoggerConfig::default().with_sync_every(10))
        .start()?;

    println!("Waiting for the medium...");
    let mut experiment = logger.begin_experiment()?;
    experiment.add_column("Windspeed X", "m/s")?;
    experiment.add_column("Windspeed Y", "m/s")?;

    let started_at = experiment.started_at();
    println!("Session started at {}", started_at);

    for i in 0..50u32 {
        let t = f64::from(i) * 0.1;
        let mut row = experiment.new_row(clock.millis_since(started_at)?);
        row.push_value(4.2 * t.sin())?;
        row.push_value(3.1 * t.cos())?;
        experiment.push_row(row)?;
        thread::sleep(Duration::from_millis(50));
    }

    let path = experiment.writer().path().to_path_buf();
    experiment.finish()?;
    println!("Wrote {}", path.display());
    Ok(())
}
