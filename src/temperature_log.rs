//! Append-only temperature logging.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::debug;

/// Port for persisting one record per successful reading.
///
/// Records are append-only: implementations never rewrite existing entries,
/// and the loop calls this from exactly one task so the append cursor has a
/// single writer.
#[async_trait]
pub trait TemperatureLog: Send + Sync {
    async fn append(&mut self, at: DateTime<Local>, temperature: f32) -> Result<()>;
}

/// CSV-file log sink: one `timestamp,temperature` line per reading.
///
/// The file is opened in append mode for each record, so an externally
/// rotated or truncated file is picked up without restarting the daemon.
pub struct CsvTemperatureLog {
    path: PathBuf,
}

impl CsvTemperatureLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TemperatureLog for CsvTemperatureLog {
    async fn append(&mut self, at: DateTime<Local>, temperature: f32) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open log file {}", self.path.display()))?;

        writeln!(
            file,
            "{},{temperature:.2}",
            at.format("%Y-%m-%d %H:%M:%S")
        )
        .with_context(|| format!("failed to append to log file {}", self.path.display()))?;

        debug!(
            "logged {}, {temperature:.2}C",
            at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }
}
