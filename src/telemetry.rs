//! Per-cycle CSV rows and latency accounting.
//!
//! Purely observational: nothing here feeds back into the control law.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::Result;

pub const CSV_HEADER: &str =
    "iter,t_ms,y0_angle,y1_position,uLocal,uRemote,uOut,uDiff,loopIntervalMs,tcpRttMs,clamped";

/// One plant cycle. Control values are the first output component.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub iter: u64,
    pub t_ms: f64,
    pub y: Vec<f64>,
    pub u_local: Option<f64>,
    pub u_remote: f64,
    pub u_out: f64,
    pub loop_interval_ms: f64,
    pub rtt_ms: f64,
    pub clamped: bool,
}

impl CycleRecord {
    /// |uLocal − uRemote| when a reference controller runs
    pub fn u_diff(&self) -> Option<f64> {
        self.u_local.map(|local| (local - self.u_remote).abs())
    }

    pub fn to_csv_row(&self) -> String {
        let opt = |v: Option<f64>| v.map(|x| format!("{:.6}", x)).unwrap_or_default();
        format!(
            "{},{:.3},{},{},{},{:.6},{:.6},{},{:.3},{:.3},{}",
            self.iter,
            self.t_ms,
            opt(self.y.first().copied()),
            opt(self.y.get(1).copied()),
            opt(self.u_local),
            self.u_remote,
            self.u_out,
            opt(self.u_diff()),
            self.loop_interval_ms,
            self.rtt_ms,
            u8::from(self.clamped)
        )
    }
}

/// CSV sink with the header written on creation
pub struct CsvLog<W: Write> {
    writer: W,
    rows: u64,
}

impl CsvLog<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CsvLog<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", CSV_HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, record: &CycleRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.to_csv_row())?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Count, mean and max of one timed stage
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    count: u64,
    total: Duration,
    max: Duration,
}

impl LatencyStats {
    pub fn record(&mut self, d: Duration) {
        self.count += 1;
        self.total += d;
        self.max = self.max.max(d);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((self.total.as_nanos() / self.count as u128) as u64)
        }
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

/// Controller-side stage timings
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    pub recv: LatencyStats,
    pub unpack_compute: LatencyStats,
    pub send: LatencyStats,
    pub update: LatencyStats,
    pub total: LatencyStats,
}

impl StageTimings {
    pub fn report(&self, cycles: u64) {
        info!(
            cycles,
            recv = ?self.recv.mean(),
            compute_u = ?self.unpack_compute.mean(),
            send = ?self.send.mean(),
            update = ?self.update.mean(),
            total = ?self.total.mean(),
            max_total = ?self.total.max(),
            "controller timings (mean)"
        );
    }
}
