//! encctl-simulate: offline encrypted-vs-plaintext comparison
//!
//! Runs plant and controller in one process on a constant measurement and
//! compares every encrypted output against the plaintext reference.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use encctl::device::parse_measurement;
use encctl::session::SessionArtifacts;
use encctl::telemetry::{CsvLog, CycleRecord, LatencyStats};

#[derive(Parser)]
#[command(name = "encctl-simulate")]
#[command(about = "Compare the encrypted controller with its plaintext reference")]
#[command(version)]
struct Args {
    /// Session directory written by encctl-setup
    #[arg(long, default_value = "session")]
    session_dir: PathBuf,

    /// Number of controller cycles
    #[arg(long, default_value = "1000")]
    iterations: u64,

    /// Constant measurement, comma separated
    #[arg(long, default_value = "1.0,0.0", allow_hyphen_values = true)]
    y: String,

    /// Per-cycle CSV output
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("encctl Simulation");
    info!("Session directory: {}", args.session_dir.display());

    let session = SessionArtifacts::load(&args.session_dir).with_context(|| {
        format!("Failed to load session from {}", args.session_dir.display())
    })?;
    let dims = session.manifest.dims;
    let y = parse_measurement(&args.y, dims.p)
        .ok_or_else(|| eyre::eyre!("Measurement must have {} finite values: {}", dims.p, args.y))?;

    let mut plant = session.plant()?;
    let mut controller = session.controller()?;
    let mut reference = session.reference_controller()?;
    let mut csv = match &args.csv {
        Some(path) => Some(
            CsvLog::create(path)
                .with_context(|| format!("Failed to create CSV {}", path.display()))?,
        ),
        None => None,
    };

    let pb = ProgressBar::new(args.iterations);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cycles ({eta})")?
            .progress_chars("#>-"),
    );

    controller.start()?;
    let started = Instant::now();
    let mut periods = LatencyStats::default();
    let mut max_diff = 0.0f64;

    for iter in 0..args.iterations {
        let cycle_start = Instant::now();
        let y_ct = plant.encrypt_measurement(&y)?;
        let u_ct = controller.step(&y_ct)?;
        let u = plant.decrypt_output(&u_ct)?;
        let period = cycle_start.elapsed();
        periods.record(period);

        let u_local = reference.step(&y)?;
        let diff = u
            .iter()
            .zip(&u_local)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        max_diff = max_diff.max(diff);

        if let Some(csv) = csv.as_mut() {
            csv.write(&CycleRecord {
                iter,
                t_ms: started.elapsed().as_secs_f64() * 1e3,
                y: y.clone(),
                u_local: u_local.first().copied(),
                u_remote: u.first().copied().unwrap_or(0.0),
                u_out: u.first().copied().unwrap_or(0.0),
                loop_interval_ms: period.as_secs_f64() * 1e3,
                rtt_ms: period.as_secs_f64() * 1e3,
                clamped: false,
            })?;
        }
        pb.inc(1);
    }
    controller.finish();
    pb.finish_with_message("done");

    if let Some(csv) = csv.as_mut() {
        csv.flush()?;
    }

    println!();
    println!("=== Simulation Complete ===");
    println!("Iterations: {}", args.iterations);
    println!("Average period: {:.2?}", periods.mean());
    println!("Max period: {:.2?}", periods.max());
    println!("Max |u_encrypted - u_plain|: {:.3e}", max_diff);
    if let Some(path) = &args.csv {
        println!("CSV: {}", path.display());
    }

    Ok(())
}
