//! encctl-setup: offline key generation and controller encryption
//!
//! Builds the controller matrices (PID gains or a JSON file), generates the
//! secret key and Galois keys, encrypts F, G, H, J and x₀, and writes the
//! session directory used by the controller and plant hosts.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use encctl::control::{ControllerMatrices, PidGains};
use encctl::params::{ScalingParams, SchemeParams};
use encctl::session::SessionBuilder;

#[derive(Parser)]
#[command(name = "encctl-setup")]
#[command(about = "Generate keys and encrypt a controller for an encctl session")]
#[command(version)]
struct Args {
    /// Output directory for the session artifacts
    #[arg(long, default_value = "session")]
    output_dir: PathBuf,

    /// Ring dimension (2048, or 256 for insecure test sessions)
    #[arg(long, default_value = "2048")]
    ring_dim: usize,

    /// Measurement quantization step r
    #[arg(long, default_value = "1e-3")]
    r: f64,

    /// Matrix quantization step s
    #[arg(long, default_value = "0.1")]
    s: f64,

    /// Packing scale L (1/L must be an integer)
    #[arg(long, default_value = "1e-9")]
    l: f64,

    /// JSON file with F, G, H, J and x0; overrides the PID gains
    #[arg(long)]
    matrices: Option<PathBuf>,

    #[arg(long, default_value = "34")]
    kp: f64,
    #[arg(long, default_value = "2")]
    ki: f64,
    #[arg(long, default_value = "42")]
    kd: f64,
    #[arg(long, default_value = "40")]
    lp: f64,
    #[arg(long, default_value = "0")]
    li: f64,
    #[arg(long, default_value = "3")]
    ld: f64,

    /// Random seed for deterministic key generation (optional)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("encctl Setup");
    info!("Output directory: {}", args.output_dir.display());
    info!("Ring dimension: {}", args.ring_dim);

    let scheme = match args.ring_dim {
        2048 => SchemeParams::secure_128_d2048(),
        256 => SchemeParams::insecure_d256(),
        _ => {
            return Err(eyre::eyre!(
                "Invalid ring dimension: {}. Must be 2048 or 256",
                args.ring_dim
            ));
        }
    };
    let scaling = ScalingParams::new(args.r, args.s, args.l)
        .map_err(|e| eyre::eyre!("Invalid scaling parameters: {}", e))?;

    let matrices = match &args.matrices {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read matrices from {}", path.display()))?;
            let matrices: ControllerMatrices = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse matrices in {}", path.display()))?;
            matrices
                .validate()
                .map_err(|e| eyre::eyre!("Invalid controller matrices: {}", e))?;
            matrices
        }
        None => ControllerMatrices::pid(&PidGains {
            kp: args.kp,
            ki: args.ki,
            kd: args.kd,
            lp: args.lp,
            li: args.li,
            ld: args.ld,
        }),
    };
    let dims = matrices.dimensions();
    info!("Dimensions: n={}, m={}, p={}, tau={}", dims.n, dims.m, dims.p, dims.tau());

    let total_start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Generating keys and encrypting controller...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut builder = SessionBuilder::new(scheme.clone(), scaling, matrices);
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }
    let session = builder
        .build()
        .with_context(|| "Failed to build session")?;
    pb.finish_with_message("Encryption complete");

    info!("Saving session...");
    session
        .save(&args.output_dir)
        .with_context(|| format!("Failed to save session to {}", args.output_dir.display()))?;

    let fingerprint: String = session
        .manifest
        .key_fingerprint
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    info!("Total setup time: {:.2?}", total_start.elapsed());

    println!();
    println!("=== Setup Complete ===");
    println!("Output directory: {}", args.output_dir.display());
    println!("Ring dimension: {}", scheme.ring_dim);
    println!("Scaling: r={} s={} L={}", scaling.r, scaling.s, scaling.l);
    println!("Dimensions: n={} m={} p={} tau={}", dims.n, dims.m, dims.p, dims.tau());
    println!("Key fingerprint: {}", fingerprint);
    println!();
    println!("Keep secret_key.bin on the plant host only.");

    Ok(())
}
