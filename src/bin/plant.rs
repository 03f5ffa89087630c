//! encctl-plant: plant host
//!
//! Holds the secret key. Reads measurements from the cart-pole (serial line,
//! or stdin with `--mock`), exchanges ciphertexts with the controller host,
//! and writes governed commands back to the actuator.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use encctl::config::LoopConfig;
use encctl::control::{Plant, PlantLoop, PlantLoopOptions, ReferenceController, SafetyGovernor};
use encctl::device::{open_serial, LineActuator, LineSensor};
use encctl::math::GaussianSampler;
use encctl::session::{load_manifest, load_reference, load_secret_key};
use encctl::shutdown::{install_signal_handlers, StopFlag};
use encctl::telemetry::CsvLog;
use encctl::wire::{spawn_listener, PauseFlag};

#[derive(Parser)]
#[command(name = "encctl-plant")]
#[command(about = "Plant host for the encrypted control loop")]
#[command(version)]
struct Args {
    /// JSON loop configuration (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session directory written by encctl-setup
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Controller data address
    #[arg(long)]
    data_addr: Option<String>,

    /// Controller pause/resume channel address
    #[arg(long)]
    control_addr: Option<String>,

    /// Serial device of the cart-pole
    #[arg(long)]
    serial: Option<PathBuf>,

    #[arg(long)]
    baud: Option<u32>,

    /// Read measurements from stdin and write commands to stdout
    #[arg(long)]
    mock: bool,

    /// Per-cycle CSV output
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Cycle period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    #[arg(long)]
    max_cycles: Option<u64>,

    /// Skip the parameter handshake
    #[arg(long)]
    no_handshake: bool,

    /// Do not run the plaintext shadow controller
    #[arg(long)]
    no_reference: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr: stdout carries actuator commands in mock mode.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LoopConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoopConfig::default(),
    };
    if let Some(dir) = args.session_dir {
        config.session_dir = dir;
    }
    if let Some(addr) = args.data_addr {
        config.data_addr = addr;
    }
    if let Some(addr) = args.control_addr {
        config.control_addr = Some(addr);
    }
    if let Some(path) = args.serial {
        config.serial_path = path;
    }
    if let Some(baud) = args.baud {
        config.baud = baud;
    }
    if let Some(path) = args.csv {
        config.csv_path = Some(path);
    }
    if let Some(period) = args.period_ms {
        config.period_ms = Some(period);
    }
    if let Some(max) = args.max_cycles {
        config.max_cycles = Some(max);
    }
    if args.no_handshake {
        config.handshake = false;
    }
    if args.no_reference {
        config.reference_controller = false;
    }
    config.validate().with_context(|| "Invalid configuration")?;

    info!("encctl Plant");
    info!("Session directory: {}", config.session_dir.display());

    let load_start = Instant::now();
    let manifest = load_manifest(&config.session_dir).with_context(|| {
        format!("Failed to load manifest from {}", config.session_dir.display())
    })?;
    let sk = load_secret_key(&config.session_dir).with_context(|| "Failed to load secret key")?;
    let plant = Plant::new(
        &manifest.scheme,
        manifest.scaling,
        manifest.dims,
        sk,
        GaussianSampler::new(manifest.scheme.sigma),
    )
    .with_context(|| "Secret key does not match the manifest")?;
    info!("Load time: {:.2?}", load_start.elapsed());

    let options = PlantLoopOptions {
        period: config.period(),
        max_cycles: config.max_cycles,
        descriptor: config.handshake.then(|| manifest.descriptor()),
        report_interval: config.report_interval,
    };
    let governor = SafetyGovernor::new(config.safety, config.release_after);
    let mut plant_loop = PlantLoop::new(plant, governor, options);

    if config.reference_controller {
        let reference = load_reference(&config.session_dir)
            .and_then(ReferenceController::new)
            .with_context(|| "Failed to load reference controller")?;
        plant_loop = plant_loop.with_reference(reference);
    }
    if let Some(path) = &config.csv_path {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV {}", path.display()))?;
        let writer: Box<dyn Write + Send> = Box::new(BufWriter::new(file));
        plant_loop = plant_loop.with_csv(CsvLog::new(writer)?);
        info!("Writing cycle log to {}", path.display());
    }

    let (reader, writer): (Box<dyn BufRead>, Box<dyn Write>) = if args.mock {
        info!("Mock device on stdin/stdout");
        (Box::new(io::stdin().lock()), Box::new(io::stdout()))
    } else {
        let port = open_serial(&config.serial_path, config.baud).with_context(|| {
            format!("Failed to open serial port {}", config.serial_path.display())
        })?;
        info!("Serial port {} at {} baud", config.serial_path.display(), config.baud);
        (Box::new(BufReader::new(port.try_clone()?)), Box::new(port))
    };
    let mut sensor = LineSensor::new(reader, manifest.dims.p);
    let mut actuator = LineActuator::new(writer);

    info!("Connecting to controller at {}", config.data_addr);
    let mut stream = TcpStream::connect(&config.data_addr)
        .with_context(|| format!("Failed to connect to {}", config.data_addr))?;
    stream.set_nodelay(true)?;

    if let Some(addr) = &config.control_addr {
        let control = TcpStream::connect(addr)
            .with_context(|| format!("Failed to connect control channel {}", addr))?;
        let pause = PauseFlag::new();
        let _listener = spawn_listener(control, pause.clone());
        plant_loop = plant_loop.with_pause(pause);
        info!("Control channel connected to {}", addr);
    }

    install_signal_handlers()?;
    let summary = plant_loop
        .with_stop(StopFlag::new())
        .run(&mut stream, &mut sensor, &mut actuator)
        .with_context(|| "Plant loop failed")?;

    eprintln!();
    eprintln!("=== Plant Loop Complete ===");
    eprintln!("Cycles: {}", summary.cycles);
    eprintln!("Clamped cycles: {}", summary.clamped);
    eprintln!("Missed windows: {}", summary.missed_windows);
    eprintln!("Mean RTT: {:.2?}", summary.rtt.mean());
    eprintln!("Max RTT: {:.2?}", summary.rtt.max());
    if let Some(diff) = summary.max_u_diff {
        eprintln!("Max |uLocal - uRemote|: {:.6}", diff);
    }
    eprintln!("Skipped sensor lines: {}", sensor.skipped());

    Ok(())
}
