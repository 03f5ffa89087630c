//! encctl-controller: encrypted controller host
//!
//! Loads the evaluation keys and encrypted matrices from the session
//! directory (never the secret key), accepts one plant connection and
//! serves measurement → output cycles until the plant disconnects or the
//! process is interrupted.

use std::io::{self, BufRead};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use encctl::config::LoopConfig;
use encctl::control::{ControllerSession, EncryptedController};
use encctl::session::{load_controller_keys, load_manifest};
use encctl::shutdown::{install_signal_handlers, StopFlag};
use encctl::wire::{CommandSender, SessionDescriptor};

#[derive(Parser)]
#[command(name = "encctl-controller")]
#[command(about = "Encrypted controller host")]
#[command(version)]
struct Args {
    /// JSON loop configuration (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session directory written by encctl-setup
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Bind address for the data connection (defaults to data_addr)
    #[arg(long)]
    bind: Option<String>,

    /// Bind address for the pause/resume channel
    #[arg(long)]
    control_addr: Option<String>,

    /// Skip the parameter handshake
    #[arg(long)]
    no_handshake: bool,

    /// Cycles between timing reports
    #[arg(long)]
    report_interval: Option<u64>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
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
    if let Some(addr) = args.control_addr {
        config.control_addr = Some(addr);
    }
    if let Some(interval) = args.report_interval {
        config.report_interval = interval;
    }
    if args.no_handshake {
        config.handshake = false;
    }
    config.validate().with_context(|| "Invalid configuration")?;
    let bind = args.bind.unwrap_or_else(|| config.data_addr.clone());

    info!("encctl Controller");
    info!("Session directory: {}", config.session_dir.display());

    let load_start = Instant::now();
    let manifest = load_manifest(&config.session_dir).with_context(|| {
        format!("Failed to load manifest from {}", config.session_dir.display())
    })?;
    let keys = load_controller_keys(&config.session_dir)
        .with_context(|| "Failed to load controller keys")?;
    let fingerprint = keys.galois.fingerprint()?;
    if fingerprint != manifest.key_fingerprint {
        return Err(eyre::eyre!(
            "Galois keys in {} do not match the manifest fingerprint",
            config.session_dir.display()
        ));
    }
    let descriptor =
        SessionDescriptor::new(&manifest.scheme, &manifest.scaling, &manifest.dims, fingerprint);
    let controller = EncryptedController::new(&manifest.scheme, manifest.dims, keys)
        .with_context(|| "Encrypted controller does not match the manifest")?;
    info!(
        "Controller loaded: ring_dim={}, n={}, m={}, p={}, tau={}",
        manifest.scheme.ring_dim,
        manifest.dims.n,
        manifest.dims.m,
        manifest.dims.p,
        manifest.dims.tau()
    );
    info!("Load time: {:.2?}", load_start.elapsed());

    if let Some(addr) = &config.control_addr {
        spawn_control_channel(addr)?;
    }

    let listener =
        TcpListener::bind(&bind).with_context(|| format!("Failed to bind {}", bind))?;
    println!("Listening on: {}", bind);
    let (mut stream, peer) = listener.accept()?;
    stream.set_nodelay(true)?;
    info!("Plant connected from {}", peer);

    // Installed after accept so an idle controller still dies on Ctrl-C.
    install_signal_handlers()?;

    let mut session = ControllerSession::new(controller)
        .with_report_interval(config.report_interval)
        .with_stop(StopFlag::new());
    if config.handshake {
        session = session.with_handshake(descriptor);
    }
    let report = session
        .serve(&mut stream)
        .with_context(|| format!("Session with {} failed", peer))?;

    println!();
    println!("=== Session Complete ===");
    println!("Cycles: {}", report.cycles);
    println!("Mean total per cycle: {:.2?}", report.timings.total.mean());
    println!("Max total per cycle: {:.2?}", report.timings.total.max());

    Ok(())
}

/// Accept the plant's control connection in the background and forward
/// `r` lines typed on stdin as pause/resume toggles.
fn spawn_control_channel(addr: &str) -> Result<()> {
    let listener =
        TcpListener::bind(addr).with_context(|| format!("Failed to bind control channel {}", addr))?;
    info!("Control channel listening on {}", addr);

    thread::spawn(move || {
        let stream = match listener.accept() {
            Ok((stream, peer)) => {
                info!("Control channel connected from {}", peer);
                stream
            }
            Err(e) => {
                warn!(error = %e, "control channel accept failed");
                return;
            }
        };
        let mut sender = CommandSender::new(stream);
        println!("Type 'r' + Enter to pause/resume the plant");
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() != "r" {
                continue;
            }
            match sender.toggle() {
                Ok(command) => info!(?command, "sent control command"),
                Err(e) => {
                    warn!(error = %e, "control channel write failed");
                    break;
                }
            }
        }
    });
    Ok(())
}
