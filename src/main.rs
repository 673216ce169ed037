//! Ghalib Driver - standalone runner
//!
//! Runs one controller device against the logging host: registers it,
//! activates it, streams poses from the TCP source until Ctrl-C, then
//! deactivates.
//!
//! ```bash
//! ghalib-driver                      # ghalib.toml if present, else defaults
//! ghalib-driver -c driver.toml       # explicit config file
//! ghalib-driver --port 5000 --role left --log-level debug
//! ```

use clap::{Parser, ValueEnum};
use ghalib_driver::{
    ControllerDevice, ControllerRole, DriverConfig, LoggingHost, Result, logging,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override the pose source host
    #[arg(long)]
    host: Option<String>,

    /// Override the pose source port
    #[arg(short, long)]
    port: Option<u16>,

    /// Controller role
    #[arg(short, long, value_enum, default_value_t = RoleArg::Right)]
    role: RoleArg,

    /// Tracked device index to activate with
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Seconds between status lines
    #[arg(long, default_value_t = 5)]
    status_interval: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Left,
    Right,
}

impl From<RoleArg> for ControllerRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Left => ControllerRole::LeftHand,
            RoleArg::Right => ControllerRole::RightHand,
        }
    }
}

const DEFAULT_CONFIG: &str = "ghalib.toml";

fn load_config(args: &Args) -> Result<DriverConfig> {
    let mut config = match &args.config {
        Some(path) => DriverConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => DriverConfig::load(DEFAULT_CONFIG)?,
        None => DriverConfig::default(),
    };

    if let Some(host) = &args.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(&config.logging.level);

    if let Err(e) = run(&args, config) {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: DriverConfig) -> Result<()> {
    info!("Ghalib Driver v{}", env!("CARGO_PKG_VERSION"));
    info!("Pose source: {}", config.connection.address());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| ghalib_driver::Error::Other(format!("Failed to set Ctrl-C handler: {}", e)))?;

    let host = Arc::new(LoggingHost::new());
    let settings = config.clone();
    let mut device = ControllerDevice::new(args.role.into(), &settings, host.clone(), config);

    device.activate(args.index, host.as_ref(), host.as_ref())?;
    info!("Press Ctrl-C to stop");

    let status_interval = Duration::from_secs(args.status_interval.max(1));
    let mut last_status = Instant::now();

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));

        if last_status.elapsed() >= status_interval {
            let stats = device.publisher_stats();
            info!(
                "Status: {:?}, chunks={} poses={} parse_failures={} receive_failures={}",
                device.publisher_state(),
                stats.chunks_received,
                stats.poses_published,
                stats.parse_failures,
                stats.receive_failures
            );
            last_status = Instant::now();
        }
    }

    info!("Shutting down...");
    device.deactivate()?;
    info!("Host received {} pose updates", host.pose_updates());
    Ok(())
}
