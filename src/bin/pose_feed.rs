//! Test pose source for the driver.
//!
//! Listens on the driver's endpoint and streams random orientations to every
//! client that connects, one record per interval.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default endpoint, one record every 500 ms
//! pose-feed
//!
//! # Faster feed, stop after 100 records per client
//! pose-feed --bind 127.0.0.1:4120 --interval-ms 20 --count 100
//! ```
//!
//! Each record is `"<header>\n<x>,<y>,<z>"`; the driver ignores the header
//! line and reads the rotation from the second.

use clap::Parser;
use rand::Rng;
use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:4120")]
    bind: String,

    /// Milliseconds between records
    #[arg(short, long, default_value_t = 500)]
    interval_ms: u64,

    /// Records per client before disconnecting (unlimited if omitted)
    #[arg(short, long)]
    count: Option<u64>,

    /// Largest absolute value of each axis
    #[arg(long, default_value_t = 180.0)]
    range: f32,

    /// First line of every record
    #[arg(long, default_value = "0,0,0")]
    header: String,
}

fn main() {
    ghalib_driver::logging::init("info");
    let args = Args::parse();

    if let Err(e) = run(&args) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> std::io::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(std::io::Error::other)?;

    let listener = TcpListener::bind(&args.bind)?;
    listener.set_nonblocking(true)?;
    info!("Pose feed listening on {}", listener.local_addr()?);

    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                serve(stream, peer, args, &running);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => warn!("Accept failed: {}", e),
        }
    }

    info!("Pose feed stopped");
    Ok(())
}

/// Stream records to one client until it disconnects, the count is reached
/// or Ctrl-C is pressed
fn serve(mut stream: TcpStream, peer: SocketAddr, args: &Args, running: &AtomicBool) {
    info!("Client connected: {}", peer);

    let mut rng = rand::rng();
    let range = args.range.abs().max(f32::EPSILON);
    let interval = Duration::from_millis(args.interval_ms);
    let mut sent = 0u64;

    while running.load(Ordering::SeqCst) && args.count.is_none_or(|limit| sent < limit) {
        let [x, y, z] = [(); 3].map(|_| round2(rng.random_range(-range..range)));
        let record = format!("{}\n{:.2},{:.2},{:.2}", args.header, x, y, z);

        if let Err(e) = stream.write_all(record.as_bytes()) {
            warn!("Client {} disconnected: {}", peer, e);
            return;
        }
        sent += 1;
        tracing::debug!("Sent: {:.2}, {:.2}, {:.2}", x, y, z);

        thread::sleep(interval);
    }

    info!("Sent {} records to {}", sent, peer);
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
