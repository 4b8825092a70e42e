//! bigcell Emulator Binary
//!
//! Starts the TCP emulator.

use std::path::PathBuf;
use std::sync::Arc;

use bigcell::config::{WalSyncStrategy, DEFAULT_LISTEN_ADDR};
use bigcell::network::Server;
use bigcell::{Config, Engine};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bigcell Emulator
#[derive(Parser, Debug)]
#[command(name = "bigcell-emulator")]
#[command(about = "Local wide-column store emulator")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    host_port: String,

    /// Keep a write-ahead log here; without it all data lives in memory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// fsync the WAL every N entries (1 = every write)
    #[arg(long, default_value = "100")]
    sync_every: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bigcell=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bigcell emulator v{}", bigcell::VERSION);
    match &args.data_dir {
        Some(dir) => tracing::info!("Data directory: {}", dir.display()),
        None => tracing::info!("No data directory, running in memory"),
    }

    let sync_strategy = if args.sync_every <= 1 {
        WalSyncStrategy::EveryWrite
    } else {
        WalSyncStrategy::EveryNEntries {
            count: args.sync_every,
        }
    };

    let mut builder = Config::builder()
        .listen_addr(&args.host_port)
        .max_connections(args.max_connections)
        .wal_sync_strategy(sync_strategy);
    if let Some(dir) = &args.data_dir {
        builder = builder.data_dir(dir);
    }
    let config = builder.build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized with {} tables", engine.table_count());

    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
