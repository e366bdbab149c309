//! geotrack — last-known position tracking for mobile objects.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;

use geotrack_core::{MemoryStore, StoreMetrics, TelemetryStore};
use geotrack_server::expire::spawn_sweeper;

#[derive(Parser)]
#[command(name = "geotrack")]
#[command(about = "geotrack — last-known position tracking for mobile objects")]
#[command(version = geotrack_core::VERSION)]
struct Cli {
    /// HTTP listen address
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: String,

    /// Backend datastore
    #[arg(long, value_enum, default_value = "memory")]
    datastore: Datastore,

    /// Seconds between expiration sweeps (independent of the staleness window)
    #[arg(long, default_value_t = 60)]
    sweep_interval: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Datastore {
    /// Volatile in-memory store
    Memory,
    /// Reserved for a networked backend; not implemented
    Redis,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let registry = Registry::new();
    let store: Arc<dyn TelemetryStore> = match cli.datastore {
        Datastore::Memory => Arc::new(MemoryStore::new(StoreMetrics::new(&registry))),
        Datastore::Redis => {
            log::error!("datastore not implemented: redis");
            std::process::exit(1);
        }
    };
    log::info!("datastore created: {:?}", cli.datastore);

    print_banner(&cli.addr);

    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(run(cli, store, registry));
}

fn print_banner(addr: &str) {
    println!("geotrack v{}", geotrack_core::VERSION);
    println!("   http://{addr}");
    println!();
    println!("   Endpoints:");
    println!("     POST /api/v1/location        Report an object position");
    println!("     GET  /api/v1/location        All known objects");
    println!("     GET  /api/v1/location/{{id}}   One object by id");
    println!("     GET  /health/liveness        Liveness probe");
    println!("     GET  /health/readiness       Readiness probe");
    println!("     GET  /metrics                Prometheus metrics");
    println!();
}

async fn run(cli: Cli, store: Arc<dyn TelemetryStore>, registry: Registry) {
    let shutdown = CancellationToken::new();

    let sweeper = spawn_sweeper(
        store.clone(),
        Duration::from_secs(cli.sweep_interval),
        shutdown.child_token(),
    );

    let mut server = {
        let store = store.clone();
        let addr = cli.addr.clone();
        let token = shutdown.child_token();
        tokio::spawn(async move { geotrack_server::run_server(store, registry, &addr, token).await })
    };

    tokio::select! {
        result = &mut server => {
            // The server only exits on its own when something went wrong,
            // for example a failed bind.
            match result {
                Ok(Ok(())) => log::warn!("http server exited"),
                Ok(Err(err)) => log::error!("http server failed: {err}"),
                Err(err) => log::error!("http server task panicked: {err}"),
            }
            shutdown.cancel();
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received a signal to shutdown");
            shutdown.cancel();
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::error!("http server failed: {err}"),
                Err(err) => log::error!("http server task panicked: {err}"),
            }
        }
    }

    if let Err(err) = sweeper.await {
        log::error!("sweeper task panicked: {err}");
    }
    log::info!("shutdown complete");
}
