//! hwdash daemon
//!
//! Polls hardware sensors, debounces the formatted values for display, keeps
//! rolling chart windows and serves everything as read-only JSON.

mod aggregator;
mod chart;
mod config;
mod debounce;
mod failure_log;
mod snapshots;
mod state;
mod web;
mod window;

use anyhow::{Context, Result};
use clap::Parser;
use hwdash_hw::{Backend, FixtureBackend, StaticInventory, SysfsBackend, SysfsInventory};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aggregator::{Aggregator, LiveValues};
use chart::{ChartPoller, ChartSeries};
use config::{BackendKind, Config};
use failure_log::FailureLog;
use snapshots::{
    CpuSnapshot, DeviceSnapshot, GpuSnapshot, MemorySnapshot, MotherboardSnapshot, Sources,
    StorageSnapshot,
};
use state::{AppState, StaticInfo};

#[derive(Parser)]
#[command(name = "hwdashd")]
#[command(about = "Hardware sensor dashboard daemon")]
#[command(version)]
struct Args {
    /// Configuration file; defaults apply when it does not exist
    #[arg(default_value = "config/default.toml")]
    config: PathBuf,

    /// Override the configured backend (sysfs or fixture)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let mut config = match Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))
    {
        Ok(config) => config,
        Err(e) => {
            FailureLog::new(Config::default().failure_log).record_or_log(&format!("{e:#}"));
            return Err(e);
        }
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    info!("Loaded configuration from: {:?}", args.config);

    let failure_log = FailureLog::new(&config.failure_log);
    failure_log.install_panic_hook();

    if let Err(e) = run(config, &failure_log).await {
        failure_log.record_or_log(&format!("{e:#}"));
        return Err(e);
    }
    Ok(())
}

fn sources(kind: BackendKind) -> Sources {
    match kind {
        BackendKind::Sysfs => Sources::new(
            || Box::new(SysfsBackend::new()) as Box<dyn Backend>,
            Arc::new(SysfsInventory::new()),
        ),
        BackendKind::Fixture => {
            let backend = FixtureBackend::demo();
            Sources::new(
                move || Box::new(backend.clone()) as Box<dyn Backend>,
                Arc::new(StaticInventory::demo()),
            )
        }
    }
}

async fn run(config: Config, failure_log: &FailureLog) -> Result<()> {
    let sources = sources(config.backend);
    info!(backend = ?config.backend, "Opening sensor providers");

    let cpu = CpuSnapshot::open(&sources).context("Failed to open CPU sensors")?;
    let gpu = GpuSnapshot::open(&sources).context("Failed to open GPU sensors")?;
    let board = MotherboardSnapshot::open(&sources).context("Failed to open motherboard sensors")?;
    let storage = StorageSnapshot::open(&sources).context("Failed to open storage sensors")?;
    let info = StaticInfo::collect(&cpu, &gpu, &board, &storage);
    let memory = MemorySnapshot::load(sources.inventory());
    info!(
        cpu = %info.cpu.name,
        gpu = %info.gpu,
        board = %info.board.name,
        disks = info.storage.len(),
        memory = %memory.total,
        "Hardware resolved"
    );

    let root = CancellationToken::new();
    let mut tasks: Vec<(String, JoinHandle<()>)> = Vec::new();

    let (inputs, live) = LiveValues::channels(Duration::from_millis(config.debounce_ms), &root);
    let snapshots: Vec<Box<dyn DeviceSnapshot>> =
        vec![Box::new(cpu), Box::new(gpu), Box::new(board), Box::new(storage)];
    let aggregator = Arc::new(Aggregator::new(snapshots, inputs));
    {
        let aggregator = aggregator.clone();
        let period = Duration::from_millis(config.dashboard_interval_ms);
        let cancel = root.child_token();
        tasks.push((
            "aggregator".to_string(),
            tokio::spawn(aggregator.run(period, cancel)),
        ));
    }

    let mut charts = Vec::new();
    for chart in &config.charts {
        let series: ChartSeries = chart.series.parse()?;
        let snapshot = series
            .open_snapshot(&sources)
            .with_context(|| format!("Failed to open sensors for chart '{series}'"))?;
        let (poller, rx) = ChartPoller::new(series, snapshot, config.capacity_for(chart));
        charts.push(rx);
        tasks.push((
            format!("chart {series}"),
            tokio::spawn(poller.run(Duration::from_millis(chart.interval_ms), root.child_token())),
        ));
    }

    let state = Arc::new(AppState::new(info, memory, live, aggregator, charts));

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    if config.web.enable {
        let app = web::create_router(state.clone());
        let addr: SocketAddr = config
            .web
            .listen
            .parse()
            .context("Invalid listen address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("Web server listening on http://{}", addr);

        tokio::select! {
            result = axum::serve(listener, app) => {
                result.context("Web server failed")?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    } else {
        info!("Web server disabled");
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    }

    root.cancel();
    for (name, task) in tasks {
        match task.await {
            Ok(()) => {}
            // Already recorded by the panic hook.
            Err(e) if e.is_panic() => error!("{} task panicked", name),
            Err(e) => {
                warn!("{} task ended abnormally: {}", name, e);
                failure_log.record_or_log(&format!("{name} task failed: {e}"));
            }
        }
    }
    info!("Shutdown complete");

    Ok(())
}
