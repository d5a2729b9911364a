use std::sync::Arc;

use clap::Parser;
use pulsewatch::{
    CheckJob, CheckResult,
    actors::{dispatcher::DispatcherHandle, probe::ProbeWorkerPool, writer::TelemetryWriterPool},
    channel::Channel,
    config::{Config, StorageConfig, read_config_file},
    directory::InMemoryDirectory,
    store::{TelemetryStore, memory::MemoryStore, sqlite::SqliteStore},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("pulsewatch", LevelFilter::TRACE),
        ("pulsewatchd", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let store = build_store(&config).await?;

    let directory = Arc::new(InMemoryDirectory::from_configs(
        config.targets.as_deref().unwrap_or(&[]),
    ));
    if directory.is_empty().await {
        error!("no targets configured, nothing to monitor");
    }

    let jobs: Channel<CheckJob> = Channel::with_options(
        config.channels.capacity,
        config.channels.visibility_timeout(),
    );
    let results: Channel<CheckResult> = Channel::with_options(
        config.channels.capacity,
        config.channels.visibility_timeout(),
    );

    let dispatcher = DispatcherHandle::spawn(
        directory,
        jobs.clone(),
        std::time::Duration::from_secs(config.dispatcher.tick_interval_seconds),
    );

    let probes = ProbeWorkerPool::spawn(
        config.probe.workers,
        config.probe.timeout(),
        jobs.clone(),
        results.clone(),
    );

    let writers = TelemetryWriterPool::spawn(&config.writer, Arc::clone(&store), results.clone());

    info!(
        "pipeline running: {} probe workers, {} writers, tick every {}s",
        config.probe.workers, config.writer.pool_size, config.dispatcher.tick_interval_seconds
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining pipeline");

    // Stop producing, then let each stage drain before closing the next.
    dispatcher.shutdown().await;
    jobs.close().await;
    probes.join().await;
    results.close().await;

    let stats = writers.join().await;
    debug!(
        "writer stats: {} written, {} failed attempts, {} dead-lettered",
        stats.points_written, stats.failed_attempts, stats.dead_lettered
    );
    if stats.dead_lettered > 0 {
        error!("{} results could not be persisted", stats.dead_lettered);
    }

    store.close().await?;
    info!("shutdown complete");

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TelemetryStore>> {
    let store: Arc<dyn TelemetryStore> = match config.storage.clone().unwrap_or_default() {
        StorageConfig::Memory => {
            info!("using in-memory telemetry store (no persistence)");
            Arc::new(MemoryStore::new())
        }
        StorageConfig::Sqlite { path } => {
            info!("using SQLite telemetry store at {}", path.display());
            Arc::new(SqliteStore::new(&path).await?)
        }
    };

    Ok(store)
}
