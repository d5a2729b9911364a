//! Helper functions for integration tests

use std::sync::Arc;
use std::time::Duration;

use pulsewatch::actors::dispatcher::DispatcherHandle;
use pulsewatch::actors::messages::WriterStats;
use pulsewatch::actors::probe::ProbeWorkerPool;
use pulsewatch::actors::writer::TelemetryWriterPool;
use pulsewatch::channel::Channel;
use pulsewatch::config::WriterConfig;
use pulsewatch::directory::InMemoryDirectory;
use pulsewatch::store::memory::MemoryStore;
use pulsewatch::{CheckJob, CheckResult};

/// A full pipeline wired against an in-memory store.
pub struct TestPipeline {
    pub directory: Arc<InMemoryDirectory>,
    pub dispatcher: DispatcherHandle,
    pub jobs: Channel<CheckJob>,
    pub results: Channel<CheckResult>,
    pub probes: ProbeWorkerPool,
    pub writers: TelemetryWriterPool,
    pub store: Arc<MemoryStore>,
}

/// Spawn all pipeline stages with a long natural tick interval; tests
/// drive dispatching explicitly via `dispatcher.tick_now()`.
pub fn spawn_test_pipeline(probe_timeout: Duration) -> TestPipeline {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(InMemoryDirectory::new());

    let jobs: Channel<CheckJob> = Channel::new();
    let results: Channel<CheckResult> = Channel::new();

    let dispatcher = DispatcherHandle::spawn(
        directory.clone(),
        jobs.clone(),
        Duration::from_secs(3600),
    );

    let probes = ProbeWorkerPool::spawn(4, probe_timeout, jobs.clone(), results.clone());

    let writer_config = WriterConfig {
        pool_size: 2,
        write_attempts: 3,
        retry_backoff_ms: 10,
    };
    let writers = TelemetryWriterPool::spawn(&writer_config, store.clone(), results.clone());

    TestPipeline {
        directory,
        dispatcher,
        jobs,
        results,
        probes,
        writers,
        store,
    }
}

impl TestPipeline {
    /// Shut down and drain every stage, in pipeline order, so that all
    /// dispatched work is fully persisted when this returns.
    pub async fn drain(self) -> (Arc<MemoryStore>, WriterStats) {
        self.dispatcher.shutdown().await;
        self.jobs.close().await;
        self.probes.join().await;
        self.results.close().await;
        let stats = self.writers.join().await;
        (self.store, stats)
    }
}
