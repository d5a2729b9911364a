//! Failure-path tests: crashes between receive and ack, flaky upstreams
//!
//! The delivery contract is at-least-once: work lost mid-flight must come
//! back, and the duplicates that creates must not distort what analytics
//! reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pulsewatch::actors::dispatcher::DispatcherHandle;
use pulsewatch::actors::probe::ProbeWorkerPool;
use pulsewatch::actors::writer::TelemetryWriterPool;
use pulsewatch::analytics::AnalyticsEngine;
use pulsewatch::channel::Channel;
use pulsewatch::config::WriterConfig;
use pulsewatch::directory::{DirectoryError, TargetDirectory};
use pulsewatch::store::TelemetryStore;
use pulsewatch::store::memory::MemoryStore;
use pulsewatch::store::schema::TelemetryPoint;
use pulsewatch::{CheckJob, CheckOutcome, CheckResult, DueTarget};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A worker that takes a job and dies before acking: the job must come
/// back and eventually be probed.
#[tokio::test]
async fn test_job_lost_by_crashed_worker_is_reprobed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let jobs: Channel<CheckJob> = Channel::with_options(16, Duration::from_millis(100));
    let results: Channel<CheckResult> = Channel::new();

    jobs.publish(CheckJob {
        target_id: "web-1".to_string(),
        url: mock_server.uri(),
    })
    .await
    .unwrap();

    // Simulated crash: receive the job and drop the delivery unacked.
    {
        let delivery = jobs.receive().await.unwrap();
        assert_eq!(delivery.message().target_id, "web-1");
    }

    // After the visibility timeout the job is redelivered to a real worker.
    tokio::time::sleep(Duration::from_millis(150)).await;
    jobs.close().await;

    let pool = ProbeWorkerPool::spawn(1, Duration::from_secs(5), jobs, results.clone());
    pool.join().await;

    let delivery = results.receive().await.unwrap();
    assert_eq!(delivery.message().target_id, "web-1");
    assert!(delivery.message().is_up());
    delivery.ack().await;
}

/// A writer that persists a result and dies before acking: the redelivered
/// result is written again, and the upsert keeps it a single point.
#[tokio::test]
async fn test_result_written_twice_counts_once() {
    let store = Arc::new(MemoryStore::new());
    let results: Channel<CheckResult> = Channel::with_options(16, Duration::from_millis(100));

    let result = CheckResult {
        target_id: "web-1".to_string(),
        timestamp: Utc::now(),
        outcome: CheckOutcome::Responded { status_code: 200 },
        latency_ms: 80,
    };
    results.publish(result.clone()).await.unwrap();

    // Simulated crash after the write, before the ack.
    {
        let delivery = results.receive().await.unwrap();
        store
            .write_point(TelemetryPoint::from_result(delivery.message()))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    results.close().await;

    let writer_config = WriterConfig {
        pool_size: 1,
        write_attempts: 3,
        retry_backoff_ms: 10,
    };
    let writers = TelemetryWriterPool::spawn(&writer_config, store.clone(), results);
    let stats = writers.join().await;
    assert_eq!(stats.points_written, 1);

    let analytics = AnalyticsEngine::new(store);
    let history = analytics
        .latency_history(
            "web-1",
            Utc::now() - chrono::Duration::minutes(5),
            Utc::now() + chrono::Duration::minutes(5),
        )
        .await
        .unwrap();
    assert_eq!(history.points.len(), 1, "duplicate write must collapse");

    let report = analytics
        .uptime(
            "web-1",
            Utc::now() - chrono::Duration::minutes(5),
            Utc::now() + chrono::Duration::minutes(5),
        )
        .await
        .unwrap();
    assert_eq!(report.uptime_percentage, 100.0);
}

/// Directory that fails its first call and recovers afterwards.
struct FlakyDirectory {
    failed_once: AtomicBool,
    target: DueTarget,
}

#[async_trait]
impl TargetDirectory for FlakyDirectory {
    async fn due_targets(&self) -> Result<Vec<DueTarget>, DirectoryError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(DirectoryError("temporary outage".to_string()));
        }
        Ok(vec![self.target.clone()])
    }
}

#[tokio::test]
async fn test_dispatcher_recovers_after_directory_outage() {
    let directory = Arc::new(FlakyDirectory {
        failed_once: AtomicBool::new(false),
        target: DueTarget {
            id: "web-1".to_string(),
            url: "http://example.com".to_string(),
            check_interval_seconds: 60,
        },
    });

    let jobs: Channel<CheckJob> = Channel::new();
    let handle = DispatcherHandle::spawn(directory, jobs.clone(), Duration::from_secs(3600));

    // First tick hits the outage and publishes nothing.
    assert!(handle.tick_now().await.is_err());
    assert_eq!(jobs.stats().await.ready, 0);

    // The next tick succeeds without any restart.
    assert_eq!(handle.tick_now().await.unwrap(), 1);
    assert_eq!(jobs.stats().await.ready, 1);

    handle.shutdown().await;
}
