//! SQLite persistence tests: points survive a store restart

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pulsewatch::actors::writer::TelemetryWriterPool;
use pulsewatch::analytics::AnalyticsEngine;
use pulsewatch::channel::Channel;
use pulsewatch::config::WriterConfig;
use pulsewatch::store::TelemetryStore;
use pulsewatch::store::sqlite::SqliteStore;
use pulsewatch::{CheckOutcome, CheckResult};

fn result(target_id: &str, status_code: u16, latency_ms: i64) -> CheckResult {
    CheckResult {
        target_id: target_id.to_string(),
        timestamp: Utc::now(),
        outcome: CheckOutcome::Responded { status_code },
        latency_ms,
    }
}

#[tokio::test]
async fn test_points_survive_store_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("telemetry.db");

    {
        let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
        let results: Channel<CheckResult> = Channel::new();

        results.publish(result("web-1", 200, 100)).await.unwrap();
        results.publish(result("web-2", 503, 40)).await.unwrap();
        results.close().await;

        let writer_config = WriterConfig {
            pool_size: 1,
            write_attempts: 3,
            retry_backoff_ms: 10,
        };
        let writers = TelemetryWriterPool::spawn(&writer_config, store.clone(), results);
        let stats = writers.join().await;
        assert_eq!(stats.points_written, 2);

        store.close().await.unwrap();
    }

    // Reopen the same file and query through analytics.
    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());
    let analytics = AnalyticsEngine::new(store);

    let start = Utc::now() - chrono::Duration::minutes(5);
    let end = Utc::now() + chrono::Duration::minutes(5);

    let up = analytics.uptime("web-1", start, end).await.unwrap();
    assert_eq!(up.uptime_percentage, 100.0);

    let down = analytics.uptime("web-2", start, end).await.unwrap();
    assert_eq!(down.uptime_percentage, 0.0);

    let history = analytics.latency_history("web-2", start, end).await.unwrap();
    assert_eq!(history.points.len(), 1);
    assert_eq!(history.points[0].latency_ms, 40);
}

#[tokio::test]
async fn test_sqlite_store_reports_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("telemetry.db")).await.unwrap();

    let status = store.health_check().await.unwrap();
    assert!(status.healthy);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_writes_visible_while_pipeline_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteStore::new(dir.path().join("telemetry.db"))
            .await
            .unwrap(),
    );
    let results: Channel<CheckResult> = Channel::new();

    let writer_config = WriterConfig {
        pool_size: 2,
        write_attempts: 3,
        retry_backoff_ms: 10,
    };
    let writers = TelemetryWriterPool::spawn(&writer_config, store.clone(), results.clone());

    results.publish(result("web-1", 200, 75)).await.unwrap();

    // Reads go through the same pool as the ongoing writes; poll until the
    // writer has landed the point.
    let analytics = AnalyticsEngine::new(store.clone());
    let start = Utc::now() - chrono::Duration::minutes(5);
    let end = Utc::now() + chrono::Duration::minutes(5);

    let mut history = analytics.latency_history("web-1", start, end).await.unwrap();
    for _ in 0..50 {
        if !history.points.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        history = analytics.latency_history("web-1", start, end).await.unwrap();
    }
    assert_eq!(history.points.len(), 1);

    results.close().await;
    writers.join().await;
    store.close().await.unwrap();
}
