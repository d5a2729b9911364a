//! End-to-end tests: dispatch → probe → persist → query
//!
//! Each test drives the dispatcher explicitly, drains the pipeline to
//! rest, and then checks what analytics reports about the stored points.

use std::time::Duration;

use chrono::Utc;
use pulsewatch::analytics::AnalyticsEngine;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::spawn_test_pipeline;

#[tokio::test]
async fn test_healthy_target_reports_full_uptime() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .mount(&mock_server)
        .await;

    let pipeline = spawn_test_pipeline(Duration::from_secs(5));
    pipeline
        .directory
        .add_target("web-1", &mock_server.uri(), 60)
        .await;

    let published = pipeline.dispatcher.tick_now().await.unwrap();
    assert_eq!(published, 1);

    let (store, stats) = pipeline.drain().await;
    assert_eq!(stats.points_written, 1);
    assert_eq!(stats.dead_lettered, 0);

    let analytics = AnalyticsEngine::new(store);
    let start = Utc::now() - chrono::Duration::minutes(5);
    let end = Utc::now() + chrono::Duration::minutes(5);

    let report = analytics.uptime("web-1", start, end).await.unwrap();
    assert_eq!(report.uptime_percentage, 100.0);

    let history = analytics.latency_history("web-1", start, end).await.unwrap();
    assert_eq!(history.points.len(), 1);
    // The mock delays 50ms, so recorded latency reflects at least that.
    assert!(history.points[0].latency_ms >= 50);
}

#[tokio::test]
async fn test_timed_out_target_reports_zero_uptime() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let pipeline = spawn_test_pipeline(Duration::from_millis(100));
    pipeline
        .directory
        .add_target("slow-1", &mock_server.uri(), 60)
        .await;

    assert_eq!(pipeline.dispatcher.tick_now().await.unwrap(), 1);

    let (store, stats) = pipeline.drain().await;
    assert_eq!(stats.points_written, 1, "a timeout still produces a point");

    let analytics = AnalyticsEngine::new(store);
    let report = analytics
        .uptime(
            "slow-1",
            Utc::now() - chrono::Duration::minutes(5),
            Utc::now() + chrono::Duration::minutes(5),
        )
        .await
        .unwrap();
    assert_eq!(report.uptime_percentage, 0.0);
}

#[tokio::test]
async fn test_mixed_fleet_is_tracked_per_target() {
    let up_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&up_server)
        .await;

    let down_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&down_server)
        .await;

    let pipeline = spawn_test_pipeline(Duration::from_secs(5));
    pipeline.directory.add_target("up", &up_server.uri(), 60).await;
    pipeline
        .directory
        .add_target("down", &down_server.uri(), 60)
        .await;

    assert_eq!(pipeline.dispatcher.tick_now().await.unwrap(), 2);

    let (store, stats) = pipeline.drain().await;
    assert_eq!(stats.points_written, 2);

    let analytics = AnalyticsEngine::new(store);
    let start = Utc::now() - chrono::Duration::minutes(5);
    let end = Utc::now() + chrono::Duration::minutes(5);

    let up = analytics.uptime("up", start, end).await.unwrap();
    let down = analytics.uptime("down", start, end).await.unwrap();

    assert_eq!(up.uptime_percentage, 100.0);
    assert_eq!(down.uptime_percentage, 0.0);
}

#[tokio::test]
async fn test_unknown_target_reports_zero_not_error() {
    let pipeline = spawn_test_pipeline(Duration::from_secs(5));
    let (store, _) = pipeline.drain().await;

    let analytics = AnalyticsEngine::new(store);
    let report = analytics
        .uptime(
            "never-seen",
            Utc::now() - chrono::Duration::minutes(5),
            Utc::now(),
        )
        .await
        .unwrap();

    assert_eq!(report.uptime_percentage, 0.0);
}

#[tokio::test]
async fn test_target_is_not_redispatched_within_its_interval() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let pipeline = spawn_test_pipeline(Duration::from_secs(5));
    pipeline
        .directory
        .add_target("web-1", &mock_server.uri(), 3600)
        .await;

    assert_eq!(pipeline.dispatcher.tick_now().await.unwrap(), 1);
    // Second tick inside the interval finds nothing due.
    assert_eq!(pipeline.dispatcher.tick_now().await.unwrap(), 0);

    let (store, stats) = pipeline.drain().await;
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
    assert_eq!(history.points.len(), 1);
}
