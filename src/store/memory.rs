//! In-memory telemetry store (no persistence)
//!
//! Useful for tests and storage-less runs. All data is lost on restart.
//!
//! Points are keyed by `(target_id, epoch millis)` in a per-target
//! `BTreeMap`, which gives the same idempotent-upsert and
//! ascending-timestamp guarantees as the SQLite store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, TelemetryStore};
use super::error::StorageResult;
use super::schema::TelemetryPoint;

/// In-memory telemetry store
pub struct MemoryStore {
    /// Points grouped by target_id, keyed by epoch millis within a target.
    points: RwLock<HashMap<String, BTreeMap<i64, TelemetryPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn write_point(&self, point: TelemetryPoint) -> StorageResult<()> {
        let mut points = self.points.write().await;
        points
            .entry(point.target_id.clone())
            .or_default()
            .insert(point.timestamp.timestamp_millis(), point);
        Ok(())
    }

    async fn query_range(
        &self,
        target_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<TelemetryPoint>> {
        debug!("querying in-memory store for {}", target_id);

        let start_millis = start.timestamp_millis();
        let end_millis = end.timestamp_millis();

        // A degenerate window holds nothing; BTreeMap::range would panic
        // on a reversed range.
        if start_millis >= end_millis {
            return Ok(Vec::new());
        }

        let points = self.points.read().await;
        let results = points
            .get(target_id)
            .map(|by_time| {
                by_time
                    .range(start_millis..end_millis)
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let points = self.points.read().await;
        let total: usize = points.values().map(BTreeMap::len).sum();

        Ok(HealthStatus {
            healthy: true,
            message: "In-memory store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_points".to_string(), total.to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let points = self.points.read().await;
        let total: usize = points.values().map(BTreeMap::len).sum();

        Ok(format!(
            "In-Memory: {} points across {} targets",
            total,
            points.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory store (no-op)");
        Ok(())
    }
}
