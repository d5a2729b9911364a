//! Telemetry store trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::TelemetryPoint;

/// Health status of the telemetry store
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for telemetry store backends
///
/// Implementations must be `Send + Sync` as they are shared between the
/// writer pool and the analytics engine.
///
/// ## Write semantics
///
/// `write_point` must be idempotent on `(target_id, timestamp)`: writing
/// the same identity twice leaves exactly one point (last-write-wins).
/// The at-least-once result channel relies on this to keep aggregates
/// correct under redelivery.
///
/// ## Read semantics
///
/// `query_range` returns points for one target within the half-open
/// window `[start, end)`, ascending by timestamp, with no count limit.
/// Reads never block writes and vice versa.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist one point, overwriting any point with the same identity.
    async fn write_point(&self, point: TelemetryPoint) -> StorageResult<()>;

    /// Fetch all points for a target within `[start, end)`, oldest first.
    async fn query_range(
        &self,
        target_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<TelemetryPoint>>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend is
    /// operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    ///
    /// Returns human-readable stats about the backend
    /// (e.g., "SQLite: 1.2M points, 450MB on disk").
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
