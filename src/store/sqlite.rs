//! SQLite telemetry store implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! The `(target_id, timestamp)` primary key plus an upsert makes writes
//! idempotent, so redelivered results collapse into a single point.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, TelemetryStore};
use super::error::{StorageError, StorageResult};
use super::schema::TelemetryPoint;

/// SQLite telemetry store
///
/// Stores probe outcomes in a local SQLite database file. Ideal for small
/// to medium target fleets on a single node.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Create a new SQLite store
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for optimal performance (WAL mode, etc.)
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("SQLite store ready");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl TelemetryStore for SqliteStore {
    #[instrument(skip(self, point), fields(target_id = %point.target_id))]
    async fn write_point(&self, point: TelemetryPoint) -> StorageResult<()> {
        let timestamp = Self::timestamp_to_millis(&point.timestamp);

        sqlx::query(
            r#"
            INSERT INTO health_checks (target_id, timestamp, is_up, latency_ms, status_code)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (target_id, timestamp) DO UPDATE SET
                is_up = excluded.is_up,
                latency_ms = excluded.latency_ms,
                status_code = excluded.status_code
            "#,
        )
        .bind(&point.target_id)
        .bind(timestamp)
        .bind(point.is_up)
        .bind(point.latency_ms)
        .bind(point.status_code)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(target_id = %target_id))]
    async fn query_range(
        &self,
        target_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<TelemetryPoint>> {
        let start_millis = Self::timestamp_to_millis(&start);
        let end_millis = Self::timestamp_to_millis(&end);

        debug!("querying points for {} from {} to {}", target_id, start, end);

        // Half-open window: start inclusive, end exclusive.
        let rows = sqlx::query(
            r#"
            SELECT target_id, timestamp, is_up, latency_ms, status_code
            FROM health_checks
            WHERE target_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(target_id)
        .bind(start_millis)
        .bind(end_millis)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let points = rows
            .into_iter()
            .map(|row| TelemetryPoint {
                target_id: row.get("target_id"),
                timestamp: Self::millis_to_timestamp(row.get("timestamp")),
                is_up: row.get("is_up"),
                latency_ms: row.get("latency_ms"),
                status_code: row.get("status_code"),
            })
            .collect::<Vec<_>>();

        debug!("query returned {} points", points.len());
        Ok(points)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM health_checks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let total_rows = row.0;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} points, {:.2} MB on disk",
            total_rows, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
