//! Analytics - Read-only aggregate queries over stored telemetry
//!
//! Computes uptime percentages and latency histories for a target over a
//! half-open time window `[start, end)`. Analytics never writes and holds
//! no state beyond a store handle, so it can run concurrently with the
//! ingest pipeline without coordination.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use crate::store::{StorageResult, TelemetryStore};
use crate::{LatencyHistory, LatencyPoint, UptimeReport};

/// Read-only query engine over a telemetry store
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn TelemetryStore>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Uptime percentage for a target over `[start, end)`
    ///
    /// The percentage is the mean of the stored up/down values scaled to
    /// 0.0..=100.0. A window with no data points yields exactly 0.0 - an
    /// unmonitored window reports as fully down, never as an error.
    #[instrument(skip(self))]
    pub async fn uptime(
        &self,
        target_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<UptimeReport> {
        let points = self.store.query_range(target_id, start, end).await?;

        let uptime_percentage = if points.is_empty() {
            0.0
        } else {
            let up = points.iter().filter(|p| p.is_up == 1).count();
            (up as f64 / points.len() as f64) * 100.0
        };

        trace!(
            "{} points for target {target_id}, uptime {uptime_percentage:.2}%",
            points.len()
        );

        Ok(UptimeReport {
            target_id: target_id.to_string(),
            uptime_percentage,
        })
    }

    /// Latency history for a target over `[start, end)`
    ///
    /// Points come back in ascending timestamp order; a window with no
    /// data yields an empty history.
    #[instrument(skip(self))]
    pub async fn latency_history(
        &self,
        target_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<LatencyHistory> {
        let points = self.store.query_range(target_id, start, end).await?;

        let points = points
            .into_iter()
            .map(|p| LatencyPoint {
                timestamp: p.timestamp,
                latency_ms: p.latency_ms,
            })
            .collect();

        Ok(LatencyHistory {
            target_id: target_id.to_string(),
            points,
        })
    }
}
