//! Telemetry point schema
//!
//! One row per probe outcome. The layout follows the classic time-series
//! shape: one tag (`target_id`) and three numeric fields. Booleans are
//! stored as 0/1 and an absent status code as 0 so that every field is
//! queryable as an integer.
//!
//! `(target_id, timestamp)` is the point identity. Writes with the same
//! identity overwrite each other (last-write-wins), which is what makes
//! redelivered results harmless to aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CheckResult;

/// A single telemetry point as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Tag: which target this point belongs to.
    pub target_id: String,

    /// When the probe completed (millisecond precision).
    pub timestamp: DateTime<Utc>,

    /// Field: 1 if the target was up, 0 otherwise.
    pub is_up: i64,

    /// Field: milliseconds to response or failure.
    pub latency_ms: i64,

    /// Field: HTTP status code, 0 when no response arrived.
    pub status_code: i64,
}

impl TelemetryPoint {
    /// Flatten a probe result into its stored form.
    pub fn from_result(result: &CheckResult) -> Self {
        Self {
            target_id: result.target_id.clone(),
            timestamp: result.timestamp,
            is_up: i64::from(result.is_up()),
            latency_ms: result.latency_ms,
            status_code: result.outcome.status_code_or_zero(),
        }
    }
}
