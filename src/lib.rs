pub mod actors;
pub mod analytics;
pub mod channel;
pub mod config;
pub mod directory;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A target that is due for a health check right now.
///
/// This is the shape returned by [`directory::TargetDirectory::due_targets`].
/// The directory owns the rescheduling side effect: a target returned here
/// will not be returned again before `check_interval_seconds` have elapsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueTarget {
    pub id: String,
    pub url: String,
    pub check_interval_seconds: u32,
}

/// One unit of probe work, published by the dispatcher and consumed by a
/// probe worker.
///
/// Jobs are immutable and may be delivered more than once (at-least-once
/// channel semantics). Probing only observes the target, so duplicate
/// probes are harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckJob {
    pub target_id: String,
    pub url: String,
}

/// How a single probe ended.
///
/// Exactly one of the two cases applies per probe: either the target
/// answered with some HTTP status, or the request never produced a
/// response at the transport level (timeout, DNS, connection refused,
/// TLS, malformed URL). Modeling this as a variant makes the mutual
/// exclusivity structural instead of two optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The target responded with an HTTP status code (2xx or not).
    Responded { status_code: u16 },

    /// The request failed before any HTTP response arrived.
    TransportFailed { reason: String },
}

impl CheckOutcome {
    /// A target counts as up only for a 2xx response.
    pub fn is_up(&self) -> bool {
        match self {
            CheckOutcome::Responded { status_code } => (200..300).contains(status_code),
            CheckOutcome::TransportFailed { .. } => false,
        }
    }

    /// Status code for telemetry fields (0 when no response arrived).
    pub fn status_code_or_zero(&self) -> i64 {
        match self {
            CheckOutcome::Responded { status_code } => i64::from(*status_code),
            CheckOutcome::TransportFailed { .. } => 0,
        }
    }
}

/// The outcome of one probe against one target.
///
/// Produced by a probe worker, consumed by the telemetry writer. Latency
/// is always populated, including on transport failure - time-to-failure
/// is meaningful signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub target_id: String,

    /// When the probe completed (millisecond precision end to end).
    pub timestamp: DateTime<Utc>,

    pub outcome: CheckOutcome,

    /// Milliseconds from job receipt to response or failure.
    pub latency_ms: i64,
}

impl CheckResult {
    pub fn is_up(&self) -> bool {
        self.outcome.is_up()
    }
}

/// Uptime percentage for one target over a query window. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeReport {
    pub target_id: String,

    /// Mean of the is-up signal over the window, expressed 0-100.
    /// Exactly 0.0 when the window holds no points.
    pub uptime_percentage: f64,
}

/// Latency samples for one target over a query window, ascending by
/// timestamp. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyHistory {
    pub target_id: String,
    pub points: Vec<LatencyPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyPoint {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: i64,
}
