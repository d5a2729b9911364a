//! Target directory contract
//!
//! The directory is the dispatcher's only upstream collaborator. It answers
//! "which targets are due right now" and owns the rescheduling bookkeeping:
//! every target it returns has its next-due time advanced by the target's
//! check interval before the call returns, so the same target cannot be
//! selected again until that interval elapses. The dispatcher performs no
//! deduplication of its own.
//!
//! How targets get created, owned, and persisted is out of scope here;
//! [`InMemoryDirectory`] carries just enough state to honor the contract
//! and to seed a running system from configuration.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::DueTarget;
use crate::config::TargetConfig;

/// Errors from the directory call. The dispatcher treats any of these as
/// "skip this tick" - they are logged, never fatal.
#[derive(Debug)]
pub struct DirectoryError(pub String);

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target directory unavailable: {}", self.0)
    }
}

impl std::error::Error for DirectoryError {}

/// Source of due targets.
///
/// Implementations must make `due_targets` atomic with respect to the
/// rescheduling side effect: a returned target's next-due time is already
/// advanced when the call returns.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    async fn due_targets(&self) -> Result<Vec<DueTarget>, DirectoryError>;
}

struct TargetEntry {
    id: String,
    url: String,
    check_interval_seconds: u32,
    next_check_time: DateTime<Utc>,
}

/// In-memory directory seeded from configuration.
///
/// New targets start due immediately (next-due in the past), so a fresh
/// system probes everything on its first tick.
pub struct InMemoryDirectory {
    targets: Mutex<Vec<TargetEntry>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn from_configs(configs: &[TargetConfig]) -> Self {
        let now = Utc::now();
        let targets = configs
            .iter()
            .map(|c| TargetEntry {
                id: c.id.clone(),
                url: c.url.clone(),
                check_interval_seconds: c.check_interval_seconds,
                next_check_time: now,
            })
            .collect();

        Self {
            targets: Mutex::new(targets),
        }
    }

    /// Register a target that becomes due immediately.
    pub async fn add_target(&self, id: &str, url: &str, check_interval_seconds: u32) {
        debug!("registering target {id} ({url}) every {check_interval_seconds}s");

        let mut targets = self.targets.lock().await;
        targets.push(TargetEntry {
            id: id.to_string(),
            url: url.to_string(),
            check_interval_seconds,
            next_check_time: Utc::now(),
        });
    }

    pub async fn len(&self) -> usize {
        self.targets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.targets.lock().await.is_empty()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetDirectory for InMemoryDirectory {
    async fn due_targets(&self) -> Result<Vec<DueTarget>, DirectoryError> {
        let now = Utc::now();
        let mut targets = self.targets.lock().await;

        let mut due = Vec::new();
        for entry in targets.iter_mut() {
            if entry.next_check_time > now {
                continue;
            }

            // Advance before handing the target out: it must not reappear
            // until its interval elapses, regardless of what the pipeline
            // does with the job.
            entry.next_check_time = now + Duration::seconds(i64::from(entry.check_interval_seconds));

            due.push(DueTarget {
                id: entry.id.clone(),
                url: entry.url.clone(),
                check_interval_seconds: entry.check_interval_seconds,
            });
        }

        trace!("{} of {} targets due", due.len(), targets.len());
        Ok(due)
    }
}
