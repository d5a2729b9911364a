//! Telemetry writers - Persist probe results as time-series points
//!
//! A pool of consumers takes check results off the result channel and
//! writes each one as a single telemetry point, tagged by target and
//! timestamped at millisecond precision.
//!
//! ## Retry and dead-lettering
//!
//! A store write failure is retried with backoff up to a configured
//! attempt count before the result is acked. Results that exhaust their
//! attempts are routed to a dead-letter channel (and only then acked), so
//! a persistent store outage can neither loop a message forever nor lose
//! it silently. If even the dead-letter publish fails, the delivery is
//! left unacked and the visibility timeout retries the whole
//! persist-or-dead-letter step.
//!
//! No write-time deduplication is needed: the store upserts on
//! `(target_id, timestamp)`, so redelivered results collapse into one
//! point and aggregates stay correct.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use crate::CheckResult;
use crate::channel::Channel;
use crate::config::WriterConfig;
use crate::store::{TelemetryPoint, TelemetryStore};

use super::messages::WriterStats;

struct Counters {
    points_written: AtomicU64,
    failed_attempts: AtomicU64,
    dead_lettered: AtomicU64,
}

/// A single telemetry writer consumer
pub struct TelemetryWriter {
    /// Worker index, for logging only
    index: usize,

    store: Arc<dyn TelemetryStore>,

    /// Result channel the writer consumes from
    results: Channel<CheckResult>,

    /// Destination for results that exhausted their write attempts
    dead_letters: Channel<CheckResult>,

    /// Store write attempts per result before dead-lettering
    write_attempts: u32,

    /// Base backoff between attempts (grows linearly per attempt)
    retry_backoff: Duration,

    counters: Arc<Counters>,
}

impl TelemetryWriter {
    /// Run the writer's consume loop
    ///
    /// Exits when the result channel is closed and drained.
    #[instrument(skip(self), fields(writer = self.index))]
    pub async fn run(self) {
        debug!("starting telemetry writer");

        while let Some(delivery) = self.results.receive().await {
            let result = delivery.message().clone();
            trace!(
                "received result for target {} ({})",
                result.target_id,
                if result.is_up() { "UP" } else { "DOWN" }
            );

            if self.write_with_retry(&result).await {
                self.counters.points_written.fetch_add(1, Ordering::Relaxed);
                delivery.ack().await;
                continue;
            }

            error!(
                "dead-lettering result for target {} after {} attempts",
                result.target_id, self.write_attempts
            );
            let target_id = result.target_id.clone();
            match self.dead_letters.publish(result).await {
                Ok(()) => {
                    // Acked only once the result sits in the dead-letter
                    // channel, so it is never dropped with nothing but a
                    // log line to show for it.
                    self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
                    delivery.ack().await;
                }
                Err(e) => {
                    // Neither stored nor dead-lettered: leave the delivery
                    // unacked and let the visibility timeout redeliver it.
                    error!("failed to dead-letter result for target {target_id}: {e}");
                }
            }
        }

        debug!("telemetry writer stopped");
    }

    /// Write one point, retrying with linear backoff
    ///
    /// Returns true once the write succeeded, false when all attempts
    /// failed.
    async fn write_with_retry(&self, result: &CheckResult) -> bool {
        let point = TelemetryPoint::from_result(result);

        for attempt in 1..=self.write_attempts {
            match self.store.write_point(point.clone()).await {
                Ok(()) => {
                    trace!("wrote point for target {}", point.target_id);
                    return true;
                }
                Err(e) => {
                    self.counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "write attempt {attempt}/{} for target {} failed: {e}",
                        self.write_attempts, point.target_id
                    );

                    if attempt < self.write_attempts {
                        tokio::time::sleep(self.retry_backoff * attempt).await;
                    }
                }
            }
        }

        false
    }
}

/// Handle for a pool of telemetry writers
pub struct TelemetryWriterPool {
    workers: Vec<JoinHandle<()>>,
    dead_letters: Channel<CheckResult>,
    counters: Arc<Counters>,
}

impl TelemetryWriterPool {
    /// Spawn the writer pool
    ///
    /// All writers share the store, the result channel, and a dead-letter
    /// channel that can be drained via [`TelemetryWriterPool::dead_letters`].
    pub fn spawn(
        config: &WriterConfig,
        store: Arc<dyn TelemetryStore>,
        results: Channel<CheckResult>,
    ) -> Self {
        debug!("spawning {} telemetry writers", config.pool_size);

        let dead_letters: Channel<CheckResult> = Channel::new();
        let counters = Arc::new(Counters {
            points_written: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
        });

        let workers = (0..config.pool_size)
            .map(|index| {
                let writer = TelemetryWriter {
                    index,
                    store: Arc::clone(&store),
                    results: results.clone(),
                    dead_letters: dead_letters.clone(),
                    write_attempts: config.write_attempts.max(1),
                    retry_backoff: config.retry_backoff(),
                    counters: Arc::clone(&counters),
                };
                tokio::spawn(writer.run())
            })
            .collect();

        Self {
            workers,
            dead_letters,
            counters,
        }
    }

    /// The dead-letter channel holding results that exhausted retries
    pub fn dead_letters(&self) -> Channel<CheckResult> {
        self.dead_letters.clone()
    }

    /// Current pool statistics
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            points_written: self.counters.points_written.load(Ordering::Relaxed),
            failed_attempts: self.counters.failed_attempts.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
        }
    }

    /// Wait for all writers to exit (close the result channel first)
    pub async fn join(self) -> WriterStats {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("telemetry writer task failed: {e}");
            }
        }

        WriterStats {
            points_written: self.counters.points_written.load(Ordering::Relaxed),
            failed_attempts: self.counters.failed_attempts.load(Ordering::Relaxed),
            dead_lettered: self.counters.dead_lettered.load(Ordering::Relaxed),
        }
    }
}
