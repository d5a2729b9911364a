//! Probe workers - Execute health checks against target URLs
//!
//! A pool of identical workers consumes check jobs, performs one HTTP GET
//! per job with a bounded timeout, and always produces exactly one
//! [`CheckResult`] - every probe outcome, including malformed URLs and
//! timeouts, resolves to a result, never to a dropped job or a crashed
//! worker loop.
//!
//! ## Message Flow
//!
//! ```text
//! Job Channel → receive → HTTP GET (bounded timeout) → classify → publish CheckResult → ack job
//! ```
//!
//! ## Acknowledgement
//!
//! The job is acked only after its result has been handed to the result
//! channel. If publishing the result fails, the delivery is dropped
//! unacked and the channel redelivers the job later - at-least-once
//! semantics across the whole job→result hop. Duplicate probes of the
//! same target are acceptable; probing only observes the target.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use crate::channel::Channel;
use crate::{CheckJob, CheckOutcome, CheckResult};

/// A single probe worker
///
/// Each worker owns its HTTP client (reused across probes) and shares the
/// job and result channels with its siblings. Workers hold no other state,
/// so any number of them can run concurrently.
pub struct ProbeWorker {
    /// Worker index, for logging only
    index: usize,

    /// HTTP client (reused across requests for efficiency)
    client: reqwest::Client,

    /// Job channel the worker consumes from
    jobs: Channel<CheckJob>,

    /// Result channel the worker publishes to
    results: Channel<CheckResult>,
}

impl ProbeWorker {
    pub fn new(
        index: usize,
        timeout: Duration,
        jobs: Channel<CheckJob>,
        results: Channel<CheckResult>,
    ) -> Self {
        Self {
            index,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            jobs,
            results,
        }
    }

    /// Run the worker's consume loop
    ///
    /// Exits when the job channel is closed and drained.
    #[instrument(skip(self), fields(worker = self.index))]
    pub async fn run(self) {
        debug!("starting probe worker");

        while let Some(delivery) = self.jobs.receive().await {
            let job = delivery.message().clone();
            trace!("received job for target {}", job.target_id);

            let result = self.probe(&job).await;

            match self.results.publish(result).await {
                Ok(()) => {
                    // Result is safely in the channel; only now remove the
                    // job so a crash in between causes a re-probe, not loss.
                    delivery.ack().await;
                }
                Err(e) => {
                    // Leave the job unacked: the channel redelivers it
                    // after the visibility timeout.
                    error!(
                        "failed to publish result for target {}: {e}",
                        job.target_id
                    );
                }
            }
        }

        debug!("probe worker stopped");
    }

    /// Execute one probe and classify the outcome
    ///
    /// Never fails: transport-level errors (timeout, DNS, connection
    /// refused, TLS, malformed URL) become `TransportFailed` results.
    /// Latency is measured from job receipt to response or failure and is
    /// always populated.
    async fn probe(&self, job: &CheckJob) -> CheckResult {
        let start = std::time::Instant::now();

        let outcome = match self.client.get(&job.url).send().await {
            Ok(response) => CheckOutcome::Responded {
                status_code: response.status().as_u16(),
            },
            Err(e) => {
                warn!("probe of {} failed: {e}", job.url);
                CheckOutcome::TransportFailed {
                    reason: e.to_string(),
                }
            }
        };

        let latency_ms = start.elapsed().as_millis() as i64;

        CheckResult {
            target_id: job.target_id.clone(),
            timestamp: Utc::now(),
            outcome,
            latency_ms,
        }
    }
}

/// Handle for a pool of probe workers
///
/// Workers run until the job channel is closed and drained; `join` waits
/// for all of them to finish.
pub struct ProbeWorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl ProbeWorkerPool {
    /// Spawn `size` probe workers sharing the given channels
    pub fn spawn(
        size: usize,
        timeout: Duration,
        jobs: Channel<CheckJob>,
        results: Channel<CheckResult>,
    ) -> Self {
        debug!("spawning {size} probe workers");

        let workers = (0..size)
            .map(|index| {
                let worker = ProbeWorker::new(index, timeout, jobs.clone(), results.clone());
                tokio::spawn(worker.run())
            })
            .collect();

        Self { workers }
    }

    /// Number of workers in the pool
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for all workers to exit (close the job channel first)
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("probe worker task failed: {e}");
            }
        }
    }
}
