//! DispatcherActor - Turns due targets into check jobs
//!
//! On every tick the dispatcher asks the target directory which targets
//! are due and publishes one [`CheckJob`] per returned target to the job
//! channel.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → due_targets() → publish CheckJob per target → Job Channel
//!     ↑
//!     └─── Commands (TickNow, UpdateInterval, Shutdown)
//! ```
//!
//! ## Failure policy
//!
//! - Directory call fails → the whole tick is skipped and retried on the
//!   next natural tick; nothing is partially dispatched.
//! - Publishing one job fails → logged, the remaining due targets are
//!   still dispatched (partial-failure tolerant, not atomic).
//! - Ticks never overlap: the loop is a single task, and the interval is
//!   configured to skip ticks that fall due while one is running.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::CheckJob;
use crate::channel::Channel;
use crate::directory::TargetDirectory;

use super::messages::DispatcherCommand;

/// Actor that dispatches check jobs for due targets
///
/// Runs as a single task with no internal concurrency; the directory is
/// the source of truth for "not due again until the interval elapses",
/// so the dispatcher does no deduplication of its own.
pub struct DispatcherActor {
    /// Source of due targets
    directory: Arc<dyn TargetDirectory>,

    /// Job channel the dispatcher publishes to
    jobs: Channel<CheckJob>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<DispatcherCommand>,

    /// Current tick interval
    interval_duration: Duration,
}

impl DispatcherActor {
    pub fn new(
        directory: Arc<dyn TargetDirectory>,
        jobs: Channel<CheckJob>,
        command_rx: mpsc::Receiver<DispatcherCommand>,
        interval_duration: Duration,
    ) -> Self {
        Self {
            directory,
            jobs,
            command_rx,
            interval_duration,
        }
    }

    /// Run the actor's main loop
    ///
    /// This is the entry point for the actor. It runs until:
    /// - A Shutdown command is received
    /// - The command channel is closed
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting dispatcher actor");

        // The first natural tick fires one full interval after start; an
        // immediate dispatch is available on demand via TickNow.
        let mut ticker = interval_at(
            Instant::now() + self.interval_duration,
            self.interval_duration,
        );
        // A tick that falls due while the previous one is still running is
        // skipped, bounding concurrency to one tick at a time.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Timer tick - dispatch due targets
                _ = ticker.tick() => {
                    match self.perform_tick().await {
                        Ok(published) => {
                            trace!("tick published {published} jobs");
                        }
                        Err(e) => {
                            // Upstream unavailable: skip this tick entirely,
                            // retry on the next natural tick.
                            error!("dispatch tick skipped: {:#}", e);
                        }
                    }
                }

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        DispatcherCommand::TickNow { respond_to } => {
                            debug!("received TickNow command");
                            let result = self.perform_tick().await;
                            let _ = respond_to.send(result);
                        }

                        DispatcherCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = interval_at(
                                Instant::now() + self.interval_duration,
                                self.interval_duration,
                            );
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        }

                        DispatcherCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                // Command channel closed - exit
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("dispatcher actor stopped");
    }

    /// Perform one dispatch tick
    ///
    /// Returns the number of jobs published. A directory failure aborts
    /// the tick before anything is published; a publish failure for one
    /// job does not stop the rest.
    #[instrument(skip(self))]
    async fn perform_tick(&self) -> Result<usize> {
        let due = self
            .directory
            .due_targets()
            .await
            .context("failed to fetch due targets")?;

        trace!("{} targets due", due.len());

        let mut published = 0;
        for target in due {
            let job = CheckJob {
                target_id: target.id.clone(),
                url: target.url.clone(),
            };

            match self.jobs.publish(job).await {
                Ok(()) => {
                    trace!("published job for target {}", target.id);
                    published += 1;
                }
                Err(e) => {
                    error!("failed to publish job for target {}: {e}", target.id);
                }
            }
        }

        Ok(published)
    }
}

/// Handle for controlling the DispatcherActor
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<DispatcherCommand>,
}

impl DispatcherHandle {
    /// Spawn a new dispatcher actor
    pub fn spawn(
        directory: Arc<dyn TargetDirectory>,
        jobs: Channel<CheckJob>,
        tick_interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = DispatcherActor::new(directory, jobs, cmd_rx, tick_interval);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Trigger an immediate dispatch tick
    ///
    /// Returns the number of jobs published.
    pub async fn tick_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Update the tick interval
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(DispatcherCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Gracefully shut down the dispatcher
    pub async fn shutdown(&self) {
        let _ = self.sender.send(DispatcherCommand::Shutdown).await;
    }
}
