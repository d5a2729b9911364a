//! Message types for actor communication

use tokio::sync::oneshot;

/// Commands that can be sent to the DispatcherActor
#[derive(Debug)]
pub enum DispatcherCommand {
    /// Trigger an immediate dispatch tick (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations. Responds with the
    /// number of jobs published.
    TickNow {
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Update the tick interval
    ///
    /// The new interval takes effect immediately.
    UpdateInterval {
        /// New interval in seconds
        interval_secs: u64,
    },

    /// Gracefully shut down the dispatcher
    ///
    /// The actor will finish any in-flight tick and then exit.
    Shutdown,
}

/// Writer pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Results successfully persisted (including retried ones)
    pub points_written: u64,

    /// Individual write attempts that failed
    pub failed_attempts: u64,

    /// Results routed to the dead-letter channel after retries ran out
    pub dead_lettered: u64,
}
