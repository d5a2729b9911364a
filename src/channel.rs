//! At-least-once delivery channels
//!
//! The pipeline's two hops (dispatcher → workers, workers → writer) run over
//! this in-process queue. It mimics the acknowledgement protocol of a broker
//! queue rather than a plain mpsc channel:
//!
//! 1. **Publish**: producers enqueue a message; a full queue is a visible
//!    publish error, never silent loss.
//! 2. **Receive**: consumers take a [`Delivery`] which moves the message to
//!    an in-flight set with a visibility deadline.
//! 3. **Ack**: acknowledging the delivery removes the message for good.
//!    A delivery that is dropped without ack (consumer crash, task abort)
//!    becomes visible again once its deadline passes and is redelivered.
//!
//! The result is at-least-once semantics: a message is delivered one or
//! more times, never zero, as long as the queue itself stays alive.
//! Consumers must therefore tolerate duplicates (see the store's
//! idempotent upsert and the naturally idempotent probe).

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Default time an unacked delivery stays invisible before redelivery.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on queued (ready) messages.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Errors surfaced to producers.
#[derive(Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The queue has reached its configured capacity.
    Full,

    /// The queue was closed and accepts no further messages.
    Closed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Full => write!(f, "channel is at capacity"),
            ChannelError::Closed => write!(f, "channel is closed"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Queue depth snapshot for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Messages waiting to be received.
    pub ready: usize,

    /// Messages delivered but not yet acknowledged.
    pub in_flight: usize,
}

struct InFlight<T> {
    message: T,
    deadline: Instant,
}

struct State<T> {
    ready: VecDeque<T>,
    in_flight: HashMap<u64, InFlight<T>>,
    next_receipt: u64,
    closed: bool,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    capacity: usize,
    visibility_timeout: Duration,
}

/// A bounded at-least-once message queue.
///
/// Cloning the channel clones a handle to the same queue; any number of
/// producers and consumers may share it.
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Channel<T> {
    /// Create a channel with default capacity and visibility timeout.
    pub fn new() -> Self {
        Self::with_options(DEFAULT_CAPACITY, DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Create a channel with explicit bounds.
    pub fn with_options(capacity: usize, visibility_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    ready: VecDeque::new(),
                    in_flight: HashMap::new(),
                    next_receipt: 0,
                    closed: false,
                }),
                notify: Notify::new(),
                capacity,
                visibility_timeout,
            }),
        }
    }

    /// Enqueue a message.
    ///
    /// Fails fast when the queue is full or closed; producers decide
    /// whether that is fatal (the dispatcher logs and moves on).
    pub async fn publish(&self, message: T) -> Result<(), ChannelError> {
        let mut state = self.inner.state.lock().await;

        if state.closed {
            return Err(ChannelError::Closed);
        }

        if state.ready.len() >= self.inner.capacity {
            warn!("channel at capacity ({} ready)", state.ready.len());
            return Err(ChannelError::Full);
        }

        state.ready.push_back(message);
        drop(state);

        // notify_one stores a permit when nobody is parked yet, so a
        // consumer that checked the queue just before this publish still
        // wakes up instead of sleeping on a stale empty view.
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Receive the next message as an unacknowledged delivery.
    ///
    /// Waits until a message is ready (including redeliveries whose
    /// visibility deadline has passed). Returns `None` once the channel is
    /// closed and fully drained - ready and in-flight both empty.
    pub async fn receive(&self) -> Option<Delivery<T>> {
        loop {
            let wait_hint = {
                let mut state = self.inner.state.lock().await;
                let now = Instant::now();

                self.requeue_expired(&mut state, now);

                if let Some(message) = state.ready.pop_front() {
                    let receipt = state.next_receipt;
                    state.next_receipt += 1;
                    state.in_flight.insert(
                        receipt,
                        InFlight {
                            message: message.clone(),
                            deadline: now + self.inner.visibility_timeout,
                        },
                    );

                    return Some(Delivery {
                        message,
                        receipt,
                        channel: self.clone(),
                    });
                }

                if state.closed && state.in_flight.is_empty() {
                    // Cascade the wakeup so sibling consumers parked on the
                    // same queue also observe the drained state.
                    self.inner.notify.notify_one();
                    return None;
                }

                // Wake up no later than the earliest in-flight deadline so
                // redeliveries do not wait on producer activity.
                state
                    .in_flight
                    .values()
                    .map(|f| f.deadline)
                    .min()
                    .map(|deadline| deadline.saturating_duration_since(now))
            };

            match wait_hint {
                Some(deadline) => {
                    tokio::select! {
                        _ = self.inner.notify.notified() => {}
                        _ = tokio::time::sleep(deadline) => {}
                    }
                }
                None => self.inner.notify.notified().await,
            }
        }
    }

    /// Close the channel. Already-queued and in-flight messages can still
    /// be received and acked; new publishes fail with [`ChannelError::Closed`].
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        state.closed = true;
        drop(state);

        debug!("channel closed");
        self.inner.notify.notify_waiters();
        // Permit for a consumer that is between its state check and parking.
        self.inner.notify.notify_one();
    }

    /// Current queue depths.
    pub async fn stats(&self) -> ChannelStats {
        let state = self.inner.state.lock().await;
        ChannelStats {
            ready: state.ready.len(),
            in_flight: state.in_flight.len(),
        }
    }

    fn requeue_expired(&self, state: &mut State<T>, now: Instant) {
        let expired: Vec<u64> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.deadline <= now)
            .map(|(receipt, _)| *receipt)
            .collect();

        for receipt in expired {
            if let Some(flight) = state.in_flight.remove(&receipt) {
                trace!("redelivering unacked message (receipt {receipt})");
                state.ready.push_back(flight.message);
            }
        }
    }

    async fn ack_receipt(&self, receipt: u64) {
        let mut state = self.inner.state.lock().await;
        if state.in_flight.remove(&receipt).is_none() {
            // Deadline passed and the message was already requeued; the
            // duplicate will be processed again, which consumers tolerate.
            trace!("ack for already-redelivered receipt {receipt}");
        }
        drop(state);

        // Consumers waiting for a closed queue to drain re-check on ack.
        self.inner.notify.notify_one();
    }
}

impl<T: Clone + Send + 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One received message plus the receipt needed to acknowledge it.
///
/// Dropping a delivery without calling [`Delivery::ack`] leaves the message
/// in flight; it becomes visible again after the channel's visibility
/// timeout and is redelivered.
pub struct Delivery<T> {
    message: T,
    receipt: u64,
    channel: Channel<T>,
}

impl<T: Clone + Send + 'static> Delivery<T> {
    pub fn message(&self) -> &T {
        &self.message
    }

    /// Consume the delivery and remove the message from the queue.
    pub async fn ack(self) {
        self.channel.ack_receipt(self.receipt).await;
    }
}
