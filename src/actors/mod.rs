//! Actor-based health-check pipeline
//!
//! Each stage runs as one or more independent async tasks communicating
//! through at-least-once delivery channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────────┐   due_targets()   ┌──────────────┐
//!  │ Target Directory │◄──────────────────┤  Dispatcher  │ (single periodic task)
//!  └──────────────────┘                   └──────┬───────┘
//!                                                │ publish CheckJob
//!                                        ┌───────▼────────┐
//!                                        │  Job Channel   │ (at-least-once)
//!                                        └───────┬────────┘
//!                                                │ receive / ack
//!                             ┌──────────────────┼──────────────────┐
//!                      ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐
//!                      │ ProbeWorker │    │ ProbeWorker │    │ ProbeWorker │
//!                      └──────┬──────┘    └──────┬──────┘    └──────┬──────┘
//!                             └──────────────────┼──────────────────┘
//!                                                │ publish CheckResult
//!                                        ┌───────▼────────┐
//!                                        │ Result Channel │ (at-least-once)
//!                                        └───────┬────────┘
//!                                                │ receive / ack
//!                                       ┌────────▼─────────┐
//!                                       │ Telemetry Writer │ (pool)
//!                                       └────────┬─────────┘
//!                                                │ idempotent upsert
//!                                       ┌────────▼─────────┐
//!                                       │  Telemetry Store │◄── Analytics (read-only)
//!                                       └──────────────────┘
//! ```
//!
//! ## Delivery semantics
//!
//! Both channels deliver at least once: a job may be probed more than once
//! (harmless, probes only observe the target) and a result may be written
//! more than once (harmless, the store upserts on point identity).
//! Ordering is never guaranteed across targets or probes; per-target
//! ordering exists only by timestamp at query time.
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the dispatcher has an mpsc command channel for control
//!    messages (tick now, update interval, shutdown)
//! 2. **Work**: jobs and results flow through the ack-based channels
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod dispatcher;
pub mod messages;
pub mod probe;
pub mod writer;
