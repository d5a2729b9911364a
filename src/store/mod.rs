//! Telemetry store backends
//!
//! This module provides a trait-based abstraction for persisting probe
//! outcomes as time-series points.
//!
//! ## Design
//!
//! - **Trait-based**: `TelemetryStore` allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Idempotent writes**: `(target_id, timestamp)` is the point identity;
//!   writing the same identity twice is last-write-wins, which makes
//!   at-least-once result delivery safe for aggregation
//! - **Append-only**: the pipeline never mutates or deletes points
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded, good for modest fleets
//! - **In-Memory**: no persistence, for tests and storage-less runs

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::TelemetryStore;
pub use error::{StorageError, StorageResult};
pub use schema::TelemetryPoint;
