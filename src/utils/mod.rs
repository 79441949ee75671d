//! # Utility Modules
//!
//! Supporting utilities for buffering, logging, timing, and observability.
//!
//! ## Components
//! - **Buffer Pool**: bucketed free-list storage rented by packet writers
//! - **Logging**: structured logging configuration
//! - **Timeout**: shared durations and an async deadline wrapper
//! - **Metrics**: thread-safe observability counters

pub mod buffer_pool;
pub mod logging;
pub mod metrics;
pub mod timeout;

// Re-export public types for advanced users
pub use buffer_pool::{BufferPool, PooledBuffer};
pub use metrics::{global_metrics, Metrics, MetricsSnapshot};
