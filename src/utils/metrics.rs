//! Observability and Metrics
//!
//! This module provides aggregate metrics collection for monitoring framing
//! health across every session: bytes moved, frames parsed, and each category
//! of protocol violation.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for the framing and dispatch pipeline
#[derive(Debug)]
pub struct Metrics {
    /// Total sessions accepted
    pub sessions_total: AtomicU64,
    /// Currently active sessions
    pub sessions_active: AtomicU64,
    /// Total bytes received across all sessions
    pub bytes_received: AtomicU64,
    /// Total bytes sent across all sessions
    pub bytes_sent: AtomicU64,
    /// Frames successfully parsed into packets
    pub frames_parsed: AtomicU64,
    /// Bytes dropped resynchronizing past unknown opcodes
    pub unknown_opcode_drops: AtomicU64,
    /// Headers dropped for out-of-range declared lengths
    pub invalid_length_drops: AtomicU64,
    /// Frames that failed their packet decode routine
    pub parse_failures: AtomicU64,
    /// Sessions disconnected for pending-buffer overflow
    pub buffer_overflows: AtomicU64,
    /// All protocol violations, any category
    pub violations_total: AtomicU64,
    /// Sessions disconnected by the violation circuit breaker
    pub sessions_force_closed: AtomicU64,
    /// Packets handed to at least one listener
    pub packets_dispatched: AtomicU64,
    /// Packets dispatched with no listener registered
    pub packets_unhandled: AtomicU64,
    /// Listener invocations that failed or panicked
    pub listener_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_total: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            frames_parsed: AtomicU64::new(0),
            unknown_opcode_drops: AtomicU64::new(0),
            invalid_length_drops: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            buffer_overflows: AtomicU64::new(0),
            violations_total: AtomicU64::new(0),
            sessions_force_closed: AtomicU64::new(0),
            packets_dispatched: AtomicU64::new(0),
            packets_unhandled: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new session
    pub fn session_opened(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session closed
    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record inbound bytes
    pub fn bytes_in(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
    }

    /// Record outbound bytes
    pub fn bytes_out(&self, count: u64) {
        self.bytes_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a successfully parsed frame
    pub fn frame_parsed(&self) {
        self.frames_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unknown-opcode resync drop
    pub fn unknown_opcode(&self) {
        self.unknown_opcode_drops.fetch_add(1, Ordering::Relaxed);
        self.violations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an invalid declared length
    pub fn invalid_length(&self) {
        self.invalid_length_drops.fetch_add(1, Ordering::Relaxed);
        self.violations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame that failed decoding
    pub fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
        self.violations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pending-buffer overflow
    pub fn buffer_overflow(&self) {
        self.buffer_overflows.fetch_add(1, Ordering::Relaxed);
        self.violations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session closed by the violation circuit breaker
    pub fn session_force_closed(&self) {
        self.sessions_force_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a packet handed to listeners
    pub fn packet_dispatched(&self) {
        self.packets_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a packet with no listener
    pub fn packet_unhandled(&self) {
        self.packets_unhandled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a listener that failed or panicked
    pub fn listener_failure(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_parsed: self.frames_parsed.load(Ordering::Relaxed),
            unknown_opcode_drops: self.unknown_opcode_drops.load(Ordering::Relaxed),
            invalid_length_drops: self.invalid_length_drops.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
            violations_total: self.violations_total.load(Ordering::Relaxed),
            sessions_force_closed: self.sessions_force_closed.load(Ordering::Relaxed),
            packets_dispatched: self.packets_dispatched.load(Ordering::Relaxed),
            packets_unhandled: self.packets_unhandled.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_total = snapshot.sessions_total,
            sessions_active = snapshot.sessions_active,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            frames_parsed = snapshot.frames_parsed,
            unknown_opcode_drops = snapshot.unknown_opcode_drops,
            invalid_length_drops = snapshot.invalid_length_drops,
            parse_failures = snapshot.parse_failures,
            buffer_overflows = snapshot.buffer_overflows,
            violations_total = snapshot.violations_total,
            sessions_force_closed = snapshot.sessions_force_closed,
            packets_dispatched = snapshot.packets_dispatched,
            packets_unhandled = snapshot.packets_unhandled,
            listener_failures = snapshot.listener_failures,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub sessions_total: u64,
    pub sessions_active: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub frames_parsed: u64,
    pub unknown_opcode_drops: u64,
    pub invalid_length_drops: u64,
    pub parse_failures: u64,
    pub buffer_overflows: u64,
    pub violations_total: u64,
    pub sessions_force_closed: u64,
    pub packets_dispatched: u64,
    pub packets_unhandled: u64,
    pub listener_failures: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Initialize metrics collection (call once at startup)
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
