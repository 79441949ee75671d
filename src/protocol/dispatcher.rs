//! Packet dispatcher with per-opcode listener fan-out.
//!
//! Many listeners may register for the same opcode; delivery order among them
//! is unspecified. Dispatch snapshots the listener list and invokes each one
//! outside the registration lock, so a listener is never called while the
//! lock is held and a slow or failing listener cannot block registration.
//!
//! Failure isolation: a listener returning `Err` or panicking is logged and
//! counted, and the remaining listeners still run. Nothing propagates back
//! into the framing hot path.

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::framer::SessionId;
use crate::protocol::registry::Packet;
use crate::utils::metrics::global_metrics;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{error, warn};

/// Listener contract: returns whether the packet was handled. Errors are
/// caught and logged at the dispatch boundary.
pub type ListenerFn = dyn Fn(SessionId, &dyn Packet) -> Result<bool> + Send + Sync + 'static;

/// Routes decoded packets to every listener registered for their opcode.
pub struct Dispatcher {
    listeners: Arc<RwLock<HashMap<u8, Vec<Arc<ListenerFn>>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a listener for an opcode. Multiple listeners per opcode are
    /// allowed; their relative invocation order is unspecified.
    pub fn add_listener<F>(&self, opcode: u8, listener: F) -> Result<()>
    where
        F: Fn(SessionId, &dyn Packet) -> Result<bool> + Send + Sync + 'static,
    {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        listeners
            .entry(opcode)
            .or_default()
            .push(Arc::new(listener));
        Ok(())
    }

    /// Number of listeners currently registered for an opcode.
    pub fn listener_count(&self, opcode: u8) -> usize {
        self.listeners
            .read()
            .map(|map| map.get(&opcode).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Deliver a packet to every listener registered for its opcode.
    ///
    /// Returns how many listeners reported the packet handled. Zero
    /// registered listeners is non-fatal: it is logged and counted, and the
    /// packet is dropped.
    pub fn notify(&self, session: SessionId, packet: &dyn Packet) -> Result<usize> {
        let opcode = packet.opcode();

        // Snapshot under the read lock, invoke outside it.
        let snapshot: Vec<Arc<ListenerFn>> = {
            let listeners = self.listeners.read().map_err(|_| {
                ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
            })?;
            match listeners.get(&opcode) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => {
                    warn!(
                        %session,
                        opcode = format_args!("0x{opcode:02X}"),
                        "No listener registered for packet"
                    );
                    global_metrics().packet_unhandled();
                    return Ok(0);
                }
            }
        };

        let mut handled = 0usize;
        for listener in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(session, packet))) {
                Ok(Ok(true)) => handled += 1,
                Ok(Ok(false)) => {}
                Ok(Err(error)) => {
                    global_metrics().listener_failure();
                    error!(
                        %session,
                        opcode = format_args!("0x{opcode:02X}"),
                        %error,
                        "Listener failed"
                    );
                }
                Err(_) => {
                    global_metrics().listener_failure();
                    error!(
                        %session,
                        opcode = format_args!("0x{opcode:02X}"),
                        "Listener panicked"
                    );
                }
            }
        }

        global_metrics().packet_dispatched();
        Ok(handled)
    }
}

impl Clone for Dispatcher {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opcodes = self.listeners.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("Dispatcher")
            .field("opcodes_with_listeners", &opcodes)
            .finish()
    }
}
