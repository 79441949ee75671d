//! TCP server loop.
//!
//! One task group per connection: a read loop feeding the session's
//! [`SessionFramer`], a dispatch task draining decoded packets into the
//! [`Dispatcher`] (so framing never blocks on listeners, and per-session
//! delivery stays FIFO), and a writer task draining the outbound byte queue.
//! The accept loop supports graceful shutdown with connection draining.

use crate::config::NetworkConfig;
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::framer::{SessionFramer, SessionId};
use crate::protocol::registry::{Packet, PacketRegistry};
use crate::utils::metrics::{global_metrics, init_metrics, Timer};
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound sink: routes already-encoded frames to a session's writer task.
///
/// External packet producers hold a clone of this and call
/// [`send`](OutboundRouter::send) with the bytes a `PacketWriter` produced.
#[derive(Clone, Default)]
pub struct OutboundRouter {
    queues: Arc<RwLock<HashMap<SessionId, mpsc::Sender<Vec<u8>>>>>,
}

impl OutboundRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&self, session: SessionId, tx: mpsc::Sender<Vec<u8>>) {
        if let Ok(mut queues) = self.queues.write() {
            queues.insert(session, tx);
        }
    }

    fn detach(&self, session: SessionId) {
        if let Ok(mut queues) = self.queues.write() {
            queues.remove(&session);
        }
    }

    /// Queue encoded bytes for a session. Fails if the session is gone or
    /// its queue is full; there is no flow-control signal beyond that.
    pub fn send(&self, session: SessionId, bytes: Vec<u8>) -> Result<()> {
        let tx = self
            .queues
            .read()
            .ok()
            .and_then(|queues| queues.get(&session).cloned())
            .ok_or(ProtocolError::ConnectionClosed)?;

        tx.try_send(bytes).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => ProtocolError::ConnectionClosed,
            mpsc::error::TrySendError::Full(_) => {
                ProtocolError::Custom("outbound queue full".to_string())
            }
        })
    }

    /// Number of currently attached sessions.
    pub fn active_sessions(&self) -> usize {
        self.queues.read().map(|queues| queues.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for OutboundRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRouter")
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}

/// Start the server, shutting down on CTRL+C.
#[instrument(skip_all, fields(address = %config.server.address))]
pub async fn start_server(
    config: NetworkConfig,
    registry: Arc<PacketRegistry>,
    dispatcher: Dispatcher,
    router: OutboundRouter,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(config, registry, dispatcher, router, shutdown_rx).await
}

/// Start the server with an external shutdown channel.
#[instrument(skip_all, fields(address = %config.server.address))]
pub async fn start_server_with_shutdown(
    config: NetworkConfig,
    registry: Arc<PacketRegistry>,
    dispatcher: Dispatcher,
    router: OutboundRouter,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    config.validate_strict()?;
    init_metrics();

    let listener = TcpListener::bind(&config.server.address).await?;
    info!(address = %config.server.address, "Listening for shard clients");

    let active_connections = Arc::new(Mutex::new(0u32));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");

                let deadline = tokio::time::sleep(config.server.shutdown_timeout);
                tokio::pin!(deadline);

                loop {
                    tokio::select! {
                        _ = &mut deadline => {
                            warn!("Shutdown timeout reached, forcing exit");
                            break;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {
                            let connections = *active_connections.lock().await;
                            info!(connections = %connections, "Waiting for connections to close");
                            if connections == 0 {
                                info!("All connections closed, shutting down");
                                break;
                            }
                        }
                    }
                }

                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, addr)) => {
                        {
                            let mut count = active_connections.lock().await;
                            if (*count as usize) >= config.server.max_connections {
                                warn!(peer = %addr, "Connection limit reached, refusing");
                                continue;
                            }
                            *count += 1;
                        }

                        let session = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
                        info!(peer = %addr, %session, "Connection established");
                        global_metrics().session_opened();

                        let registry = registry.clone();
                        let dispatcher = dispatcher.clone();
                        let router = router.clone();
                        let config = config.clone();
                        let active_connections = active_connections.clone();

                        tokio::spawn(async move {
                            handle_connection(stream, session, registry, dispatcher, &router, &config).await;

                            global_metrics().session_closed();
                            let mut count = active_connections.lock().await;
                            *count -= 1;
                            info!(%session, "Connection closed");
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    session: SessionId,
    registry: Arc<PacketRegistry>,
    dispatcher: Dispatcher,
    router: &OutboundRouter,
    config: &NetworkConfig,
) {
    let _timer = Timer::start("session");
    let (read_half, write_half) = stream.into_split();

    let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(config.server.outbound_queue_limit);
    router.attach(session, out_tx);
    let writer_task = tokio::spawn(write_loop(session, write_half, out_rx));

    // Decoded packets cross this queue so framing never waits on listeners;
    // the queue preserves per-session FIFO order.
    let (pkt_tx, pkt_rx) = mpsc::unbounded_channel::<Box<dyn Packet>>();
    let dispatch_task = tokio::spawn(dispatch_loop(session, dispatcher, pkt_rx));

    read_loop(session, read_half, registry, config, pkt_tx).await;

    // The read loop dropped its packet sender; detaching drops the writer's.
    // Both tasks drain whatever is already queued, then exit on their own.
    router.detach(session);
    let _ = dispatch_task.await;
    let _ = writer_task.await;
}

async fn read_loop(
    session: SessionId,
    mut read_half: OwnedReadHalf,
    registry: Arc<PacketRegistry>,
    config: &NetworkConfig,
    pkt_tx: mpsc::UnboundedSender<Box<dyn Packet>>,
) {
    let mut framer = SessionFramer::new(session, registry, config.protocol.clone());
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        match read_half.read_buf(&mut buf).await {
            Ok(0) => {
                debug!(%session, "Peer closed the connection");
                return;
            }
            Ok(n) => {
                framer.note_inbound(n);

                loop {
                    match framer.advance(&mut buf) {
                        Ok(Some(packet)) => {
                            if pkt_tx.send(packet).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(error) => {
                            warn!(%session, %error, "Fatal protocol violation, disconnecting");
                            return;
                        }
                    }
                }
            }
            Err(error) => {
                debug!(%session, %error, "Read failed");
                return;
            }
        }
    }
}

async fn dispatch_loop(
    session: SessionId,
    dispatcher: Dispatcher,
    mut pkt_rx: mpsc::UnboundedReceiver<Box<dyn Packet>>,
) {
    while let Some(packet) = pkt_rx.recv().await {
        if let Err(error) = dispatcher.notify(session, packet.as_ref()) {
            error!(%session, %error, "Dispatch failed");
        }
    }
}

async fn write_loop(
    session: SessionId,
    mut write_half: OwnedWriteHalf,
    mut out_rx: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(bytes) = out_rx.recv().await {
        if let Err(error) = write_half.write_all(&bytes).await {
            debug!(%session, %error, "Write failed");
            return;
        }
        global_metrics().bytes_out(bytes.len() as u64);
    }
}
