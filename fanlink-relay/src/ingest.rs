use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::event::RelayEvent;
use crate::packet::transcode;

/// Pause after a failed `recv_from` so a persistent socket error does not
/// spin the receive loop.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Producer of relay events.
#[async_trait]
pub trait EventSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts producing events until `cancel` fires or the receiver is
    /// dropped. Events arrive in the order they were produced.
    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RelayEvent>, Self::Error>;
}

/// Receives fan telemetry datagrams on a UDP socket.
pub struct UdpIngest {
    socket: Arc<UdpSocket>,
    buffer_size: usize,
    channel_capacity: usize,
}

impl UdpIngest {
    pub fn new(socket: UdpSocket, config: &IngestConfig) -> Self {
        Self {
            socket: Arc::new(socket),
            buffer_size: config.buffer_size,
            channel_capacity: config.channel_capacity,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl EventSource for UdpIngest {
    type Error = std::convert::Infallible;

    async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RelayEvent>, Self::Error> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let socket = Arc::clone(&self.socket);
        let buffer_size = self.buffer_size;

        info!(
            addr = ?socket.local_addr().ok(),
            buffer_size, "Starting UDP ingest"
        );

        tokio::spawn(receive_loop(socket, buffer_size, tx, cancel));

        Ok(rx)
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    buffer_size: usize,
    tx: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; buffer_size];

    loop {
        let (len, peer) = tokio::select! {
            _ = cancel.cancelled() => {
                info!("UDP ingest shutting down");
                return;
            }
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "failed to receive datagram");
                    if !backoff(&cancel).await {
                        info!("UDP ingest shutting down");
                        return;
                    }
                    continue;
                }
            },
        };

        let event = match transcode(&buf[..len]) {
            Ok(event) => event,
            Err(e) => {
                warn!(%peer, len, error = %e, "invalid UDP packet");
                continue;
            }
        };

        debug!(
            %peer,
            device_id = ?event.state.device_id,
            "decoded fan state"
        );

        if tx.send(event.into()).await.is_err() {
            info!("Channel closed, UDP ingest shutting down");
            return;
        }
    }
}

/// Sleeps for [`RECV_ERROR_BACKOFF`]. Returns `false` if `cancel` fired
/// first.
async fn backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(RECV_ERROR_BACKOFF) => true,
    }
}
