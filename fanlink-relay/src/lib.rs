use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub mod config;
pub mod event;
pub mod hub;
pub mod ingest;
pub mod packet;
pub mod ws;

use crate::config::Config;
use crate::event::RelayEvent;
use crate::hub::SubscriberHub;
use crate::ingest::{EventSource, UdpIngest};
use crate::ws::WsState;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    UdpBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind WebSocket listener on {addr}: {source}")]
    WsBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("websocket server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A bound relay: UDP ingest in, WebSocket fan-out.
pub struct Relay {
    ingest: UdpIngest,
    listener: TcpListener,
    hub: SubscriberHub,
    udp_addr: SocketAddr,
    ws_addr: SocketAddr,
}

impl Relay {
    /// Binds both sockets. Failing to bind either one is fatal.
    pub async fn bind(config: &Config) -> Result<Self, RelayError> {
        let udp_addr = config.server.udp_addr;
        let socket = UdpSocket::bind(udp_addr)
            .await
            .map_err(|source| RelayError::UdpBind {
                addr: udp_addr,
                source,
            })?;
        let udp_addr = socket
            .local_addr()
            .map_err(|source| RelayError::UdpBind {
                addr: udp_addr,
                source,
            })?;

        let ws_addr = config.server.ws_addr;
        let listener = TcpListener::bind(ws_addr)
            .await
            .map_err(|source| RelayError::WsBind {
                addr: ws_addr,
                source,
            })?;
        let ws_addr = listener
            .local_addr()
            .map_err(|source| RelayError::WsBind {
                addr: ws_addr,
                source,
            })?;

        Ok(Self {
            ingest: UdpIngest::new(socket, &config.ingest),
            listener,
            hub: SubscriberHub::new(),
            udp_addr,
            ws_addr,
        })
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn hub(&self) -> SubscriberHub {
        self.hub.clone()
    }

    /// Runs ingest, broadcast and the subscriber server until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), RelayError> {
        let Relay {
            ingest,
            listener,
            hub,
            udp_addr,
            ws_addr,
        } = self;

        let events = ingest
            .start(cancel.clone())
            .await
            .unwrap_or_else(|never| match never {});
        info!(%udp_addr, "Listening for UDP packets");

        let broadcaster = tokio::spawn(forward_events(events, hub.clone()));

        let app = ws::router(WsState {
            hub,
            cancel: cancel.clone(),
        });
        info!(%ws_addr, "WebSocket server listening");

        let shutdown = cancel.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        // Stop ingest too if the server exited on its own.
        cancel.cancel();
        join_task("broadcaster", broadcaster).await;
        info!("Relay shut down");

        served.map_err(RelayError::Serve)
    }
}

/// Waits for a background task, logging a panic or abort instead of
/// dropping it. Returns whether the task ran to completion.
async fn join_task(name: &'static str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            error!(task = name, error = %e, "background task failed");
            false
        }
    }
}

/// Broadcasts events to the hub in the order they are received.
pub async fn forward_events(mut events: mpsc::Receiver<RelayEvent>, hub: SubscriberHub) {
    while let Some(event) = events.recv().await {
        let report = hub.broadcast(&event).await;
        debug!(
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "broadcast fan state"
        );
    }

    info!("Event channel closed, broadcaster shutting down");
}
