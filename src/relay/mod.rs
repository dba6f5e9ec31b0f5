//! The relay engine: listener, per-connection driver, host wait loop, and
//! the stale-room reaper.
//!
//! Every accepted connection runs the same script in its own task: PAKE and
//! password handshake, room assignment, then either the host wait loop (the
//! connection created the room) or an immediate return (the connection was
//! attached as a client and is now owned by the room record). The wait loop
//! serializes client sessions through one room: it pings the host while the
//! room waits, runs the pipe while a client is attached, and decides the
//! room's fate from how the session ended.

mod handshake;
mod piper;
mod registry;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::comm::Comm;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::wire;
use piper::SessionEnd;
use registry::{Assignment, RoomRegistry, SessionParts, WaitStep};

/// A bound relay instance. `bind` then `serve`; the listener address is
/// available in between, which is how tests reach an ephemeral port.
pub struct Relay {
    listener: TcpListener,
    password: String,
    config: RelayConfig,
    registry: Arc<RoomRegistry>,
}

impl Relay {
    pub async fn bind(addr: &str, password: impl Into<String>, config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            password: password.into(),
            config,
            registry: Arc::new(RoomRegistry::new()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop; runs until the listener fails.
    pub async fn serve(self) -> Result<()> {
        info!("relay listening on {}", self.local_addr()?);
        tokio::spawn(reap_loop(self.registry.clone(), self.config.clone()));
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "connection accepted");
            let registry = self.registry.clone();
            let password = self.password.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                match drive_connection(stream, registry, password, config).await {
                    Ok(()) => {}
                    // Password mismatches stay at debug; they are routine.
                    Err(RelayError::AuthFailed) => debug!(%peer, "password rejected"),
                    Err(err) => warn!(%peer, "connection ended: {err}"),
                }
            });
        }
    }
}

async fn drive_connection(
    stream: TcpStream,
    registry: Arc<RoomRegistry>,
    password: String,
    config: RelayConfig,
) -> Result<()> {
    let _ = stream.set_nodelay(true);
    let mut comm = Comm::from_stream(stream, config.max_frame);
    let key = handshake::authenticate(&mut comm, &password, &config).await?;
    let (name, assignment) = handshake::assign_room(comm, &key, &registry, &config).await?;
    match assignment {
        Assignment::Host => host_wait_loop(&name, &registry, &config).await,
        Assignment::Client => {
            // The client's halves now live in the room record; the host's
            // wait loop picks the session up on its next round.
            debug!(room = %name, "client handed to room");
            Ok(())
        }
        Assignment::Full => {
            debug!(room = %name, "rejected: room full");
            Ok(())
        }
    }
}

/// Runs in the host connection's task until its room dies.
async fn host_wait_loop(
    name: &str,
    registry: &RoomRegistry,
    config: &RelayConfig,
) -> Result<()> {
    loop {
        match registry.poll(name, wire::KEEPALIVE).await {
            WaitStep::Gone => {
                debug!(room = %name, "room is gone");
                return Ok(());
            }
            WaitStep::HostLost => {
                warn!(room = %name, "host unreachable, room removed");
                return Ok(());
            }
            WaitStep::Idle => tokio::time::sleep(config.ping_interval).await,
            WaitStep::Session(SessionParts { mut host, client }) => {
                debug!(room = %name, "both sides present, piping");
                match piper::pipe(&mut host, client, config.recv_buffer).await {
                    SessionEnd::Terminated => {
                        registry.delete(name).await;
                        debug!(room = %name, "session terminated, room deleted");
                        return Ok(());
                    }
                    SessionEnd::ClientLeft => {
                        registry.end_session(name, host).await;
                        debug!(room = %name, "client left, room kept for the next one");
                    }
                }
            }
        }
    }
}

/// Fallback GC for rooms whose host vanished in a way the keepalive could
/// not observe (half-open TCP).
async fn reap_loop(registry: Arc<RoomRegistry>, config: RelayConfig) {
    loop {
        tokio::time::sleep(config.reap_interval).await;
        for name in registry.stale(config.max_room_age).await {
            info!(room = %name, "reaping stale room");
            registry.delete(&name).await;
        }
    }
}
