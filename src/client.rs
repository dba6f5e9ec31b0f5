//! Client side of the relay protocol.
//!
//! [`connect`] runs the mirror image of the relay's setup exchange and
//! returns a [`RelayConnection`]: an opaque framed channel to whatever peer
//! shares the room. The handle filters the relay's keepalive sentinels, so
//! application code only ever sees peer frames.

use std::time::Duration;

use bytes::Bytes;

use crate::comm::Comm;
use crate::config::{PakeCurve, RelayConfig};
use crate::crypto::{cipher, pake, SealKey};
use crate::error::{RelayError, Result};
use crate::wire;

/// Which side of the room this connection ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// First into the room; stays attached across successive clients.
    Host,
    /// Joined a waiting host.
    Client,
}

/// A post-handshake connection through the relay.
pub struct RelayConnection {
    comm: Comm,
    role: PeerRole,
}

impl RelayConnection {
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Sends one frame to the peer.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.comm.send(data).await
    }

    /// Receives the next peer frame, silently dropping keepalive sentinels.
    pub async fn receive(&mut self) -> Result<Bytes> {
        loop {
            let frame = self.comm.receive().await?;
            if frame.as_ref() != wire::KEEPALIVE {
                return Ok(frame);
            }
        }
    }

    /// Closes the connection. For a host this ends the room; for a client
    /// it frees the room for the next one.
    pub async fn close(mut self) {
        self.comm.close().await;
    }
}

/// Connects to a relay and joins (or creates) the named room.
pub async fn connect(addr: &str, password: &str, room: &str) -> Result<RelayConnection> {
    connect_inner(addr, password, room, None).await
}

/// Like [`connect`], with a timeout applied to the TCP dial only.
pub async fn connect_timeout(
    addr: &str,
    password: &str,
    room: &str,
    timeout: Duration,
) -> Result<RelayConnection> {
    connect_inner(addr, password, room, Some(timeout)).await
}

async fn connect_inner(
    addr: &str,
    password: &str,
    room: &str,
    timeout: Option<Duration>,
) -> Result<RelayConnection> {
    let max_frame = RelayConfig::default().max_frame;
    let mut comm = Comm::connect(addr, timeout, max_frame).await?;

    let (initiator, a1) = pake::Initiator::start(PakeCurve::default(), pake::WEAK_KEY);
    comm.send(&a1).await?;
    let b1 = comm.receive().await?;
    let (secret, confirm) = initiator.finish(&b1)?;
    comm.send(&confirm).await?;

    let salt = cipher::generate_salt();
    let key = SealKey::derive(&secret, &salt)?;
    comm.send(&salt).await?;

    comm.send(&key.seal(password.as_bytes())?).await?;
    let reply = key.open(&comm.receive().await?)?;
    if reply != wire::OK {
        return Err(RelayError::AuthFailed);
    }

    comm.send(&key.seal(room.as_bytes())?).await?;
    let status = key.open(&comm.receive().await?)?;
    let role = match status.as_slice() {
        wire::ROLE_HOST => PeerRole::Host,
        wire::ROLE_CLIENT => {
            wait_for_passthrough(&mut comm).await?;
            PeerRole::Client
        }
        wire::ROLE_FULL => return Err(RelayError::RoomFull),
        other => {
            return Err(RelayError::protocol(format!(
                "unexpected room status {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    };
    Ok(RelayConnection { comm, role })
}

/// Waits for the relay's plaintext pass-through marker. Keepalive sentinels
/// that slip in ahead of it are skipped.
async fn wait_for_passthrough(comm: &mut Comm) -> Result<()> {
    loop {
        let frame = comm.receive().await?;
        if frame.as_ref() == wire::KEEPALIVE {
            continue;
        }
        if frame.as_ref() == wire::OK {
            return Ok(());
        }
        return Err(RelayError::protocol(
            "expected the pass-through marker from the relay",
        ));
    }
}
