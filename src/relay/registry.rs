//! Room registry: the relay's only shared mutable state.
//!
//! One async mutex guards the whole map. It is never held across a network
//! operation, with two deliberate exceptions that are each a single tiny
//! framed send: the keepalive to a waiting host, and the role token at
//! assignment time (so a role token can never be overtaken on the wire by
//! the pass-through marker of a session that starts immediately after).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures::SinkExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};
use tracing::debug;

use crate::error::Result;
use crate::relay::piper;

pub(crate) type FrameSink = FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>;

/// Both halves of a connection after the setup framing is torn down.
pub(crate) struct Halves {
    pub writer: FrameSink,
    pub read: OwnedReadHalf,
    /// Bytes the setup codec buffered past the last consumed frame.
    pub leftover: BytesMut,
}

/// Host side of a room: framed write half plus the long-lived reader
/// channel created once at room creation.
pub(crate) struct HostSide {
    pub writer: FrameSink,
    pub inbound: mpsc::Receiver<Bytes>,
}

/// Client side of a room; its reader is created per session by the pipe.
pub(crate) struct ClientSide {
    pub writer: FrameSink,
    pub read: OwnedReadHalf,
    pub leftover: BytesMut,
}

/// Pre-sealed role tokens, one of which is sent inside the assignment
/// critical section.
pub(crate) struct RoleTokens {
    pub host: Vec<u8>,
    pub client: Vec<u8>,
    pub full: Vec<u8>,
}

/// Outcome of an assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assignment {
    Host,
    Client,
    Full,
}

struct Room {
    /// `None` only while the host's wait loop has the session checked out.
    host: Option<HostSide>,
    client: Option<ClientSide>,
    opened_at: Instant,
    full: bool,
}

/// One step of a waiting host's loop.
pub(crate) enum WaitStep {
    /// Room no longer exists.
    Gone,
    /// The keepalive could not be delivered; the room has been removed.
    HostLost,
    /// Still waiting; keepalive delivered.
    Idle,
    /// Both sides present; session checked out for piping.
    Session(SessionParts),
}

pub(crate) struct SessionParts {
    pub host: HostSide,
    pub client: ClientSide,
}

pub(crate) struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub(crate) fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Test-and-assign under one critical section.
    ///
    /// An absent room makes the caller its host: the record is inserted with
    /// a reader channel spawned over the connection's read half, exactly
    /// once for the room's lifetime. A waiting room takes the caller as
    /// client. A full room rejects. The matching role token is sent before
    /// the record is touched, so a failed send leaves no partial state.
    pub(crate) async fn assign(
        &self,
        name: &str,
        mut conn: Halves,
        tokens: RoleTokens,
        recv_buffer: usize,
    ) -> Result<Assignment> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(name) {
            None => {
                conn.writer.send(Bytes::from(tokens.host)).await?;
                let inbound = piper::spawn_reader(conn.read, conn.leftover, recv_buffer);
                rooms.insert(
                    name.to_owned(),
                    Room {
                        host: Some(HostSide {
                            writer: conn.writer,
                            inbound,
                        }),
                        client: None,
                        opened_at: Instant::now(),
                        full: false,
                    },
                );
                debug!(room = %name, "room created, caller is host");
                Ok(Assignment::Host)
            }
            Some(room) if room.full => {
                conn.writer.send(Bytes::from(tokens.full)).await?;
                Ok(Assignment::Full)
            }
            Some(room) => {
                conn.writer.send(Bytes::from(tokens.client)).await?;
                room.client = Some(ClientSide {
                    writer: conn.writer,
                    read: conn.read,
                    leftover: conn.leftover,
                });
                room.full = true;
                debug!(room = %name, "caller attached as client");
                Ok(Assignment::Client)
            }
        }
    }

    /// One round of the host wait loop: check out a ready session, or ping
    /// the waiting host, removing the room when the ping cannot be sent.
    pub(crate) async fn poll(&self, name: &str, keepalive: &'static [u8]) -> WaitStep {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(name) else {
            return WaitStep::Gone;
        };
        if room.full && room.client.is_some() && room.host.is_some() {
            let host = room.host.take().expect("host presence just checked");
            let client = room.client.take().expect("client presence just checked");
            return WaitStep::Session(SessionParts { host, client });
        }
        match room.host.as_mut() {
            Some(host) => {
                if host.writer.send(Bytes::from_static(keepalive)).await.is_err() {
                    rooms.remove(name);
                    return WaitStep::HostLost;
                }
                WaitStep::Idle
            }
            None => WaitStep::Idle,
        }
    }

    /// Hands the host back after a session where the client left. The room
    /// reverts to waiting; if it was deleted mid-session the host side is
    /// simply dropped (closing the socket).
    pub(crate) async fn end_session(&self, name: &str, host: HostSide) {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get_mut(name) {
            room.host = Some(host);
            room.client = None;
            room.full = false;
        }
    }

    /// Removes the room; any attached halves close as they drop.
    pub(crate) async fn delete(&self, name: &str) {
        let removed = self.rooms.lock().await.remove(name);
        if removed.is_some() {
            debug!(room = %name, "room deleted");
        }
    }

    /// Names of rooms older than `max_age`.
    pub(crate) async fn stale(&self, max_age: Duration) -> Vec<String> {
        let rooms = self.rooms.lock().await;
        rooms
            .iter()
            .filter(|(_, room)| room.opened_at.elapsed() > max_age)
            .map(|(name, _)| name.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, name: &str) -> bool {
        self.rooms.lock().await.contains_key(name)
    }
}
