//! Server side of the setup exchange.
//!
//! Two stages, every step all-or-nothing: `authenticate` runs the PAKE and
//! checks the relay password, producing the connection's sealing key;
//! `assign_room` then reads the requested room name, tears the setup framing
//! down to raw socket halves, and lets the registry decide the role.

use tokio_util::codec::FramedWrite;
use tracing::debug;

use crate::comm::Comm;
use crate::config::RelayConfig;
use crate::crypto::{pake, SealKey};
use crate::error::{RelayError, Result};
use crate::relay::registry::{Assignment, Halves, RoleTokens, RoomRegistry};
use crate::wire;

/// Runs the PAKE and password check for one accepted connection.
///
/// On a password mismatch a sealed error frame is sent best-effort before
/// the socket closes; the caller sees `AuthFailed`.
pub(crate) async fn authenticate(
    comm: &mut Comm,
    password: &str,
    config: &RelayConfig,
) -> Result<SealKey> {
    let (responder, b1) = pake::Responder::start(config.pake_curve, pake::WEAK_KEY);
    let a1 = comm.receive().await?;
    comm.send(&b1).await?;
    let pending = responder.finish(&a1)?;
    let confirm = comm.receive().await?;
    let secret = pending.confirm(&confirm)?;

    let salt = comm.receive().await?;
    let key = SealKey::derive(&secret, &salt)?;

    let offered = key.open(&comm.receive().await?)?;
    let offered = String::from_utf8_lossy(&offered);
    if offered.trim() != password.trim() {
        if let Ok(frame) = key.seal(wire::BAD_PASSWORD) {
            let _ = comm.send(&frame).await;
        }
        comm.close().await;
        return Err(RelayError::AuthFailed);
    }
    comm.send(&key.seal(wire::OK)?).await?;
    Ok(key)
}

/// Reads the room request and assigns the connection a role.
///
/// The framing is dismantled before the registry call; the codec's buffered
/// remainder travels with the read half so no early peer bytes are lost.
pub(crate) async fn assign_room(
    mut comm: Comm,
    key: &SealKey,
    registry: &RoomRegistry,
    config: &RelayConfig,
) -> Result<(String, Assignment)> {
    let name = key.open(&comm.receive().await?)?;
    let name = String::from_utf8(name)
        .map_err(|_| RelayError::protocol("room name is not valid UTF-8"))?;
    if name.is_empty() {
        return Err(RelayError::protocol("room name is empty"));
    }
    debug!(room = %name, "room requested");

    let tokens = RoleTokens {
        host: key.seal(wire::ROLE_HOST)?,
        client: key.seal(wire::ROLE_CLIENT)?,
        full: key.seal(wire::ROLE_FULL)?,
    };

    let (stream, leftover) = comm.into_socket();
    let (read, write) = stream.into_split();
    let conn = Halves {
        writer: FramedWrite::new(write, crate::comm::frame_codec(config.max_frame)),
        read,
        leftover,
    };
    let assignment = registry
        .assign(&name, conn, tokens, config.recv_buffer)
        .await?;
    Ok((name, assignment))
}
