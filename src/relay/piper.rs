//! Socket reader channels and the full-duplex pipe.
//!
//! Each attached socket gets one reader task pushing raw chunks into a
//! bounded channel; the pipe consumes the host's long-lived channel and a
//! per-session client channel, forwarding chunks verbatim until one side
//! ends. The host channel outlives the session: it is created when the room
//! is, and handed back to the room record when a client leaves.

use bytes::{Bytes, BytesMut};
use futures::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tracing::debug;

use crate::relay::registry::{ClientSide, HostSide};
use crate::wire;

/// How one piping session ended, which decides the room's fate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// Host EOF or a write failure on either leg: the room dies.
    Terminated,
    /// Client EOF: the room stays and can take a fresh client.
    ClientLeft,
}

/// Spawns a reader task over a socket read half, yielding raw chunks.
///
/// `leftover` is whatever the setup codec read past the last consumed frame;
/// it is replayed before the first socket read so early peer bytes survive
/// the switch to pass-through. The channel closes on EOF or read error.
pub(crate) fn spawn_reader(
    mut read: OwnedReadHalf,
    leftover: BytesMut,
    chunk_size: usize,
) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if !leftover.is_empty() && tx.send(leftover.freeze()).await.is_err() {
            return;
        }
        let mut buf = vec![0u8; chunk_size];
        loop {
            match read.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    debug!("reader stopped: {err}");
                    break;
                }
            }
        }
    });
    rx
}

/// Staples the two attached sockets together until one side ends.
///
/// The plaintext pass-through marker goes to the client first; from then on
/// neither direction is framed or inspected by the relay.
pub(crate) async fn pipe(host: &mut HostSide, client: ClientSide, chunk_size: usize) -> SessionEnd {
    let ClientSide {
        mut writer,
        read,
        leftover,
    } = client;

    if writer.send(Bytes::from_static(wire::OK)).await.is_err() {
        return SessionEnd::Terminated;
    }
    let mut client_rx = spawn_reader(read, leftover, chunk_size);

    loop {
        tokio::select! {
            chunk = host.inbound.recv() => match chunk {
                Some(data) => {
                    if writer.get_mut().write_all(&data).await.is_err() {
                        return SessionEnd::Terminated;
                    }
                }
                None => return SessionEnd::Terminated,
            },
            chunk = client_rx.recv() => match chunk {
                Some(data) => {
                    if host.writer.get_mut().write_all(&data).await.is_err() {
                        return SessionEnd::Terminated;
                    }
                }
                None => return SessionEnd::ClientLeft,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dial = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (accepted, _) = listener.accept().await.unwrap();
        (accepted, dial.await.unwrap())
    }

    #[tokio::test]
    async fn leftover_bytes_are_replayed_before_socket_reads() {
        let (near, mut far) = tcp_pair().await;
        let (read, _write) = near.into_split();
        let mut rx = spawn_reader(read, BytesMut::from(&b"early"[..]), 1024);
        assert_eq!(rx.recv().await.unwrap().as_ref(), b"early");

        far.write_all(b"later").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_ref(), b"later");
    }

    #[tokio::test]
    async fn channel_closes_on_peer_eof() {
        let (near, far) = tcp_pair().await;
        let (read, _write) = near.into_split();
        let mut rx = spawn_reader(read, BytesMut::new(), 1024);
        drop(far);
        assert!(rx.recv().await.is_none());
    }
}
