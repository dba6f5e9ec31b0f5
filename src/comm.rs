//! Length-delimited frame transport over one TCP connection.
//!
//! Every setup step of the relay protocol is one frame: a u32 big-endian
//! length prefix followed by the payload. `Comm` owns the socket for the
//! framed phase; once a connection graduates to raw pass-through the relay
//! calls [`Comm::into_socket`] to recover the stream together with whatever
//! the codec had already buffered, so no early bytes are lost.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::{RelayError, Result};

/// Codec for the `[len: u32 big-endian][payload]` wire format.
pub(crate) fn frame_codec(max_frame: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame)
        .new_codec()
}

pub struct Comm {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl Comm {
    /// Wraps an already-established socket.
    pub fn from_stream(stream: TcpStream, max_frame: usize) -> Self {
        Self {
            framed: Framed::new(stream, frame_codec(max_frame)),
        }
    }

    /// Dials the relay. The timeout applies to the TCP dial only; once the
    /// connection is up there is no per-frame deadline.
    pub async fn connect(addr: &str, timeout: Option<Duration>, max_frame: usize) -> Result<Self> {
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| {
                    RelayError::Network(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connecting to {addr} timed out"),
                    ))
                })??,
            None => TcpStream::connect(addr).await?,
        };
        let _ = stream.set_nodelay(true);
        Ok(Self::from_stream(stream, max_frame))
    }

    /// Sends one frame.
    pub async fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.framed
            .send(Bytes::copy_from_slice(frame))
            .await
            .map_err(RelayError::from)
    }

    /// Receives one frame. A closed connection surfaces as a network error.
    pub async fn receive(&mut self) -> Result<Bytes> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame.freeze()),
            Some(Err(err)) => Err(err.into()),
            None => Err(RelayError::Network(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            ))),
        }
    }

    /// Best-effort shutdown of the underlying socket.
    pub async fn close(&mut self) {
        let _ = self.framed.get_mut().shutdown().await;
    }

    /// Tears down the framing, returning the raw socket and any bytes the
    /// codec read past the last consumed frame. Callers switching to raw
    /// pass-through must replay the remainder ahead of fresh socket reads.
    pub fn into_socket(self) -> (TcpStream, BytesMut) {
        let parts = self.framed.into_parts();
        (parts.io, parts.read_buf)
    }
}
