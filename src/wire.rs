//! Byte tokens exchanged during connection setup.
//!
//! Role tokens and the password acknowledgement travel sealed under the
//! setup cipher; the pass-through marker and the keepalive sentinel are the
//! two plaintext frames of the protocol.

/// Keepalive sentinel framed and sent to a waiting host. The client library
/// filters these out of `receive()`.
pub const KEEPALIVE: &[u8] = &[0x01];

/// Password acknowledgement (sealed) and pass-through marker (plaintext).
pub const OK: &[u8] = b"ok";

/// Role token: the connection created the room and now waits for a peer.
pub const ROLE_HOST: &[u8] = b"host";

/// Role token: the connection joined a waiting host.
pub const ROLE_CLIENT: &[u8] = b"client";

/// Role token: the room already has both parties.
pub const ROLE_FULL: &[u8] = b"full";

/// Best-effort reply sent before closing on a password mismatch.
pub const BAD_PASSWORD: &[u8] = b"bad password";
