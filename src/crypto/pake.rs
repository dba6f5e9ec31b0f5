//! Three-frame PAKE between a connecting peer and the relay.
//!
//! The initiator (connecting peer) sends its SPAKE2 start message, the
//! responder (relay) answers with its own, and the initiator closes the
//! exchange with a key-confirmation tag derived from the shared secret. The
//! weak password is a fixed constant on both sides: the exchange is there to
//! derive a per-connection secret for the setup cipher, not to gate access —
//! access control is the relay password sealed under that cipher afterwards.

use hkdf::Hkdf;
use sha2::Sha256;
use spake2::{Ed25519Group, Identity, Password, Spake2};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::PakeCurve;
use crate::error::{RelayError, Result};

/// Weak key both sides feed into the PAKE.
pub const WEAK_KEY: &[u8] = &[1, 2, 3];

/// Length of the confirmation tag closing the exchange.
pub const CONFIRM_LEN: usize = 32;

const INITIATOR_ID: &[u8] = b"staple-initiator";
const RESPONDER_ID: &[u8] = b"staple-responder";
const CONFIRM_INFO: &[u8] = b"staple pake confirm v1";

/// Shared secret produced by a completed exchange. Scrubbed on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn confirm_tag(secret: &[u8]) -> [u8; CONFIRM_LEN] {
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut tag = [0u8; CONFIRM_LEN];
    hk.expand(CONFIRM_INFO, &mut tag)
        .expect("confirm tag length is a valid HKDF output length");
    tag
}

/// Connecting-peer half of the exchange.
pub struct Initiator {
    state: Spake2<Ed25519Group>,
}

impl Initiator {
    /// Starts the exchange; the returned message is the first wire frame.
    pub fn start(curve: PakeCurve, weak_key: &[u8]) -> (Self, Vec<u8>) {
        let PakeCurve::Ed25519 = curve;
        let (state, msg) = Spake2::<Ed25519Group>::start_a(
            &Password::new(weak_key),
            &Identity::new(INITIATOR_ID),
            &Identity::new(RESPONDER_ID),
        );
        (Self { state }, msg)
    }

    /// Consumes the responder's message, yielding the shared secret and the
    /// confirmation tag to send as the closing frame.
    pub fn finish(self, responder_msg: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        let key = self
            .state
            .finish(responder_msg)
            .map_err(RelayError::internal)?;
        let tag = confirm_tag(&key).to_vec();
        Ok((SharedSecret(Zeroizing::new(key)), tag))
    }
}

/// Relay half of the exchange.
pub struct Responder {
    state: Spake2<Ed25519Group>,
}

impl Responder {
    /// Starts the responder; its message answers the initiator's first frame.
    pub fn start(curve: PakeCurve, weak_key: &[u8]) -> (Self, Vec<u8>) {
        let PakeCurve::Ed25519 = curve;
        let (state, msg) = Spake2::<Ed25519Group>::start_b(
            &Password::new(weak_key),
            &Identity::new(INITIATOR_ID),
            &Identity::new(RESPONDER_ID),
        );
        (Self { state }, msg)
    }

    /// Consumes the initiator's first frame; the exchange completes once the
    /// confirmation tag has been checked.
    pub fn finish(self, initiator_msg: &[u8]) -> Result<PendingConfirm> {
        let key = self
            .state
            .finish(initiator_msg)
            .map_err(RelayError::internal)?;
        let expected = confirm_tag(&key);
        Ok(PendingConfirm {
            secret: SharedSecret(Zeroizing::new(key)),
            expected,
        })
    }
}

/// Responder state awaiting the initiator's confirmation tag.
pub struct PendingConfirm {
    secret: SharedSecret,
    expected: [u8; CONFIRM_LEN],
}

impl PendingConfirm {
    pub fn confirm(self, tag: &[u8]) -> Result<SharedSecret> {
        if tag.len() != CONFIRM_LEN || !bool::from(tag.ct_eq(&self.expected)) {
            return Err(RelayError::protocol("key confirmation mismatch"));
        }
        Ok(self.secret)
    }
}
