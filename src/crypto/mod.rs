//! Cryptographic building blocks for the relay setup exchange.
//!
//! Two primitives live here: the password-authenticated key exchange that
//! gives each connection a shared secret with the relay, and the salt-derived
//! AEAD used to seal every subsequent setup frame. Session material is scoped
//! to one connection and scrubbed on drop; nothing here is stored in the
//! room registry.

pub mod cipher;
pub mod pake;

pub use cipher::{generate_salt, SealKey, NONCE_LEN, SALT_LEN};
pub use pake::{Initiator, Responder, SharedSecret, WEAK_KEY};
