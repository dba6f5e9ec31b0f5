//! Rendezvous relay (staple) reference implementation.
//!
//! Two endpoints, each behind arbitrary NATs, dial the same relay port,
//! authenticate with a PAKE-derived setup cipher, and meet in a named room.
//! The first arrival hosts the room and is kept alive with sentinel pings;
//! when a second peer joins, the relay staples the two TCP streams together
//! and forwards bytes verbatim until one side disconnects. Rooms survive
//! departing clients and are garbage-collected when their host vanishes.

pub mod client;
pub mod comm;
pub mod config;
pub mod crypto;
pub mod e2e_common;
pub mod error;
pub mod relay;
pub mod wire;

pub use client::{connect, connect_timeout, PeerRole, RelayConnection};
pub use config::{PakeCurve, RelayConfig};
pub use error::{RelayError, Result};
pub use relay::Relay;
