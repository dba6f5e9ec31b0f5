//! Shared helpers for end-to-end exercises of the relay.
//!
//! Used by the integration tests: bind a relay on an ephemeral port, run it
//! in the background, and join rooms through the public connector.

use std::net::SocketAddr;
use std::time::Duration;

use crate::client::{self, RelayConnection};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::relay::Relay;

/// A config with intervals short enough for tests to observe keepalives,
/// host-death detection, and reaping without multi-second sleeps.
pub fn fast_config() -> RelayConfig {
    RelayConfig {
        ping_interval: Duration::from_millis(100),
        reap_interval: Duration::from_millis(200),
        max_room_age: Duration::from_secs(3600),
        ..RelayConfig::default()
    }
}

/// Binds a relay on an ephemeral localhost port and serves it in the
/// background, returning the address to dial.
pub async fn spawn_relay(password: &str, config: RelayConfig) -> Result<SocketAddr> {
    let relay = Relay::bind("127.0.0.1:0", password, config).await?;
    let addr = relay.local_addr()?;
    tokio::spawn(async move {
        let _ = relay.serve().await;
    });
    Ok(addr)
}

/// Joins a room on a spawned relay.
pub async fn join(addr: SocketAddr, password: &str, room: &str) -> Result<RelayConnection> {
    client::connect(&addr.to_string(), password, room).await
}
