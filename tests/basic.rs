use std::time::{Duration, Instant};

use staple::e2e_common::{fast_config, join, spawn_relay};
use staple::{PeerRole, RelayError};

#[tokio::test]
async fn dial_failure_surfaces_as_network_error() {
    // Bind-and-drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = staple::connect(&addr.to_string(), "", "nobody").await;
    assert!(matches!(result, Err(RelayError::Network(_))));
}

#[tokio::test]
async fn connect_timeout_bounds_the_dial() {
    // Non-routable address; the dial should give up on its own timeout,
    // not hang for the OS default.
    let started = Instant::now();
    let result = staple::connect_timeout(
        "10.255.255.1:9",
        "",
        "nobody",
        Duration::from_millis(200),
    )
    .await;
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn first_joiner_hosts_and_second_becomes_client() {
    let addr = spawn_relay("", fast_config()).await.unwrap();
    let host = join(addr, "", "roles").await.unwrap();
    assert_eq!(host.role(), PeerRole::Host);
    let client = join(addr, "", "roles").await.unwrap();
    assert_eq!(client.role(), PeerRole::Client);
}

#[tokio::test]
async fn rooms_with_different_names_do_not_collide() {
    let addr = spawn_relay("", fast_config()).await.unwrap();
    let first = join(addr, "", "alpha").await.unwrap();
    let second = join(addr, "", "beta").await.unwrap();
    assert_eq!(first.role(), PeerRole::Host);
    assert_eq!(second.role(), PeerRole::Host);
}

#[tokio::test]
async fn empty_room_name_is_rejected() {
    let addr = spawn_relay("", fast_config()).await.unwrap();
    // The relay drops the connection during setup; the connector surfaces
    // the failure rather than handing out a handle.
    assert!(join(addr, "", "").await.is_err());
}
