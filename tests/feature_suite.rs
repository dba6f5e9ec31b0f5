use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::timeout;

use staple::comm::Comm;
use staple::crypto::{generate_salt, pake, SealKey};
use staple::e2e_common::{fast_config, join, spawn_relay};
use staple::{wire, PeerRole, RelayConfig, RelayError};

/// Runs the documented setup exchange by hand over a bare frame transport,
/// returning the connection pre-role: the raw tap the high-level connector
/// never exposes.
async fn raw_handshake(addr: SocketAddr, password: &str, room: &str) -> (Comm, Vec<u8>) {
    let mut comm = Comm::connect(&addr.to_string(), None, 8 * 1024 * 1024)
        .await
        .unwrap();
    let (initiator, a1) = pake::Initiator::start(Default::default(), pake::WEAK_KEY);
    comm.send(&a1).await.unwrap();
    let b1 = comm.receive().await.unwrap();
    let (secret, confirm) = initiator.finish(&b1).unwrap();
    comm.send(&confirm).await.unwrap();

    let salt = generate_salt();
    let key = SealKey::derive(&secret, &salt).unwrap();
    comm.send(&salt).await.unwrap();
    comm.send(&key.seal(password.as_bytes()).unwrap())
        .await
        .unwrap();
    let reply = key.open(&comm.receive().await.unwrap()).unwrap();
    assert_eq!(reply, wire::OK);

    comm.send(&key.seal(room.as_bytes()).unwrap()).await.unwrap();
    let status = key.open(&comm.receive().await.unwrap()).unwrap();
    (comm, status)
}

#[tokio::test]
async fn echo_round_trip_through_a_room() {
    let addr = spawn_relay("", fast_config()).await.unwrap();

    let mut host = join(addr, "", "admin").await.unwrap();
    assert_eq!(host.role(), PeerRole::Host);
    let echo = tokio::spawn(async move {
        while let Ok(frame) = host.receive().await {
            if host.send(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut client = join(addr, "", "admin").await.unwrap();
    assert_eq!(client.role(), PeerRole::Client);
    client.send(b"hello").await.unwrap();
    let reply = timeout(Duration::from_secs(5), client.receive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.as_ref(), b"hello");

    client.close().await;
    echo.abort();
}

#[tokio::test]
async fn large_frames_survive_passthrough() {
    let addr = spawn_relay("", fast_config()).await.unwrap();

    let mut host = join(addr, "", "bulk").await.unwrap();
    let echo = tokio::spawn(async move {
        while let Ok(frame) = host.receive().await {
            if host.send(&frame).await.is_err() {
                break;
            }
        }
    });

    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let mut client = join(addr, "", "bulk").await.unwrap();
    client.send(&payload).await.unwrap();
    let reply = timeout(Duration::from_secs(5), client.receive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.as_ref(), payload.as_slice());
    echo.abort();
}

#[tokio::test]
async fn keepalive_is_on_the_wire_but_never_surfaced() {
    let addr = spawn_relay("", fast_config()).await.unwrap();

    // Raw tap: a hand-rolled host sees the sentinel frame itself.
    let (mut raw, status) = raw_handshake(addr, "", "tapped").await;
    assert_eq!(status, wire::ROLE_HOST);
    let frame = timeout(Duration::from_secs(2), raw.receive())
        .await
        .expect("keepalive within the ping interval")
        .unwrap();
    assert_eq!(frame.as_ref(), wire::KEEPALIVE);

    // High-level handle: sentinels flow underneath but receive() stays
    // silent until a real peer frame exists.
    let mut host = join(addr, "", "quiet").await.unwrap();
    let surfaced = timeout(Duration::from_millis(500), host.receive()).await;
    assert!(surfaced.is_err(), "receive surfaced a keepalive sentinel");
}

#[tokio::test]
async fn room_is_reusable_after_the_client_leaves() {
    let addr = spawn_relay("", fast_config()).await.unwrap();

    let mut host = join(addr, "", "admin").await.unwrap();
    let echo = tokio::spawn(async move {
        while let Ok(frame) = host.receive().await {
            if host.send(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut client = join(addr, "", "admin").await.unwrap();
    client.send(b"hello").await.unwrap();
    assert_eq!(client.receive().await.unwrap().as_ref(), b"hello");
    client.close().await;

    // Give the relay a moment to notice the EOF and release the seat.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut next = join(addr, "", "admin").await.unwrap();
    assert_eq!(next.role(), PeerRole::Client);
    next.send(b"hello").await.unwrap();
    let reply = timeout(Duration::from_secs(5), next.receive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.as_ref(), b"hello");
    echo.abort();
}

#[tokio::test]
async fn third_party_is_told_the_room_is_full() {
    let addr = spawn_relay("", fast_config()).await.unwrap();
    let _host = join(addr, "", "admin").await.unwrap();
    let _client = join(addr, "", "admin").await.unwrap();

    let third = join(addr, "", "admin").await;
    assert!(matches!(third, Err(RelayError::RoomFull)));
}

#[tokio::test]
async fn simultaneous_second_joiners_get_one_seat() {
    let addr = spawn_relay("", fast_config()).await.unwrap();
    let _host = join(addr, "", "race").await.unwrap();

    let a = tokio::spawn(async move { join(addr, "", "race").await });
    let b = tokio::spawn(async move { join(addr, "", "race").await });
    let results = [a.await.unwrap(), b.await.unwrap()];

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(RelayError::RoomFull)))
        .count();
    assert_eq!((admitted, rejected), (1, 1));
}

#[tokio::test]
async fn wrong_password_is_rejected_before_any_room_state() {
    let addr = spawn_relay("secret", fast_config()).await.unwrap();

    let denied = join(addr, "", "admin").await;
    assert!(matches!(denied, Err(RelayError::AuthFailed)));

    // The failed attempt must not have claimed the room name.
    let host = join(addr, "secret", "admin").await.unwrap();
    assert_eq!(host.role(), PeerRole::Host);
}

#[tokio::test]
async fn password_comparison_ignores_surrounding_whitespace() {
    let addr = spawn_relay("secret", fast_config()).await.unwrap();
    let host = join(addr, " secret\n", "padded").await.unwrap();
    assert_eq!(host.role(), PeerRole::Host);
}

#[tokio::test]
async fn dead_host_frees_the_room_name() {
    let addr = spawn_relay("", fast_config()).await.unwrap();

    let host = join(addr, "", "admin").await.unwrap();
    drop(host); // hard drop, no graceful close

    // The keepalive loop notices within a couple of ping intervals.
    tokio::time::sleep(Duration::from_millis(800)).await;

    let successor = join(addr, "", "admin").await.unwrap();
    assert_eq!(successor.role(), PeerRole::Host);
}

#[tokio::test]
async fn reaper_collects_rooms_past_their_age_limit() {
    let config = RelayConfig {
        ping_interval: Duration::from_millis(100),
        reap_interval: Duration::from_millis(200),
        max_room_age: Duration::from_millis(300),
        ..RelayConfig::default()
    };
    let addr = spawn_relay("", config).await.unwrap();

    let _stale = join(addr, "", "admin").await.unwrap();
    tokio::time::sleep(Duration::from_millis(900)).await;

    // The reaped name is claimable again.
    let fresh = join(addr, "", "admin").await.unwrap();
    assert_eq!(fresh.role(), PeerRole::Host);
}
