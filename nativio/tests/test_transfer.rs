use std::time::Duration;

use nativio::{
  ErrorClass,
  test_utils::{tcp_pair, udp_pair, wait_for},
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_recv_empty_socket_retries() {
  let (_client, server) = tcp_pair();
  let mut buf = [0u8; 128];
  let err = server.recv(&mut buf).unwrap_err();
  assert_eq!(err.class(), ErrorClass::Retry);

  let (_sender, receiver, _) = udp_pair();
  let err = receiver.recv(&mut buf).unwrap_err();
  assert_eq!(err.class(), ErrorClass::Retry);
}

#[test]
fn test_udp_empty_datagram_is_not_a_disconnect() {
  let (sender, receiver, addr) = udp_pair();
  assert_eq!(sender.send_to(&[], &addr).unwrap(), 0);
  sender.send_to(b"after", &addr).unwrap();

  let mut buf = [0u8; 64];
  let n = wait_for(TIMEOUT, || match receiver.recv(&mut buf) {
    Err(err) if err.is_retry() => None,
    other => Some(other),
  })
  .unwrap()
  .unwrap();
  assert_eq!(n, 0);

  let n = wait_for(TIMEOUT, || receiver.recv(&mut buf).ok()).unwrap();
  assert_eq!(&buf[..n], b"after");
}

#[test]
fn test_tcp_round_trip() {
  let (client, server) = tcp_pair();
  let payload: Vec<u8> = (0..4096).map(|_| fastrand::u8(..)).collect();

  let mut sent = 0;
  while sent < payload.len() {
    sent += client.send(&payload[sent..]).unwrap();
  }

  let mut received = Vec::with_capacity(payload.len());
  let mut buf = [0u8; 1024];
  wait_for(TIMEOUT, || {
    match server.recv(&mut buf) {
      Ok(n) => received.extend_from_slice(&buf[..n]),
      Err(err) => assert!(err.is_retry(), "{err}"),
    }
    (received.len() == payload.len()).then_some(())
  })
  .expect("payload did not arrive");
  assert_eq!(received, payload);
}

#[test]
fn test_recv_after_orderly_close_is_peer_disconnect() {
  let (client, server) = tcp_pair();
  client.send(b"bye").unwrap();
  client.close().unwrap();

  let mut buf = [0u8; 16];
  let n = wait_for(TIMEOUT, || server.recv(&mut buf).ok()).unwrap();
  assert_eq!(&buf[..n], b"bye");

  let err = wait_for(TIMEOUT, || match server.recv(&mut buf) {
    Err(err) if err.is_retry() => None,
    other => Some(other),
  })
  .unwrap()
  .unwrap_err();
  assert_eq!(err.class(), ErrorClass::PeerDisconnect);
}

#[test]
fn test_send_after_reset_is_disconnect() {
  let (client, server) = tcp_pair();
  client.configure_no_linger().unwrap();
  drop(client);

  let err = wait_for(TIMEOUT, || server.send(b"ping").err()).unwrap();
  assert!(err.is_disconnect(), "{err}");
}

#[test]
fn test_is_dead_follows_connection() {
  let (client, server) = tcp_pair();
  assert!(!server.is_dead());
  assert!(!client.is_dead());

  drop(client);
  assert!(
    wait_for(TIMEOUT, || server.is_dead().then_some(())).is_some(),
    "closed peer never reported dead"
  );
}

#[test]
fn test_udp_thousand_datagrams() {
  const TOTAL: u32 = 1000;
  const BURST: u32 = 50;

  let (sender, receiver, addr) = udp_pair();
  let mut buf = [0u8; 128];
  let mut next = 0u32;

  for burst in (0..TOTAL).step_by(BURST as usize) {
    for seq in burst..burst + BURST {
      let mut datagram = [0u8; 64];
      datagram[..4].copy_from_slice(&seq.to_le_bytes());
      assert_eq!(sender.send_to(&datagram, &addr).unwrap(), 64);
    }
    wait_for(TIMEOUT, || {
      match receiver.recv(&mut buf) {
        Ok(n) => {
          assert_eq!(n, 64);
          assert_eq!(u32::from_le_bytes(buf[..4].try_into().unwrap()), next);
          next += 1;
        }
        Err(err) => assert!(err.is_retry(), "{err}"),
      }
      (next == burst + BURST).then_some(())
    })
    .expect("burst did not arrive");
  }

  assert_eq!(next, TOTAL);
  assert!(receiver.recv(&mut buf).unwrap_err().is_retry());
}
