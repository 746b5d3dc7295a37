use std::time::Duration;

use nativio::{
  ErrorClass, SockAddr,
  net::{Connect, Socket},
  test_utils::{LOCALHOST, tcp_listener, tcp_pair, wait_for},
};

#[test]
fn test_connect_non_blocking_is_pending_not_failed() {
  let (listener, addr) = tcp_listener();
  let client = Socket::tcp(false).unwrap();

  let first = client.connect(&addr).unwrap();
  assert!(matches!(first, Connect::InProgress | Connect::Established));

  let established = wait_for(Duration::from_secs(5), || {
    match client.connect(&addr).unwrap() {
      Connect::Established => Some(()),
      Connect::InProgress => None,
    }
  });
  assert!(established.is_some(), "handshake never completed");

  let conn = listener.accept().unwrap();
  assert_eq!(
    conn.peer_port().unwrap(),
    client.local_addr().unwrap().port().unwrap()
  );
}

#[test]
fn test_connect_refused_is_other_disconnect() {
  // Bound but not listening: the port stays ours and every SYN is reset.
  let closed = Socket::tcp(true).unwrap();
  closed.bind(LOCALHOST, 0).unwrap();
  let addr = closed.local_addr().unwrap();

  let client = Socket::tcp(true).unwrap();
  let err = client.connect(&addr).unwrap_err();
  assert_eq!(err.errno(), libc::ECONNREFUSED);
  assert_eq!(err.class(), ErrorClass::OtherDisconnect);
}

#[test]
fn test_connect_peer_identity() {
  let (client, server) = tcp_pair();

  assert_eq!(client.peer_ip().unwrap(), LOCALHOST);
  assert_eq!(server.peer_ip().unwrap(), LOCALHOST);
  assert_eq!(
    server.peer_port().unwrap(),
    client.local_addr().unwrap().port().unwrap()
  );
  assert_eq!(
    client.peer_port().unwrap(),
    server.local_addr().unwrap().port().unwrap()
  );
}

#[test]
fn test_connect_ipv4_mapped_address_on_ipv4_socket_fails() {
  let (_listener, addr) = tcp_listener();
  let port = addr.port().unwrap();
  let mapped = SockAddr::new(libc::AF_INET6, LOCALHOST, port).unwrap();

  let client = Socket::tcp(true).unwrap();
  let err = client.connect(&mapped).unwrap_err();
  assert!(err.is_disconnect());
}

#[cfg(feature = "ffi")]
#[test]
fn test_connect_ffi_returns_raw_sentinels() {
  use nativio::ffi::*;

  let (_listener, addr) = tcp_listener();
  let fd = nativio_socket_tcp(false);
  let sockaddr = nativio_sockaddr(LOCALHOST, addr.port().unwrap() as libc::c_int);
  assert!(!sockaddr.is_null());

  let first = nativio_connect(fd, sockaddr);
  assert!(
    first == 0 || first == -nativio_einprogress(),
    "unexpected connect result {first}"
  );

  let settled = wait_for(Duration::from_secs(5), || {
    let res = nativio_connect(fd, sockaddr);
    (res != -nativio_ealready() && res != -nativio_einprogress()).then_some(res)
  })
  .unwrap();
  // Connected sockets answer a repeated connect with EISCONN.
  assert!(settled == 0 || settled == -libc::EISCONN, "{settled}");

  assert_eq!(nativio_connect(fd, std::ptr::null()), -libc::EINVAL);
  nativio_free_sockaddr(sockaddr);
  assert_eq!(nativio_close(fd), 0);
}
