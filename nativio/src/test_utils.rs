//! Helpers for integration tests: loopback socket pairs and polling with a
//! deadline.

use std::{
  thread,
  time::{Duration, Instant},
};

use crate::{
  addr::SockAddr,
  net::{Connect, Socket},
};

/// 127.0.0.1 in host order.
pub const LOCALHOST: u32 = 0x7f00_0001;

/// Blocking TCP listener on an ephemeral loopback port.
#[doc(hidden)]
pub fn tcp_listener() -> (Socket, SockAddr) {
  let listener = Socket::tcp(true).unwrap();
  listener.bind(LOCALHOST, 0).unwrap();
  listener.listen(128).unwrap();
  let addr = listener.local_addr().unwrap();
  (listener, addr)
}

/// Connected `(client, server)` pair, both non-blocking.
#[doc(hidden)]
pub fn tcp_pair() -> (Socket, Socket) {
  let (listener, addr) = tcp_listener();
  let client = Socket::tcp(true).unwrap();
  assert_eq!(client.connect(&addr).unwrap(), Connect::Established);
  let server = listener.accept().unwrap();
  client.configure_non_blocking().unwrap();
  (client, server)
}

/// Non-blocking `(sender, receiver, receiver address)` on loopback.
#[doc(hidden)]
pub fn udp_pair() -> (Socket, Socket, SockAddr) {
  let receiver = Socket::udp().unwrap();
  receiver.bind(LOCALHOST, 0).unwrap();
  let addr = receiver.local_addr().unwrap();
  let sender = Socket::udp().unwrap();
  (sender, receiver, addr)
}

/// Polls `f` until it returns `Some` or `timeout` passes.
#[doc(hidden)]
pub fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
  let deadline = Instant::now() + timeout;
  loop {
    if let Some(value) = f() {
      return Some(value);
    }
    if Instant::now() >= deadline {
      return None;
    }
    thread::sleep(Duration::from_millis(1));
  }
}
