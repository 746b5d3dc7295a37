// Kept alone in its own binary: a closed descriptor number must not be
// reused by a concurrently running test before the check.
#![cfg(feature = "ffi")]

use std::os::fd::IntoRawFd;

use nativio::{ffi::*, test_utils::tcp_pair};

#[test]
fn test_is_dead_after_close() {
  let (_client, server) = tcp_pair();
  let fd = server.into_raw_fd() as libc::intptr_t;
  assert!(!nativio_is_dead(fd));

  assert_eq!(nativio_close(fd), 0);
  assert!(nativio_is_dead(fd));
}
