//! Classification of socket failures.
//!
//! Callers above this layer do not care which errno a syscall failed with.
//! They care whether to try again later, whether the peer went away, or
//! whether the connection is lost for some other reason. [`ErrorClass`]
//! is that decision; [`NetError`] carries it together with the errno for
//! logging.
//!
//! Across the C ABI the classes travel as the fixed codes [`ERETRY`],
//! [`EPEERDISCONNECT`] and [`EOTHERDISCONNECT`]. `ERETRY` is `0`: a
//! transfer that moved nothing and should be retried reads the same as a
//! transfer of zero bytes.
//!
//! Which errno lands in which class is platform specific. The mapping lives
//! in two tables, [`COMMON_CLASSIFICATION`] and
//! [`PLATFORM_CLASSIFICATION`]; anything not listed is
//! [`ErrorClass::OtherDisconnect`].

use std::{fmt, io};

/// Transfer result code: nothing happened, try again later.
pub const ERETRY: i32 = 0;
/// Transfer result code: the peer closed or reset the connection.
pub const EPEERDISCONNECT: i32 = -1;
/// Transfer result code: the connection is lost for another reason.
pub const EOTHERDISCONNECT: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
  /// Not a failure. The operation could not make progress right now.
  Retry,
  /// The remote end closed the connection, orderly or by reset.
  PeerDisconnect,
  /// Any other fatal socket failure.
  OtherDisconnect,
}

/// Mapping shared by every unix target.
pub const COMMON_CLASSIFICATION: &[(i32, ErrorClass)] = &[
  (libc::EAGAIN, ErrorClass::Retry),
  (libc::EWOULDBLOCK, ErrorClass::Retry),
  (libc::EINTR, ErrorClass::Retry),
  (libc::ENOBUFS, ErrorClass::Retry),
  (libc::ECONNRESET, ErrorClass::PeerDisconnect),
  (libc::ECONNABORTED, ErrorClass::PeerDisconnect),
];

/// Target specific additions, consulted after [`COMMON_CLASSIFICATION`].
#[cfg(linux)]
pub const PLATFORM_CLASSIFICATION: &[(i32, ErrorClass)] = &[
  // Kernel memory pressure on a datagram send; the queue drains.
  (libc::ENOMEM, ErrorClass::Retry),
];

/// Target specific additions, consulted after [`COMMON_CLASSIFICATION`].
///
/// Darwin reports `EPROTOTYPE` from `send` while a socket is being torn
/// down; it clears on the next attempt.
#[cfg(apple)]
pub const PLATFORM_CLASSIFICATION: &[(i32, ErrorClass)] =
  &[(libc::EPROTOTYPE, ErrorClass::Retry)];

/// Target specific additions, consulted after [`COMMON_CLASSIFICATION`].
#[cfg(not(any(linux, apple)))]
pub const PLATFORM_CLASSIFICATION: &[(i32, ErrorClass)] = &[];

impl ErrorClass {
  /// Looks `errno` up in the classification tables.
  pub fn classify(errno: i32) -> ErrorClass {
    COMMON_CLASSIFICATION
      .iter()
      .chain(PLATFORM_CLASSIFICATION)
      .find(|(code, _)| *code == errno)
      .map(|(_, class)| *class)
      .unwrap_or(ErrorClass::OtherDisconnect)
  }

  /// The C ABI code of this class.
  pub const fn code(self) -> i32 {
    match self {
      ErrorClass::Retry => ERETRY,
      ErrorClass::PeerDisconnect => EPEERDISCONNECT,
      ErrorClass::OtherDisconnect => EOTHERDISCONNECT,
    }
  }
}

impl fmt::Display for ErrorClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ErrorClass::Retry => "retry",
      ErrorClass::PeerDisconnect => "peer disconnected",
      ErrorClass::OtherDisconnect => "disconnected",
    })
  }
}

/// A classified socket failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetError {
  class: ErrorClass,
  /// `0` when no syscall failed (orderly close seen as a zero-byte read).
  errno: i32,
}

pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
  pub fn from_errno(errno: i32) -> NetError {
    NetError { class: ErrorClass::classify(errno), errno }
  }

  pub fn last_os_error() -> NetError {
    NetError::from_errno(errno())
  }

  /// The peer shut its side down; `recv` returned 0.
  pub const fn peer_closed() -> NetError {
    NetError { class: ErrorClass::PeerDisconnect, errno: 0 }
  }

  pub fn class(&self) -> ErrorClass {
    self.class
  }

  pub fn errno(&self) -> i32 {
    self.errno
  }

  pub fn code(&self) -> i32 {
    self.class.code()
  }

  pub fn is_retry(&self) -> bool {
    self.class == ErrorClass::Retry
  }

  pub fn is_disconnect(&self) -> bool {
    !self.is_retry()
  }
}

impl fmt::Display for NetError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.errno == 0 {
      write!(f, "{}: connection closed by peer", self.class)
    } else {
      write!(f, "{}: {}", self.class, io::Error::from_raw_os_error(self.errno))
    }
  }
}

impl std::error::Error for NetError {}

impl From<io::Error> for NetError {
  fn from(err: io::Error) -> NetError {
    match err.raw_os_error() {
      Some(errno) => NetError::from_errno(errno),
      None => NetError::from_errno(match err.kind() {
        io::ErrorKind::WouldBlock => libc::EWOULDBLOCK,
        io::ErrorKind::Interrupted => libc::EINTR,
        io::ErrorKind::InvalidInput => libc::EINVAL,
        _ => libc::EIO,
      }),
    }
  }
}

impl From<NetError> for io::Error {
  fn from(err: NetError) -> io::Error {
    if err.errno == 0 {
      io::Error::new(io::ErrorKind::UnexpectedEof, err)
    } else {
      io::Error::from_raw_os_error(err.errno)
    }
  }
}

/// The platform's "would block" errno.
pub const fn would_block() -> i32 {
  libc::EWOULDBLOCK
}

/// The platform's "in progress" errno, reported by a non-blocking connect.
pub const fn in_progress() -> i32 {
  libc::EINPROGRESS
}

/// The platform's "already in progress" errno.
pub const fn already() -> i32 {
  libc::EALREADY
}

/// The calling thread's last OS error number.
pub fn errno() -> i32 {
  io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_are_fixed() {
    assert_eq!(ErrorClass::Retry.code(), 0);
    assert_eq!(ErrorClass::PeerDisconnect.code(), -1);
    assert_eq!(ErrorClass::OtherDisconnect.code(), -2);
  }

  #[test]
  fn transient_conditions_retry() {
    for errno in [libc::EAGAIN, libc::EWOULDBLOCK, libc::EINTR, libc::ENOBUFS] {
      assert_eq!(ErrorClass::classify(errno), ErrorClass::Retry, "{errno}");
    }
  }

  #[test]
  fn resets_are_peer_disconnects() {
    assert_eq!(
      ErrorClass::classify(libc::ECONNRESET),
      ErrorClass::PeerDisconnect
    );
  }

  #[test]
  fn unlisted_errnos_are_other_disconnects() {
    for errno in [libc::EPIPE, libc::ENETUNREACH, libc::EBADF, libc::EINVAL] {
      assert_eq!(
        ErrorClass::classify(errno),
        ErrorClass::OtherDisconnect,
        "{errno}"
      );
    }
  }

  #[test]
  fn sentinels_are_not_collapsed() {
    assert_eq!(would_block(), libc::EWOULDBLOCK);
    assert_ne!(in_progress(), would_block());
    assert_ne!(already(), in_progress());
  }

  #[test]
  fn io_error_round_trip() {
    let err = NetError::from(io::Error::from_raw_os_error(libc::ECONNRESET));
    assert_eq!(err.class(), ErrorClass::PeerDisconnect);
    assert_eq!(err.errno(), libc::ECONNRESET);
    let back: io::Error = err.into();
    assert_eq!(back.raw_os_error(), Some(libc::ECONNRESET));

    let err = NetError::from(io::Error::from(io::ErrorKind::WouldBlock));
    assert!(err.is_retry());

    let closed: io::Error = NetError::peer_closed().into();
    assert_eq!(closed.kind(), io::ErrorKind::UnexpectedEof);
  }
}
