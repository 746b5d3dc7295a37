use std::{
  io, mem,
  os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd},
  ptr,
};

use crate::{
  addr::SockAddr,
  error::{ErrorClass, NetError, Result},
};

/// Outcome of a successful [`Socket::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connect {
  Established,
  /// Non-blocking connect underway; poll for writability to learn the
  /// result.
  InProgress,
}

/// Exclusive owner of one socket descriptor.
///
/// The descriptor is closed when the `Socket` is dropped, or explicitly with
/// [`Socket::close`] to observe the result.
#[derive(Debug)]
pub struct Socket {
  fd: OwnedFd,
}

impl Socket {
  /// Creates a socket with close-on-exec set, and `SO_NOSIGPIPE` where the
  /// platform has it.
  pub fn new(
    domain: libc::c_int,
    ty: libc::c_int,
    proto: libc::c_int,
  ) -> io::Result<Socket> {
    #[cfg(cloexec)]
    let fd = syscall!(socket(domain, ty | libc::SOCK_CLOEXEC, proto))?;
    #[cfg(not(cloexec))]
    let fd = syscall!(socket(domain, ty, proto))?;

    // SAFETY: `fd` was just returned by socket(2) and nothing else owns it.
    let socket = unsafe { Socket::from_raw_fd(fd) };

    #[cfg(not(cloexec))]
    syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
    socket.suppress_sigpipe()?;

    tracing::trace!(fd, domain, ty, "socket created");
    Ok(socket)
  }

  /// IPv4 TCP socket. With `blocking` false the socket is switched to
  /// non-blocking mode before it is returned.
  pub fn tcp(blocking: bool) -> io::Result<Socket> {
    let socket = Socket::new(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_TCP)?;
    if !blocking {
      socket.configure_non_blocking()?;
    }
    Ok(socket)
  }

  /// IPv4 UDP socket in non-blocking mode.
  pub fn udp() -> io::Result<Socket> {
    let socket = Socket::new(libc::AF_INET, libc::SOCK_DGRAM, libc::IPPROTO_UDP)?;
    socket.configure_non_blocking()?;
    Ok(socket)
  }

  #[cfg(nosigpipe)]
  fn suppress_sigpipe(&self) -> io::Result<()> {
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_NOSIGPIPE, 1 as libc::c_int)
  }

  // Linux passes MSG_NOSIGNAL on every send instead.
  #[cfg(not(nosigpipe))]
  fn suppress_sigpipe(&self) -> io::Result<()> {
    Ok(())
  }

  pub(crate) fn raw(&self) -> RawFd {
    self.fd.as_raw_fd()
  }

  /// Binds to a host-order IPv4 address. `0` is `INADDR_ANY`.
  pub fn bind(&self, ip: u32, port: u16) -> Result<()> {
    self.bind_addr(&SockAddr::ipv4(ip, port))
  }

  pub fn bind_addr(&self, addr: &SockAddr) -> Result<()> {
    syscall!(bind(self.raw(), addr.as_ptr(), addr.len()))?;
    tracing::debug!(fd = self.raw(), ?addr, "socket bound");
    Ok(())
  }

  pub fn listen(&self, backlog: i32) -> io::Result<()> {
    syscall!(listen(self.raw(), backlog))?;
    tracing::debug!(fd = self.raw(), backlog, "socket listening");
    Ok(())
  }

  /// Accepts one pending connection.
  ///
  /// On a non-blocking listener with nothing pending the error is of class
  /// [`ErrorClass::Retry`]. The accepted socket is non-blocking and
  /// close-on-exec.
  pub fn accept(&self) -> Result<Socket> {
    #[cfg(cloexec)]
    let fd = syscall!(accept4(
      self.raw(),
      ptr::null_mut(),
      ptr::null_mut(),
      libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK
    ))?;
    #[cfg(not(cloexec))]
    let fd = syscall!(accept(self.raw(), ptr::null_mut(), ptr::null_mut()))?;

    // SAFETY: `fd` was just returned by accept(2) and nothing else owns it.
    let socket = unsafe { Socket::from_raw_fd(fd) };

    #[cfg(not(cloexec))]
    {
      syscall!(fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC))?;
      socket.configure_non_blocking()?;
    }
    socket.suppress_sigpipe()?;

    tracing::trace!(listener = self.raw(), fd, "connection accepted");
    Ok(socket)
  }

  /// Wakes a thread parked in a blocking [`accept`](Socket::accept) on this
  /// listener. The parked call fails with an
  /// [`ErrorClass::OtherDisconnect`] error; the listener is unusable
  /// afterwards.
  pub fn abort_accept(&self) -> Result<()> {
    match syscall!(shutdown(self.raw(), libc::SHUT_RDWR)) {
      Ok(_) => {}
      // BSD kernels refuse to shut down a socket that never connected.
      Err(err) if err.raw_os_error() == Some(libc::ENOTCONN) => {}
      Err(err) => return Err(err.into()),
    }
    tracing::debug!(fd = self.raw(), "accept aborted");
    Ok(())
  }

  /// Starts connecting to `addr`.
  ///
  /// A non-blocking socket usually reports [`Connect::InProgress`]; that is
  /// not a failure. Calling again while the handshake runs reports
  /// `InProgress` again, and `Established` once it completed.
  pub fn connect(&self, addr: &SockAddr) -> Result<Connect> {
    match syscall!(connect(self.raw(), addr.as_ptr(), addr.len())) {
      Ok(_) => Ok(Connect::Established),
      Err(err) => match err.raw_os_error() {
        Some(libc::EINPROGRESS | libc::EALREADY | libc::EINTR) => {
          Ok(Connect::InProgress)
        }
        Some(libc::EISCONN) => Ok(Connect::Established),
        _ => Err(err.into()),
      },
    }
  }

  /// Joins the IPv4 multicast `group_ip` on the interface `bind_ip`. Both are
  /// host order.
  pub fn join(&self, bind_ip: u32, group_ip: u32) -> Result<()> {
    let mreq = libc::ip_mreq {
      imr_multiaddr: libc::in_addr { s_addr: group_ip.to_be() },
      imr_interface: libc::in_addr { s_addr: bind_ip.to_be() },
    };
    setsockopt!(self.raw(), libc::IPPROTO_IP, libc::IP_ADD_MEMBERSHIP, mreq)?;
    tracing::debug!(fd = self.raw(), group_ip, bind_ip, "joined multicast group");
    Ok(())
  }

  pub fn peer_addr(&self) -> Result<SockAddr> {
    self.name(|fd, addr, len| syscall!(getpeername(fd, addr, len)))
  }

  pub fn local_addr(&self) -> Result<SockAddr> {
    self.name(|fd, addr, len| syscall!(getsockname(fd, addr, len)))
  }

  /// Peer IPv4 address in host order.
  pub fn peer_ip(&self) -> Result<u32> {
    self
      .peer_addr()?
      .ipv4_bits()
      .ok_or_else(|| NetError::from_errno(libc::EAFNOSUPPORT))
  }

  pub fn peer_port(&self) -> Result<u16> {
    self
      .peer_addr()?
      .port()
      .ok_or_else(|| NetError::from_errno(libc::EAFNOSUPPORT))
  }

  fn name(
    &self,
    call: impl FnOnce(
      RawFd,
      *mut libc::sockaddr,
      *mut libc::socklen_t,
    ) -> io::Result<libc::c_int>,
  ) -> Result<SockAddr> {
    // SAFETY: sockaddr_storage is plain data; all-zero is valid.
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    call(
      self.raw(),
      (&mut storage as *mut libc::sockaddr_storage).cast(),
      &mut len,
    )?;
    // SAFETY: the kernel filled `len` bytes of `storage`.
    Ok(unsafe { SockAddr::from_raw_parts(storage, len) })
  }

  /// Whether the connection behind this socket is gone.
  pub fn is_dead(&self) -> bool {
    is_dead(self.raw())
  }

  /// Closes the descriptor, reporting the result of close(2).
  pub fn close(self) -> io::Result<()> {
    let fd = self.fd.into_raw_fd();
    syscall!(close(fd))?;
    tracing::trace!(fd, "socket closed");
    Ok(())
  }
}

/// Peeks one byte without blocking. An orderly close (0 bytes) or any error
/// that is not a retry, `EBADF` on a closed descriptor included, means dead.
///
/// Only meaningful for connected sockets.
pub fn is_dead(fd: RawFd) -> bool {
  let mut byte = 0u8;
  // SAFETY: one writable byte; a stale fd yields EBADF.
  let n = unsafe {
    libc::recv(
      fd,
      (&mut byte as *mut u8).cast(),
      1,
      libc::MSG_PEEK | libc::MSG_DONTWAIT,
    )
  };
  match n {
    0 => true,
    n if n > 0 => false,
    _ => ErrorClass::classify(crate::error::errno()) != ErrorClass::Retry,
  }
}

/// Debug builds panic when `fd` is not an open descriptor.
///
/// Raw descriptors cross the C ABI without ownership; this catches a caller
/// using one after closing it, as long as the number was not reused.
#[inline]
pub(crate) fn debug_assert_open(fd: RawFd) {
  // SAFETY: F_GETFD has no side effects.
  debug_assert!(
    unsafe { libc::fcntl(fd, libc::F_GETFD) } != -1,
    "socket {fd} used after close"
  );
}

impl AsRawFd for Socket {
  fn as_raw_fd(&self) -> RawFd {
    self.fd.as_raw_fd()
  }
}

impl AsFd for Socket {
  fn as_fd(&self) -> BorrowedFd<'_> {
    self.fd.as_fd()
  }
}

impl IntoRawFd for Socket {
  fn into_raw_fd(self) -> RawFd {
    self.fd.into_raw_fd()
  }
}

impl FromRawFd for Socket {
  unsafe fn from_raw_fd(fd: RawFd) -> Socket {
    // SAFETY: forwarded to the caller.
    Socket { fd: unsafe { OwnedFd::from_raw_fd(fd) } }
  }
}

impl From<OwnedFd> for Socket {
  fn from(fd: OwnedFd) -> Socket {
    Socket { fd }
  }
}

impl From<Socket> for OwnedFd {
  fn from(socket: Socket) -> OwnedFd {
    socket.fd
  }
}
