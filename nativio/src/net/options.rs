//! Socket tuning.
//!
//! Setters are idempotent: applying the same value twice succeeds twice.
//! Getters return what the kernel reports, which for buffer sizes is not
//! necessarily what was set (Linux doubles the requested value).

use std::io;

use super::Socket;

impl Socket {
  pub fn configure_non_blocking(&self) -> io::Result<()> {
    self.set_non_blocking(true)
  }

  pub fn set_non_blocking(&self, non_blocking: bool) -> io::Result<()> {
    let flags = syscall!(fcntl(self.raw(), libc::F_GETFL))?;
    let wanted = if non_blocking {
      flags | libc::O_NONBLOCK
    } else {
      flags & !libc::O_NONBLOCK
    };
    if wanted != flags {
      syscall!(fcntl(self.raw(), libc::F_SETFL, wanted))?;
    }
    Ok(())
  }

  pub fn is_non_blocking(&self) -> io::Result<bool> {
    let flags = syscall!(fcntl(self.raw(), libc::F_GETFL))?;
    Ok(flags & libc::O_NONBLOCK != 0)
  }

  /// Makes close(2) reset the connection instead of lingering on unsent
  /// data.
  pub fn configure_no_linger(&self) -> io::Result<()> {
    let linger = libc::linger { l_onoff: 1, l_linger: 0 };
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_LINGER, linger)
  }

  pub fn linger(&self) -> io::Result<Option<i32>> {
    let linger =
      getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_LINGER, libc::linger)?;
    Ok((linger.l_onoff != 0).then_some(linger.l_linger))
  }

  pub fn rcv_buf(&self) -> io::Result<usize> {
    let size =
      getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_RCVBUF, libc::c_int)?;
    Ok(size as usize)
  }

  pub fn set_rcv_buf(&self, size: usize) -> io::Result<()> {
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_RCVBUF, clamp(size))
  }

  pub fn snd_buf(&self) -> io::Result<usize> {
    let size =
      getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_SNDBUF, libc::c_int)?;
    Ok(size as usize)
  }

  pub fn set_snd_buf(&self, size: usize) -> io::Result<()> {
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_SNDBUF, clamp(size))
  }

  pub fn tcp_no_delay(&self) -> io::Result<bool> {
    let on =
      getsockopt!(self.raw(), libc::IPPROTO_TCP, libc::TCP_NODELAY, libc::c_int)?;
    Ok(on != 0)
  }

  pub fn set_tcp_no_delay(&self, on: bool) -> io::Result<()> {
    setsockopt!(self.raw(), libc::IPPROTO_TCP, libc::TCP_NODELAY, on as libc::c_int)
  }

  /// Interface used for outgoing multicast, host-order IPv4.
  pub fn multicast_interface(&self) -> io::Result<u32> {
    let addr = getsockopt!(
      self.raw(),
      libc::IPPROTO_IP,
      libc::IP_MULTICAST_IF,
      libc::in_addr
    )?;
    Ok(u32::from_be(addr.s_addr))
  }

  pub fn set_multicast_interface(&self, ip: u32) -> io::Result<()> {
    let addr = libc::in_addr { s_addr: ip.to_be() };
    setsockopt!(self.raw(), libc::IPPROTO_IP, libc::IP_MULTICAST_IF, addr)
  }

  // BSD kernels only accept a u_char for IP_MULTICAST_LOOP; Linux takes
  // either.
  pub fn multicast_loop(&self) -> io::Result<bool> {
    let on =
      getsockopt!(self.raw(), libc::IPPROTO_IP, libc::IP_MULTICAST_LOOP, u8)?;
    Ok(on != 0)
  }

  pub fn set_multicast_loop(&self, on: bool) -> io::Result<()> {
    setsockopt!(self.raw(), libc::IPPROTO_IP, libc::IP_MULTICAST_LOOP, on as u8)
  }

  pub fn reuse_address(&self) -> io::Result<bool> {
    let on =
      getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_REUSEADDR, libc::c_int)?;
    Ok(on != 0)
  }

  pub fn set_reuse_address(&self, on: bool) -> io::Result<()> {
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_REUSEADDR, on as libc::c_int)
  }

  pub fn reuse_port(&self) -> io::Result<bool> {
    let on =
      getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_REUSEPORT, libc::c_int)?;
    Ok(on != 0)
  }

  pub fn set_reuse_port(&self, on: bool) -> io::Result<()> {
    setsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_REUSEPORT, on as libc::c_int)
  }

  /// `SO_TYPE`: `SOCK_STREAM`, `SOCK_DGRAM`, ...
  pub fn socket_type(&self) -> io::Result<libc::c_int> {
    getsockopt!(self.raw(), libc::SOL_SOCKET, libc::SO_TYPE, libc::c_int)
  }

  // A descriptor the kernel cannot describe counts as a stream, so a
  // zero-byte read on it still ends the connection.
  pub(crate) fn is_stream(&self) -> bool {
    self.socket_type().map_or(true, |ty| ty == libc::SOCK_STREAM)
  }
}

fn clamp(size: usize) -> libc::c_int {
  size.min(libc::c_int::MAX as usize) as libc::c_int
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn non_blocking_toggles() {
    let socket = Socket::tcp(true).unwrap();
    assert!(!socket.is_non_blocking().unwrap());
    socket.configure_non_blocking().unwrap();
    socket.configure_non_blocking().unwrap();
    assert!(socket.is_non_blocking().unwrap());
    socket.set_non_blocking(false).unwrap();
    assert!(!socket.is_non_blocking().unwrap());
  }

  #[test]
  fn no_linger_is_zero_timeout() {
    let socket = Socket::tcp(false).unwrap();
    assert_eq!(socket.linger().unwrap(), None);
    socket.configure_no_linger().unwrap();
    assert_eq!(socket.linger().unwrap(), Some(0));
  }

  #[test]
  fn socket_type_tells_stream_from_datagram() {
    let tcp = Socket::tcp(false).unwrap();
    let udp = Socket::udp().unwrap();
    assert_eq!(tcp.socket_type().unwrap(), libc::SOCK_STREAM);
    assert_eq!(udp.socket_type().unwrap(), libc::SOCK_DGRAM);
    assert!(tcp.is_stream());
    assert!(!udp.is_stream());
  }

  #[test]
  fn huge_buffer_sizes_are_clamped_not_rejected() {
    assert_eq!(clamp(usize::MAX), libc::c_int::MAX);
    assert_eq!(clamp(4096), 4096);
  }
}
