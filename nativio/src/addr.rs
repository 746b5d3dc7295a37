//! Socket addresses in the form the kernel takes them.
//!
//! [`SockAddr`] is a filled `sockaddr_storage` plus its length, built once
//! and passed by pointer to `connect`, `bind` and `sendto`. IPv4 addresses
//! arrive as host-order `u32`s, the way the engine above stores them.

use std::{
  fmt, io, mem,
  net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
  ptr,
};

use crate::error::NetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
  Ipv4,
  Ipv6,
}

impl AddressFamily {
  pub const fn raw(self) -> libc::c_int {
    match self {
      AddressFamily::Ipv4 => libc::AF_INET,
      AddressFamily::Ipv6 => libc::AF_INET6,
    }
  }
}

impl TryFrom<i32> for AddressFamily {
  type Error = NetError;

  fn try_from(family: i32) -> Result<Self, Self::Error> {
    match family {
      libc::AF_INET => Ok(AddressFamily::Ipv4),
      libc::AF_INET6 => Ok(AddressFamily::Ipv6),
      _ => Err(NetError::from_errno(libc::EAFNOSUPPORT)),
    }
  }
}

/// An immutable, kernel-ready socket address.
#[derive(Clone, Copy)]
pub struct SockAddr {
  storage: libc::sockaddr_storage,
  len: libc::socklen_t,
}

impl SockAddr {
  /// Builds an address of the raw `family` (`AF_INET` or `AF_INET6`).
  ///
  /// `ip` is a host-order IPv4 address. For `AF_INET6` the record holds the
  /// IPv4-mapped form `::ffff:a.b.c.d`.
  pub fn new(family: i32, ip: u32, port: u16) -> Result<SockAddr, NetError> {
    Ok(SockAddr::with_family(AddressFamily::try_from(family)?, ip, port))
  }

  pub fn with_family(family: AddressFamily, ip: u32, port: u16) -> SockAddr {
    let v4 = Ipv4Addr::from(ip);
    match family {
      AddressFamily::Ipv4 => SockAddr::from(SocketAddrV4::new(v4, port)),
      AddressFamily::Ipv6 => {
        SockAddr::from(SocketAddrV6::new(v4.to_ipv6_mapped(), port, 0, 0))
      }
    }
  }

  pub fn ipv4(ip: u32, port: u16) -> SockAddr {
    SockAddr::with_family(AddressFamily::Ipv4, ip, port)
  }

  /// Wraps storage filled in by the kernel (`accept`, `getpeername`).
  ///
  /// # Safety
  /// The first `len` bytes of `storage` must be a valid socket address.
  pub(crate) unsafe fn from_raw_parts(
    storage: libc::sockaddr_storage,
    len: libc::socklen_t,
  ) -> SockAddr {
    SockAddr { storage, len }
  }

  pub fn family(&self) -> Option<AddressFamily> {
    AddressFamily::try_from(self.storage.ss_family as i32).ok()
  }

  pub fn as_ptr(&self) -> *const libc::sockaddr {
    (&self.storage as *const libc::sockaddr_storage).cast()
  }

  pub fn len(&self) -> libc::socklen_t {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn to_socket_addr(&self) -> io::Result<SocketAddr> {
    let storage: *const libc::sockaddr_storage = &self.storage;
    match self.family() {
      Some(AddressFamily::Ipv4) => {
        // SAFETY: ss_family is AF_INET, so the storage holds a sockaddr_in.
        let sin = unsafe { *storage.cast::<libc::sockaddr_in>() };
        let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
        Ok(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sin.sin_port))))
      }
      Some(AddressFamily::Ipv6) => {
        // SAFETY: ss_family is AF_INET6, so the storage holds a sockaddr_in6.
        let sin6 = unsafe { *storage.cast::<libc::sockaddr_in6>() };
        Ok(SocketAddr::V6(SocketAddrV6::new(
          Ipv6Addr::from(sin6.sin6_addr.s6_addr),
          u16::from_be(sin6.sin6_port),
          sin6.sin6_flowinfo,
          sin6.sin6_scope_id,
        )))
      }
      None => Err(io::Error::from_raw_os_error(libc::EAFNOSUPPORT)),
    }
  }

  /// The IPv4 address in host order. IPv4-mapped IPv6 addresses count.
  pub fn ipv4_bits(&self) -> Option<u32> {
    match self.to_socket_addr().ok()? {
      SocketAddr::V4(v4) => Some(u32::from(*v4.ip())),
      SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped().map(u32::from),
    }
  }

  pub fn port(&self) -> Option<u16> {
    self.to_socket_addr().ok().map(|addr| addr.port())
  }
}

impl From<SocketAddrV4> for SockAddr {
  fn from(addr: SocketAddrV4) -> SockAddr {
    // SAFETY: sockaddr_in only has integer fields; all-zero is valid.
    let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
    #[cfg(any(apple, bsd))]
    {
      sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
    }
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = addr.port().to_be();
    sin.sin_addr = libc::in_addr { s_addr: u32::from(*addr.ip()).to_be() };
    // SAFETY: sockaddr_in fits in sockaddr_storage.
    unsafe { store(&sin) }
  }
}

impl From<SocketAddrV6> for SockAddr {
  fn from(addr: SocketAddrV6) -> SockAddr {
    // SAFETY: sockaddr_in6 only has integer fields; all-zero is valid.
    let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
    #[cfg(any(apple, bsd))]
    {
      sin6.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
    }
    sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
    sin6.sin6_port = addr.port().to_be();
    sin6.sin6_flowinfo = addr.flowinfo();
    sin6.sin6_scope_id = addr.scope_id();
    sin6.sin6_addr = libc::in6_addr { s6_addr: addr.ip().octets() };
    // SAFETY: sockaddr_in6 fits in sockaddr_storage.
    unsafe { store(&sin6) }
  }
}

impl From<SocketAddr> for SockAddr {
  fn from(addr: SocketAddr) -> SockAddr {
    match addr {
      SocketAddr::V4(v4) => SockAddr::from(v4),
      SocketAddr::V6(v6) => SockAddr::from(v6),
    }
  }
}

/// Copies a concrete address into zeroed storage.
///
/// # Safety
/// `T` must be a `sockaddr_*` type no larger than `sockaddr_storage`.
unsafe fn store<T>(addr: &T) -> SockAddr {
  // SAFETY: sockaddr_storage is plain data; all-zero is valid.
  let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
  // SAFETY: caller guarantees T fits; the regions are distinct locals.
  unsafe {
    ptr::copy_nonoverlapping(
      (addr as *const T).cast::<u8>(),
      (&mut storage as *mut libc::sockaddr_storage).cast::<u8>(),
      mem::size_of::<T>(),
    );
  }
  SockAddr { storage, len: mem::size_of::<T>() as libc::socklen_t }
}

impl fmt::Debug for SockAddr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.to_socket_addr() {
      Ok(addr) => f.debug_tuple("SockAddr").field(&addr).finish(),
      Err(_) => f
        .debug_struct("SockAddr")
        .field("family", &self.storage.ss_family)
        .field("len", &self.len)
        .finish(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const LOCALHOST: u32 = 0x7f00_0001;

  #[test]
  fn ipv4_from_host_order() {
    let addr = SockAddr::new(libc::AF_INET, LOCALHOST, 9009).unwrap();
    assert_eq!(addr.family(), Some(AddressFamily::Ipv4));
    assert_eq!(addr.len() as usize, mem::size_of::<libc::sockaddr_in>());
    assert_eq!(
      addr.to_socket_addr().unwrap(),
      "127.0.0.1:9009".parse::<SocketAddr>().unwrap()
    );
  }

  #[test]
  fn ipv6_is_ipv4_mapped() {
    let addr = SockAddr::new(libc::AF_INET6, 0x0a00_0002, 80).unwrap();
    assert_eq!(addr.family(), Some(AddressFamily::Ipv6));
    assert_eq!(
      addr.to_socket_addr().unwrap(),
      "[::ffff:10.0.0.2]:80".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(addr.ipv4_bits(), Some(0x0a00_0002));
    assert_eq!(addr.port(), Some(80));
  }

  #[test]
  fn unsupported_family_fails() {
    for family in [libc::AF_UNIX, libc::AF_UNSPEC, -1, 12345] {
      let err = SockAddr::new(family, LOCALHOST, 1).unwrap_err();
      assert_eq!(err.errno(), libc::EAFNOSUPPORT);
    }
  }

  #[test]
  fn std_addresses_convert() {
    for text in ["192.168.1.20:5000", "[2001:db8::1]:443"] {
      let std: SocketAddr = text.parse().unwrap();
      assert_eq!(SockAddr::from(std).to_socket_addr().unwrap(), std);
    }
  }

  #[test]
  fn port_zero_is_allowed() {
    let addr = SockAddr::ipv4(0, 0);
    assert_eq!(addr.port(), Some(0));
    assert_eq!(addr.ipv4_bits(), Some(0));
  }
}
