//! # `nativio` C API
//!
//! The surface a managed runtime binds to. Every function is synchronous and
//! returns immediately unless the socket itself is in blocking mode.
//!
//! ## Handles
//!
//! Sockets travel as `intptr_t` descriptors. The caller owns them: every
//! descriptor returned by `nativio_socket_*` or `nativio_accept` must be
//! released with `nativio_close` exactly once, and must not be used
//! afterwards. Debug builds assert that a descriptor is still open before
//! using it. `nativio_is_dead` is the one call that accepts a closed
//! descriptor.
//!
//! Addresses (`nativio_sockaddr*`) and message batches
//! (`nativio_msg_headers`) are heap objects owned by the caller and released
//! with their matching `nativio_free_*` function.
//!
//! ## Return codes
//!
//! - Transfer calls (`nativio_send`, `nativio_send_to`, `nativio_recv`,
//!   `nativio_recvmmsg`) return a byte or message count, or one of the
//!   classified codes: `NATIVIO_ERETRY` (0), `NATIVIO_EPEERDISCONNECT` (-1),
//!   `NATIVIO_EOTHERDISCONNECT` (-2).
//! - Creation, `nativio_accept`, `nativio_connect` and the tuning calls
//!   return a non-negative value on success or `-errno`. Compare against
//!   `-nativio_ewouldblock()`, `-nativio_einprogress()` and
//!   `-nativio_ealready()` to tell a pending operation from a failure.
//! - `nativio_bind_*` and `nativio_join` return `bool`.
//!
//! ## Compiling
//!
//! ```sh
//! cargo build --release -p nativio --features cheader
//! ```
//!
//! produces `target/release/libnativio.{so,dylib}` and `include/nativio.h`.
//!
//! ## Example
//!
//! ```c
//! intptr_t fd = nativio_socket_udp();
//! nativio_bind_udp(fd, 0, 9009);
//!
//! void *batch = nativio_msg_headers(2048, 64);
//! int n = nativio_recvmmsg(fd, batch, 64);
//! for (int i = 0; i < n; i++) {
//!     char *rec = (char *)batch + i * nativio_msg_header_size();
//!     struct iovec *iov = *(struct iovec **)(rec + nativio_msg_header_buffer_address_offset());
//!     unsigned len = *(unsigned *)(rec + nativio_msg_header_buffer_length_offset());
//!     consume(iov->iov_base, len);
//! }
//! nativio_free_msg_headers(batch);
//! nativio_close(fd);
//! ```
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::{
  io,
  mem::ManuallyDrop,
  os::fd::{FromRawFd, IntoRawFd, RawFd},
  ptr, slice,
};

use crate::{
  addr::SockAddr,
  dump,
  error::{self, NetError},
  msg::{MmsgHdr, MsgHeaders},
  net::{self, Socket},
  vect,
};

/// Transfer code: nothing transferred, try again later.
pub const NATIVIO_ERETRY: libc::c_int = 0;
/// Transfer code: the peer closed or reset the connection.
pub const NATIVIO_EPEERDISCONNECT: libc::c_int = -1;
/// Transfer code: the connection is lost for another reason.
pub const NATIVIO_EOTHERDISCONNECT: libc::c_int = -2;

/// Borrows a caller-owned descriptor for one call, or `None` if it cannot be
/// a descriptor at all.
fn borrow(fd: libc::intptr_t) -> Option<ManuallyDrop<Socket>> {
  let fd = RawFd::try_from(fd).ok().filter(|fd| *fd >= 0)?;
  net::debug_assert_open(fd);
  // SAFETY: wrapped in ManuallyDrop, so the caller keeps ownership.
  Some(ManuallyDrop::new(unsafe { Socket::from_raw_fd(fd) }))
}

fn with_socket<T>(fd: libc::intptr_t, bad_fd: T, f: impl FnOnce(&Socket) -> T) -> T {
  match borrow(fd) {
    Some(socket) => f(&socket),
    None => bad_fd,
  }
}

fn neg_errno(err: &io::Error) -> libc::c_int {
  -err.raw_os_error().unwrap_or(libc::EIO)
}

fn status(res: io::Result<()>) -> libc::c_int {
  match res {
    Ok(()) => 0,
    Err(err) => neg_errno(&err),
  }
}

fn transferred(res: Result<usize, NetError>) -> libc::c_int {
  match res {
    Ok(n) => n.min(libc::c_int::MAX as usize) as libc::c_int,
    Err(err) => err.code(),
  }
}

fn size(value: libc::c_int) -> io::Result<usize> {
  usize::try_from(value).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))
}

fn into_fd(res: io::Result<Socket>) -> libc::intptr_t {
  match res {
    Ok(socket) => socket.into_raw_fd() as libc::intptr_t,
    Err(err) => neg_errno(&err) as libc::intptr_t,
  }
}

/// # Safety
/// When non-null, `ptr` must be valid for `len` bytes for the returned
/// lifetime.
unsafe fn bytes<'a>(ptr: *const u8, len: libc::c_int) -> &'a [u8] {
  if ptr.is_null() || len <= 0 {
    return &[];
  }
  // SAFETY: forwarded to the caller.
  unsafe { slice::from_raw_parts(ptr, len as usize) }
}

/// # Safety
/// When non-null, `ptr` must be valid for writing `len` bytes for the
/// returned lifetime.
unsafe fn bytes_mut<'a>(ptr: *mut u8, len: libc::c_int) -> &'a mut [u8] {
  if ptr.is_null() || len <= 0 {
    return &mut [];
  }
  // SAFETY: forwarded to the caller.
  unsafe { slice::from_raw_parts_mut(ptr, len as usize) }
}

// ---- Socket lifecycle ------------------------------------------------------

/// Creates an IPv4 TCP socket, blocking or non-blocking.
///
/// Returns the descriptor or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_socket_tcp(blocking: bool) -> libc::intptr_t {
  into_fd(Socket::tcp(blocking))
}

/// Creates a non-blocking IPv4 UDP socket.
///
/// Returns the descriptor or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_socket_udp() -> libc::intptr_t {
  into_fd(Socket::udp())
}

/// Closes a descriptor. Returns 0 or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_close(fd: libc::intptr_t) -> libc::c_int {
  match borrow(fd) {
    Some(socket) => status(ManuallyDrop::into_inner(socket).close()),
    None => -libc::EBADF,
  }
}

fn bind(fd: libc::intptr_t, ip: u32, port: libc::c_int) -> bool {
  let Ok(port) = u16::try_from(port) else {
    return false;
  };
  with_socket(fd, false, |socket| socket.bind(ip, port).is_ok())
}

/// Binds a TCP socket to a host-order IPv4 address (0 for any).
#[unsafe(no_mangle)]
pub extern "C" fn nativio_bind_tcp(
  fd: libc::intptr_t,
  ip: u32,
  port: libc::c_int,
) -> bool {
  bind(fd, ip, port)
}

/// Binds a UDP socket to a host-order IPv4 address (0 for any).
#[unsafe(no_mangle)]
pub extern "C" fn nativio_bind_udp(
  fd: libc::intptr_t,
  ip: u32,
  port: libc::c_int,
) -> bool {
  bind(fd, ip, port)
}

/// Marks a bound TCP socket as passive. A failure is logged and surfaces
/// through the next `nativio_accept`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_listen(fd: libc::intptr_t, backlog: libc::c_int) {
  with_socket(fd, (), |socket| {
    if let Err(err) = socket.listen(backlog) {
      tracing::warn!(fd, backlog, error = %err, "listen failed");
    }
  })
}

/// Accepts one pending connection.
///
/// Returns the new descriptor (non-blocking), or `-errno`;
/// `-nativio_ewouldblock()` when nothing is pending.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_accept(fd: libc::intptr_t) -> libc::intptr_t {
  with_socket(fd, -libc::EBADF as libc::intptr_t, |socket| {
    match socket.accept() {
      Ok(conn) => conn.into_raw_fd() as libc::intptr_t,
      Err(err) => -err.errno() as libc::intptr_t,
    }
  })
}

/// Unblocks a thread parked in `nativio_accept` on `fd`. Returns 0 or
/// `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_abort_accept(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| match socket.abort_accept() {
    Ok(()) => 0,
    Err(err) => -err.errno(),
  })
}

/// Starts a connection to `addr`.
///
/// Returns 0 when connected, otherwise `-errno` unchanged:
/// `-nativio_einprogress()` and `-nativio_ealready()` mean the handshake is
/// still running.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_connect(
  fd: libc::intptr_t,
  addr: *const SockAddr,
) -> libc::c_int {
  // SAFETY: non-null `addr` values come from `nativio_sockaddr*`.
  let Some(addr) = (unsafe { addr.as_ref() }) else {
    return -libc::EINVAL;
  };
  with_socket(fd, -libc::EBADF, |socket| {
    status(syscall!(connect(socket.raw(), addr.as_ptr(), addr.len())).map(|_| ()))
  })
}

/// Joins an IPv4 multicast group on the interface `bind_ip`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_join(
  fd: libc::intptr_t,
  bind_ip: u32,
  group_ip: u32,
) -> bool {
  with_socket(fd, false, |socket| socket.join(bind_ip, group_ip).is_ok())
}

/// Whether the connection behind `fd` is gone. Safe to call on a closed
/// descriptor.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_is_dead(fd: libc::intptr_t) -> bool {
  match RawFd::try_from(fd) {
    Ok(fd) if fd >= 0 => net::is_dead(fd),
    _ => true,
  }
}

/// Peer IPv4 address in host order, or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_peer_ip(fd: libc::intptr_t) -> i64 {
  with_socket(fd, -libc::EBADF as i64, |socket| match socket.peer_ip() {
    Ok(ip) => ip as i64,
    Err(err) => -err.errno() as i64,
  })
}

/// Peer port, or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_peer_port(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| match socket.peer_port() {
    Ok(port) => port as libc::c_int,
    Err(err) => -err.errno(),
  })
}

// ---- Tuning ----------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn nativio_configure_non_blocking(
  fd: libc::intptr_t,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.configure_non_blocking()))
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_configure_no_linger(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.configure_no_linger()))
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_get_rcv_buf(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| match socket.rcv_buf() {
    Ok(size) => size.min(libc::c_int::MAX as usize) as libc::c_int,
    Err(err) => neg_errno(&err),
  })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_rcv_buf(
  fd: libc::intptr_t,
  size: libc::c_int,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| {
    status(self::size(size).and_then(|size| socket.set_rcv_buf(size)))
  })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_get_snd_buf(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| match socket.snd_buf() {
    Ok(size) => size.min(libc::c_int::MAX as usize) as libc::c_int,
    Err(err) => neg_errno(&err),
  })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_snd_buf(
  fd: libc::intptr_t,
  size: libc::c_int,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| {
    status(self::size(size).and_then(|size| socket.set_snd_buf(size)))
  })
}

/// Returns 1 when `TCP_NODELAY` is on, 0 when off, or `-errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_get_tcp_no_delay(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| match socket.tcp_no_delay() {
    Ok(on) => on as libc::c_int,
    Err(err) => neg_errno(&err),
  })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_tcp_no_delay(
  fd: libc::intptr_t,
  on: bool,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.set_tcp_no_delay(on)))
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_multicast_interface(
  fd: libc::intptr_t,
  ip: u32,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| {
    status(socket.set_multicast_interface(ip))
  })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_multicast_loop(
  fd: libc::intptr_t,
  on: bool,
) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.set_multicast_loop(on)))
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_reuse_address(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.set_reuse_address(true)))
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_set_reuse_port(fd: libc::intptr_t) -> libc::c_int {
  with_socket(fd, -libc::EBADF, |socket| status(socket.set_reuse_port(true)))
}

// ---- Transfer --------------------------------------------------------------

/// Sends up to `len` bytes. Returns the count sent or a transfer code.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_send(
  fd: libc::intptr_t,
  buf: *const u8,
  len: libc::c_int,
) -> libc::c_int {
  // SAFETY: the caller passes a buffer valid for `len` bytes.
  let buf = unsafe { bytes(buf, len) };
  with_socket(fd, NATIVIO_EOTHERDISCONNECT, |socket| transferred(socket.send(buf)))
}

/// Sends one datagram to `addr`. Returns the count sent or a transfer code.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_send_to(
  fd: libc::intptr_t,
  buf: *const u8,
  len: libc::c_int,
  addr: *const SockAddr,
) -> libc::c_int {
  // SAFETY: non-null `addr` values come from `nativio_sockaddr*`.
  let Some(addr) = (unsafe { addr.as_ref() }) else {
    return NATIVIO_EOTHERDISCONNECT;
  };
  // SAFETY: the caller passes a buffer valid for `len` bytes.
  let buf = unsafe { bytes(buf, len) };
  with_socket(fd, NATIVIO_EOTHERDISCONNECT, |socket| {
    transferred(socket.send_to(buf, addr))
  })
}

/// Receives up to `len` bytes. Returns the count received or a transfer
/// code; an orderly close by the peer is `NATIVIO_EPEERDISCONNECT`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_recv(
  fd: libc::intptr_t,
  buf: *mut u8,
  len: libc::c_int,
) -> libc::c_int {
  // SAFETY: the caller passes a buffer writable for `len` bytes.
  let buf = unsafe { bytes_mut(buf, len) };
  with_socket(fd, NATIVIO_EOTHERDISCONNECT, |socket| transferred(socket.recv(buf)))
}

/// Receives up to `count` datagrams into `batch` (from
/// `nativio_msg_headers`). Returns the number of filled records or a
/// transfer code.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_recvmmsg(
  fd: libc::intptr_t,
  batch: *mut libc::c_void,
  count: libc::c_int,
) -> libc::c_int {
  if batch.is_null() {
    return NATIVIO_EOTHERDISCONNECT;
  }
  // SAFETY: non-null batches come from `nativio_msg_headers`; ManuallyDrop
  // leaves ownership with the caller.
  let mut batch =
    ManuallyDrop::new(unsafe { MsgHeaders::from_raw(batch.cast::<MmsgHdr>()) });
  let count = usize::try_from(count).unwrap_or(0);
  with_socket(fd, NATIVIO_EOTHERDISCONNECT, |socket| {
    transferred(socket.recv_batch(&mut batch, count))
  })
}

// ---- Addresses -------------------------------------------------------------

fn boxed(addr: Result<SockAddr, NetError>) -> *mut SockAddr {
  match addr {
    Ok(addr) => Box::into_raw(Box::new(addr)),
    Err(_) => ptr::null_mut(),
  }
}

/// Builds an IPv4 address from a host-order `ip`. Null when `port` is out of
/// range. Release with `nativio_free_sockaddr`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_sockaddr(ip: u32, port: libc::c_int) -> *mut SockAddr {
  nativio_sockaddr_family(libc::AF_INET, ip, port)
}

/// Builds an address of `family` (`AF_INET`, or `AF_INET6` for the
/// IPv4-mapped form). Null for any other family or an out-of-range port.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_sockaddr_family(
  family: libc::c_int,
  ip: u32,
  port: libc::c_int,
) -> *mut SockAddr {
  match u16::try_from(port) {
    Ok(port) => boxed(SockAddr::new(family, ip, port)),
    Err(_) => ptr::null_mut(),
  }
}

/// Releases an address. Null is ignored.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_free_sockaddr(addr: *mut SockAddr) {
  if !addr.is_null() {
    // SAFETY: non-null values come from `Box::into_raw` in `boxed`.
    drop(unsafe { Box::from_raw(addr) });
  }
}

// ---- Message batches -------------------------------------------------------

/// Allocates `count` records of `block_size` bytes each. Null when either is
/// not positive or the allocation fails. Release with
/// `nativio_free_msg_headers`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_msg_headers(
  block_size: libc::c_int,
  count: libc::c_int,
) -> *mut libc::c_void {
  let batch = size(count)
    .and_then(|count| Ok((count, size(block_size)?)))
    .and_then(|(count, block_size)| MsgHeaders::new(count, block_size));
  match batch {
    Ok(batch) => batch.into_raw().cast(),
    Err(err) => {
      tracing::warn!(block_size, count, error = %err, "cannot allocate message headers");
      ptr::null_mut()
    }
  }
}

/// Releases a batch. Null is ignored.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_free_msg_headers(batch: *mut libc::c_void) {
  if !batch.is_null() {
    // SAFETY: non-null batches come from `nativio_msg_headers`.
    drop(unsafe { MsgHeaders::from_raw(batch.cast::<MmsgHdr>()) });
  }
}

/// Bytes between consecutive records.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_msg_header_size() -> libc::c_int {
  MsgHeaders::STRIDE as libc::c_int
}

/// Offset of the `struct iovec *` inside a record; the iovec starts with the
/// buffer address.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_msg_header_buffer_address_offset() -> libc::c_int {
  MsgHeaders::BUFFER_ADDRESS_OFFSET as libc::c_int
}

/// Offset of the received length (`unsigned int`) inside a record.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_msg_header_buffer_length_offset() -> libc::c_int {
  MsgHeaders::BUFFER_LENGTH_OFFSET as libc::c_int
}

// ---- Errors ----------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn nativio_ewouldblock() -> libc::c_int {
  error::would_block()
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_einprogress() -> libc::c_int {
  error::in_progress()
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_ealready() -> libc::c_int {
  error::already()
}

/// The calling thread's `errno`.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_errno() -> libc::c_int {
  error::errno()
}

/// Logs `len` bytes at `buf` as a hex dump at trace level.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_dump(buf: *const u8, len: libc::c_int) {
  // SAFETY: the caller passes a buffer valid for `len` bytes.
  dump::trace("nativio_dump", unsafe { bytes(buf, len) });
}

// ---- Vector kernels --------------------------------------------------------

/// # Safety
/// When non-null, `ptr` must be valid for `count` doubles for the returned
/// lifetime.
unsafe fn doubles<'a>(ptr: *const f64, count: i64) -> &'a [f64] {
  if ptr.is_null() || count <= 0 {
    return &[];
  }
  // SAFETY: forwarded to the caller.
  unsafe { slice::from_raw_parts(ptr, count as usize) }
}

/// The detected instruction set: 0 vanilla, 1 SSE2, 2 SSE4.1, 3 AVX2,
/// 4 AVX-512.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_instruction_set() -> libc::c_int {
  vect::InstructionSet::detect() as libc::c_int
}

/// Binds every kernel now instead of on first use. Returns the tier used.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_bind_all() -> libc::c_int {
  vect::bind_all() as libc::c_int
}

/// Sum of the non-NaN values, NaN when there are none.
#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_sum_double(values: *const f64, count: i64) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::SUM_DOUBLE.call(unsafe { doubles(values, count) })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_sum_double_kahan(
  values: *const f64,
  count: i64,
) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::SUM_DOUBLE_KAHAN.call(unsafe { doubles(values, count) })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_sum_double_neumaier(
  values: *const f64,
  count: i64,
) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::SUM_DOUBLE_NEUMAIER.call(unsafe { doubles(values, count) })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_avg_double(values: *const f64, count: i64) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::AVG_DOUBLE.call(unsafe { doubles(values, count) })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_min_double(values: *const f64, count: i64) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::MIN_DOUBLE.call(unsafe { doubles(values, count) })
}

#[unsafe(no_mangle)]
pub extern "C" fn nativio_vect_max_double(values: *const f64, count: i64) -> f64 {
  // SAFETY: the caller passes `count` readable doubles.
  vect::MAX_DOUBLE.call(unsafe { doubles(values, count) })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transfer_codes_match_classes() {
    assert_eq!(NATIVIO_ERETRY, error::ERETRY);
    assert_eq!(NATIVIO_EPEERDISCONNECT, error::EPEERDISCONNECT);
    assert_eq!(NATIVIO_EOTHERDISCONNECT, error::EOTHERDISCONNECT);
  }

  #[test]
  fn negative_descriptors_are_rejected() {
    assert_eq!(nativio_close(-1), -libc::EBADF);
    assert_eq!(nativio_configure_non_blocking(-5), -libc::EBADF);
    assert_eq!(nativio_send(-1, ptr::null(), 0), NATIVIO_EOTHERDISCONNECT);
    assert!(!nativio_bind_udp(-1, 0, 0));
    assert!(nativio_is_dead(-1));
  }

  #[test]
  fn out_of_range_ports_yield_null() {
    assert!(nativio_sockaddr(0x7f00_0001, 70_000).is_null());
    assert!(nativio_sockaddr(0x7f00_0001, -1).is_null());
  }

  #[test]
  fn null_kernel_input_is_empty() {
    assert!(nativio_vect_sum_double(ptr::null(), 10).is_nan());
    let values = [1.0, 2.0];
    assert!(nativio_vect_max_double(values.as_ptr(), 0).is_nan());
    assert_eq!(nativio_vect_max_double(values.as_ptr(), 2), 2.0);
  }
}
