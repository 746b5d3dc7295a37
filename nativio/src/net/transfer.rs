//! Data transfer on non-blocking sockets.
//!
//! Every call maps to exactly one syscall (one per datagram for the
//! portable batch receive) and never retries. "Nothing to do right now"
//! comes back as an error of class [`Retry`](crate::ErrorClass::Retry).

use crate::{
  addr::SockAddr,
  error::{NetError, Result},
  msg::MsgHeaders,
};

use super::Socket;

// Linux reports a closed peer as EPIPE instead of raising SIGPIPE. Apple and
// BSD sockets carry SO_NOSIGPIPE from creation.
#[cfg(nosignal)]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(nosignal))]
const SEND_FLAGS: libc::c_int = 0;

impl Socket {
  pub fn send(&self, buf: &[u8]) -> Result<usize> {
    // SAFETY: `buf` is valid for `buf.len()` bytes.
    let n = unsafe {
      libc::send(self.raw(), buf.as_ptr().cast(), buf.len(), SEND_FLAGS)
    };
    if n < 0 {
      return Err(NetError::last_os_error());
    }
    Ok(n as usize)
  }

  pub fn send_to(&self, buf: &[u8], addr: &SockAddr) -> Result<usize> {
    // SAFETY: `buf` is valid for `buf.len()` bytes, `addr` for `addr.len()`.
    let n = unsafe {
      libc::sendto(
        self.raw(),
        buf.as_ptr().cast(),
        buf.len(),
        SEND_FLAGS,
        addr.as_ptr(),
        addr.len(),
      )
    };
    if n < 0 {
      return Err(NetError::last_os_error());
    }
    Ok(n as usize)
  }

  /// Receives into `buf`.
  ///
  /// A stream socket reading 0 bytes into a non-empty buffer has seen the
  /// peer close; that is reported as [`NetError::peer_closed`]. On a
  /// datagram socket 0 bytes is an empty datagram and comes back as `Ok(0)`.
  pub fn recv(&self, buf: &mut [u8]) -> Result<usize> {
    // SAFETY: `buf` is writable for `buf.len()` bytes.
    let n =
      unsafe { libc::recv(self.raw(), buf.as_mut_ptr().cast(), buf.len(), 0) };
    match n {
      n if n < 0 => Err(NetError::last_os_error()),
      0 if !buf.is_empty() && self.is_stream() => {
        Err(NetError::peer_closed())
      }
      n => Ok(n as usize),
    }
  }

  /// Receives up to `count` datagrams into the first records of `batch`.
  ///
  /// Returns how many records were filled, at least one unless `count` is
  /// zero. On a blocking socket only the first datagram is waited for.
  pub fn recv_batch(&self, batch: &mut MsgHeaders, count: usize) -> Result<usize> {
    let count = count.min(batch.len());
    if count == 0 {
      return Ok(0);
    }
    let received = self.recv_batch_impl(batch, count)?;
    tracing::trace!(fd = self.raw(), received, "batch received");
    Ok(received)
  }

  #[cfg(mmsg)]
  fn recv_batch_impl(&self, batch: &mut MsgHeaders, count: usize) -> Result<usize> {
    // SAFETY: `batch` holds at least `count` initialised records, each
    // pointing at its own buffer.
    let n = unsafe {
      libc::recvmmsg(
        self.raw(),
        batch.as_mut_ptr(),
        count as libc::c_uint,
        libc::MSG_WAITFORONE as _,
        std::ptr::null_mut(),
      )
    };
    match n {
      n if n < 0 => Err(NetError::last_os_error()),
      0 => Err(NetError::from_errno(libc::EAGAIN)),
      n => Ok(n as usize),
    }
  }

  // One recvmsg per record. The first call may block; the rest do not.
  #[cfg(not(mmsg))]
  fn recv_batch_impl(&self, batch: &mut MsgHeaders, count: usize) -> Result<usize> {
    let mut received = 0;
    while received < count {
      let flags = if received == 0 { 0 } else { libc::MSG_DONTWAIT };
      // SAFETY: `received < count <= batch.len()`; the record is initialised.
      let n = unsafe {
        libc::recvmsg(
          self.raw(),
          &mut (*batch.as_mut_ptr().add(received)).msg_hdr,
          flags,
        )
      };
      if n < 0 {
        // What was received so far is delivered; the error shows up again
        // on the next call.
        if received > 0 {
          break;
        }
        return Err(NetError::last_os_error());
      }
      batch.set_received_len(received, n as usize);
      received += 1;
    }
    Ok(received)
  }
}
