//! Message header batches for multi-datagram receive.
//!
//! A [`MsgHeaders`] is a single allocation:
//!
//! ```text
//! +--------+---------------------+-------------------+---------------------------+
//! | prefix | count x MmsgHdr     | count x iovec     | count x buffer_size bytes |
//! +--------+---------------------+-------------------+---------------------------+
//!            ^ handed out as the batch address
//! ```
//!
//! Header `i` points at iovec `i`, which points at the `i`-th buffer of the
//! slab. A managed caller walks the records with [`MsgHeaders::STRIDE`] and
//! reads the fields at [`MsgHeaders::BUFFER_ADDRESS_OFFSET`] and
//! [`MsgHeaders::BUFFER_LENGTH_OFFSET`] without calling back in.

use std::{
  alloc::{self, Layout},
  io, mem,
  ptr::{self, NonNull},
  slice,
};

/// One record as `recvmmsg(2)` fills it.
#[cfg(mmsg)]
pub type MmsgHdr = libc::mmsghdr;

/// One record, laid out like Linux's `mmsghdr` so the batch looks the same
/// on every platform.
#[cfg(not(mmsg))]
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MmsgHdr {
  pub msg_hdr: libc::msghdr,
  pub msg_len: libc::c_uint,
}

/// Dimensions of a batch, also stored at the start of its allocation so
/// [`MsgHeaders::from_raw`] can recover them from a record address.
#[derive(Clone, Copy)]
struct Shape {
  layout: Layout,
  iovecs: usize,
  slab: usize,
  count: usize,
  buffer_size: usize,
}

/// Distance from the allocation start to the first record. Independent of
/// `count` because an array is aligned like its element.
const HEADERS_OFFSET: usize =
  mem::size_of::<Shape>().next_multiple_of(mem::align_of::<MmsgHdr>());

impl Shape {
  fn new(count: usize, buffer_size: usize) -> io::Result<Shape> {
    let compute = || -> Option<Shape> {
      let slab_len = count.checked_mul(buffer_size)?;
      let (layout, headers) = Layout::new::<Shape>()
        .extend(Layout::array::<MmsgHdr>(count).ok()?)
        .ok()?;
      debug_assert_eq!(headers, HEADERS_OFFSET);
      let (layout, iovecs) =
        layout.extend(Layout::array::<libc::iovec>(count).ok()?).ok()?;
      let (layout, slab) =
        layout.extend(Layout::array::<u8>(slab_len).ok()?).ok()?;
      Some(Shape {
        layout: layout.pad_to_align(),
        iovecs,
        slab,
        count,
        buffer_size,
      })
    };
    compute().ok_or_else(|| {
      io::Error::new(io::ErrorKind::InvalidInput, "message batch too large")
    })
  }

  fn slab_len(&self) -> usize {
    self.count * self.buffer_size
  }
}

/// A batch of `count` receive records with `buffer_size` bytes each.
pub struct MsgHeaders {
  base: NonNull<u8>,
  shape: Shape,
}

// SAFETY: the batch exclusively owns its allocation; the raw pointers inside
// only point into it.
unsafe impl Send for MsgHeaders {}

impl MsgHeaders {
  /// Size of one record.
  pub const STRIDE: usize = mem::size_of::<MmsgHdr>();

  /// Offset of the `msg_iov` pointer inside a record. The `iovec` it points
  /// to starts with the buffer address.
  pub const BUFFER_ADDRESS_OFFSET: usize =
    mem::offset_of!(MmsgHdr, msg_hdr) + mem::offset_of!(libc::msghdr, msg_iov);

  /// Offset of `msg_len` inside a record: bytes the kernel received.
  pub const BUFFER_LENGTH_OFFSET: usize = mem::offset_of!(MmsgHdr, msg_len);

  pub fn new(count: usize, buffer_size: usize) -> io::Result<MsgHeaders> {
    if count == 0 || buffer_size == 0 {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "message count and buffer size must be positive",
      ));
    }
    let shape = Shape::new(count, buffer_size)?;

    // SAFETY: the layout has a non-zero size (count > 0).
    let base = unsafe { alloc::alloc_zeroed(shape.layout) };
    let base = NonNull::new(base).ok_or_else(|| {
      io::Error::new(io::ErrorKind::OutOfMemory, "message headers")
    })?;

    // SAFETY: every offset below lies inside the zeroed allocation and is
    // aligned for its type by `Layout::extend`.
    unsafe {
      base.cast::<Shape>().write(shape);
      let headers = base.add(HEADERS_OFFSET).cast::<MmsgHdr>().as_ptr();
      let iovecs = base.add(shape.iovecs).cast::<libc::iovec>().as_ptr();
      let slab = base.add(shape.slab).as_ptr();
      for i in 0..count {
        let iov = iovecs.add(i);
        iov.write(libc::iovec {
          iov_base: slab.add(i * buffer_size).cast(),
          iov_len: buffer_size,
        });
        let hdr = &mut (*headers.add(i)).msg_hdr;
        hdr.msg_iov = iov;
        hdr.msg_iovlen = 1;
      }
    }

    tracing::debug!(
      count,
      buffer_size,
      bytes = shape.layout.size(),
      "message headers allocated"
    );
    Ok(MsgHeaders { base, shape })
  }

  pub fn len(&self) -> usize {
    self.shape.count
  }

  pub fn is_empty(&self) -> bool {
    self.shape.count == 0
  }

  pub fn buffer_size(&self) -> usize {
    self.shape.buffer_size
  }

  /// Address of the first record.
  pub fn as_mut_ptr(&mut self) -> *mut MmsgHdr {
    // SAFETY: HEADERS_OFFSET is inside the allocation.
    unsafe { self.base.add(HEADERS_OFFSET).cast().as_ptr() }
  }

  pub fn headers(&self) -> &[MmsgHdr] {
    // SAFETY: `count` initialised records start at HEADERS_OFFSET.
    unsafe {
      slice::from_raw_parts(
        self.base.add(HEADERS_OFFSET).cast::<MmsgHdr>().as_ptr(),
        self.shape.count,
      )
    }
  }

  fn slab(&self) -> &[u8] {
    // SAFETY: the slab is `count * buffer_size` zero-initialised bytes.
    unsafe {
      slice::from_raw_parts(
        self.base.add(self.shape.slab).as_ptr(),
        self.shape.slab_len(),
      )
    }
  }

  /// Bytes received into record `i` by the last batch receive.
  ///
  /// # Panics
  /// If `i >= len()`.
  pub fn received_len(&self, i: usize) -> usize {
    (self.headers()[i].msg_len as usize).min(self.shape.buffer_size)
  }

  pub(crate) fn set_received_len(&mut self, i: usize, len: usize) {
    assert!(i < self.shape.count);
    // SAFETY: `i` is in bounds.
    unsafe { (*self.as_mut_ptr().add(i)).msg_len = len as libc::c_uint }
  }

  /// The datagram received into record `i`.
  ///
  /// # Panics
  /// If `i >= len()`.
  pub fn message(&self, i: usize) -> &[u8] {
    let start = i * self.shape.buffer_size;
    &self.slab()[start..start + self.received_len(i)]
  }

  /// The first `received` datagrams, as returned by a batch receive.
  pub fn messages(&self, received: usize) -> impl Iterator<Item = &[u8]> {
    (0..received.min(self.shape.count)).map(|i| self.message(i))
  }

  #[cfg(feature = "bytes")]
  pub fn to_bytes(&self, i: usize) -> bytes::Bytes {
    bytes::Bytes::copy_from_slice(self.message(i))
  }

  /// Gives up ownership, returning the address of the first record.
  pub fn into_raw(self) -> *mut MmsgHdr {
    let mut this = mem::ManuallyDrop::new(self);
    this.as_mut_ptr()
  }

  /// Takes back a batch released by [`into_raw`](MsgHeaders::into_raw).
  ///
  /// # Safety
  /// `ptr` must come from `into_raw` and not have been reclaimed before.
  pub unsafe fn from_raw(ptr: *mut MmsgHdr) -> MsgHeaders {
    // SAFETY: `ptr` sits HEADERS_OFFSET bytes into a batch allocation that
    // starts with its shape.
    unsafe {
      let base = ptr.cast::<u8>().sub(HEADERS_OFFSET);
      let shape = ptr::read(base.cast::<Shape>());
      MsgHeaders { base: NonNull::new_unchecked(base), shape }
    }
  }
}

impl Drop for MsgHeaders {
  fn drop(&mut self) {
    #[cfg(feature = "zeroize")]
    {
      use zeroize::Zeroize;
      // SAFETY: the slab is owned and about to be freed.
      unsafe {
        slice::from_raw_parts_mut(
          self.base.add(self.shape.slab).as_ptr(),
          self.shape.slab_len(),
        )
      }
      .zeroize();
    }
    // SAFETY: allocated in `new` with this exact layout.
    unsafe { alloc::dealloc(self.base.as_ptr(), self.shape.layout) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_sizes_are_rejected() {
    for (count, size) in [(0, 64), (8, 0), (0, 0)] {
      let err = MsgHeaders::new(count, size).err().unwrap();
      assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
  }

  #[test]
  fn overflowing_sizes_are_rejected() {
    assert!(MsgHeaders::new(usize::MAX / 2, 4).is_err());
  }

  #[test]
  fn layout_constants_describe_records() {
    assert_eq!(MsgHeaders::STRIDE, mem::size_of::<MmsgHdr>());
    assert!(
      MsgHeaders::BUFFER_ADDRESS_OFFSET + mem::size_of::<usize>()
        <= MsgHeaders::STRIDE
    );
    assert!(
      MsgHeaders::BUFFER_LENGTH_OFFSET + mem::size_of::<libc::c_uint>()
        <= MsgHeaders::STRIDE
    );
  }

  #[test]
  fn records_point_into_distinct_buffers() {
    let mut batch = MsgHeaders::new(4, 128).unwrap();
    let base = batch.as_mut_ptr().cast::<u8>();
    let mut previous = None;
    for i in 0..4 {
      // SAFETY: reading the layout the way a managed caller would.
      let (address, len) = unsafe {
        let record = base.add(i * MsgHeaders::STRIDE);
        let iov = *record
          .add(MsgHeaders::BUFFER_ADDRESS_OFFSET)
          .cast::<*const *const u8>();
        let len = *record
          .add(MsgHeaders::BUFFER_LENGTH_OFFSET)
          .cast::<libc::c_uint>();
        (*iov as usize, len)
      };
      assert_eq!(len, 0);
      if let Some(prev) = previous {
        assert_eq!(address - prev, 128);
      }
      previous = Some(address);
    }
  }

  #[test]
  fn messages_follow_received_lengths() {
    let mut batch = MsgHeaders::new(3, 16).unwrap();
    batch.set_received_len(0, 5);
    batch.set_received_len(1, 100);
    assert_eq!(batch.message(0).len(), 5);
    assert_eq!(batch.message(1).len(), 16);
    assert_eq!(batch.messages(2).count(), 2);
    assert_eq!(batch.messages(10).count(), 3);
  }

  #[test]
  fn raw_round_trip_keeps_dimensions() {
    let batch = MsgHeaders::new(7, 33).unwrap();
    let raw = batch.into_raw();
    // SAFETY: `raw` came from `into_raw`.
    let batch = unsafe { MsgHeaders::from_raw(raw) };
    assert_eq!(batch.len(), 7);
    assert_eq!(batch.buffer_size(), 33);
  }
}
