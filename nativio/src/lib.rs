#![cfg_attr(docsrs, feature(doc_cfg))]

//! # nativio
//!
//! Native socket primitives and vector kernels for a managed-language
//! ingestion and query engine.
//!
//! The crate is a synchronous syscall façade. It never spawns threads and
//! never waits for readiness; an event loop above it decides when to call.
//!
//! - [`net::Socket`]: creation, tuning, bind/listen/accept/connect and
//!   transfer on one owned descriptor.
//! - [`MsgHeaders`]: pre-allocated records for receiving many datagrams
//!   with a single `recvmmsg(2)`, with a byte layout a foreign caller can
//!   walk directly.
//! - [`ErrorClass`]: every failure reduced to retry, peer disconnect or
//!   other disconnect.
//! - [`DatagramReceiver`]: a ready-made batched UDP receive loop.
//! - [`vect`]: `f64` reductions dispatched to the CPU's widest instruction
//!   set.
//! - `ffi` (feature `ffi`, default): the C ABI over all of the above.
//!
//! ## Platform support
//!
//! | Platform   | Batch receive             |
//! |------------|---------------------------|
//! | Linux      | `recvmmsg`                |
//! | Android    | `recvmmsg`                |
//! | macOS, BSD | `recvmsg` per datagram    |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use nativio::{ErrorClass, MsgHeaders, net::Socket};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = Socket::udp()?;
//! socket.bind(0, 9009)?;
//!
//! let mut batch = MsgHeaders::new(64, 2048)?;
//! match socket.recv_batch(&mut batch, 64) {
//!   Ok(n) => {
//!     for datagram in batch.messages(n) {
//!       println!("{} bytes", datagram.len());
//!     }
//!   }
//!   Err(err) if err.class() == ErrorClass::Retry => {}
//!   Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Events go through [`tracing`]; install a subscriber to see them.

#[cfg(not(unix))]
compile_error!("nativio supports unix targets only");

#[macro_use]
mod macros;

pub mod addr;
pub mod dump;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod msg;
pub mod net;
pub mod receiver;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

pub use nativio_vect as vect;

pub use addr::{AddressFamily, SockAddr};
pub use error::{ErrorClass, NetError};
pub use msg::MsgHeaders;
pub use receiver::{
  ConfigError, DatagramReceiver, DatagramSink, ReceiverConfig, ReceiverError,
};
