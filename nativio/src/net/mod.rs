//! Synchronous socket primitives for an external event loop.
//!
//! [`Socket`] owns one descriptor and exposes the calls an event loop needs
//! around it: creation, tuning, connection management and transfer. No
//! call waits for readiness or retries on its own; a socket in non-blocking
//! mode answers "not now" with an error of class
//! [`Retry`](crate::ErrorClass::Retry), and the caller decides when to come
//! back.
//!
//! ```rust,no_run
//! use nativio::{ErrorClass, net::Socket};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = Socket::tcp(false)?;
//! listener.set_reuse_address(true)?;
//! listener.bind(0x7f00_0001, 9009)?;
//! listener.listen(128)?;
//!
//! match listener.accept() {
//!   Ok(conn) => conn.set_tcp_no_delay(true)?,
//!   Err(err) if err.class() == ErrorClass::Retry => { /* poll again */ }
//!   Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

mod options;
mod socket;
mod transfer;

pub(crate) use socket::debug_assert_open;
pub use socket::{Connect, Socket, is_dead};
