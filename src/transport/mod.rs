//! Transport layer for the pose data source
//!
//! A transport owns one client connection. The publisher worker opens it,
//! reads raw chunks from it and closes it on exit; nothing else touches it.

use crate::error::Result;

mod mock;
mod tcp;

pub use mock::{MockTransport, OpenFailure};
pub use tcp::TcpSession;

/// Transport trait for the data source connection
pub trait Transport: Send {
    /// Establish the connection.
    ///
    /// On failure every partially created resource is released and the
    /// transport is left not connected.
    fn open(&mut self) -> Result<()>;

    /// Read available bytes into `buffer`, blocking until data arrives.
    ///
    /// `Ok(0)` means the peer closed the connection.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Release the connection. Idempotent; safe if `open` never succeeded.
    fn close(&mut self);

    /// Whether `open` succeeded and `close` has not been called since
    fn is_open(&self) -> bool;
}
