//! Transport abstraction used by the protocol clients and adapters.
//!
//! The traits here are deliberately small: a node only ever needs to push a
//! datagram or stream of bytes out, read the answer back, and know whether
//! the network layer has a routable address yet. Everything above that
//! (CoAP, MQTT) lives in [`application`].

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::time::Duration;
use heapless::String;

/// Common error types for network operations
pub mod error;

/// Application layer protocol clients
pub mod application;

/// Maximum length of a textual IPv6 address.
pub const ADDRESS_LEN: usize = 40;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Clock, Close, Connect, Connectivity, Read, ReadTimeout, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// Connections that can bound how long a read may block.
///
/// A read that runs past the timeout must fail with
/// [`Error::Timeout`](error::Error::Timeout).
pub trait ReadTimeout {
    /// Set the read timeout, `None` blocks forever.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), error::Error>;
}

/// Monotonic time, used to bound an exchange that spans several reads.
pub trait Clock {
    /// Time since an arbitrary fixed origin. Never goes backwards.
    fn now(&self) -> Duration;
}

/// Network-layer readiness as seen by the node.
///
/// A node is considered reachable once it holds a preferred global address
/// and has a default route.
pub trait Connectivity {
    /// Whether a global address and a default route are both available.
    fn has_global_connectivity(&self) -> bool;

    /// The node's current global address, if any.
    fn global_address(&self) -> Option<String<ADDRESS_LEN>>;
}
