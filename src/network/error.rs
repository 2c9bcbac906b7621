//! Transport and protocol errors shared by the CoAP and MQTT clients.

/// Why a network operation failed.
///
/// Adapters only care about two things here: whether the peer never
/// answered ([`Error::Timeout`]) or whether the exchange failed for any
/// other reason. The finer variants exist for logging.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No connection is open, or the session is not established yet.
    NotOpen,
    /// The transport refused or truncated an outgoing write.
    WriteError,
    /// The transport failed while reading.
    ReadError,
    /// The peer reset the exchange or refused the session.
    ConnectionRefused,
    /// No answer arrived before the deadline.
    Timeout,
    /// The peer closed the transport.
    ConnectionClosed,
    /// The configured peer address is unusable.
    InvalidAddress,
    /// The peer sent bytes that do not decode.
    ProtocolError,
    /// A message did not fit in its fixed-size buffer.
    BufferOverflow,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotOpen => "not open",
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::ConnectionRefused => "refused by peer",
            Error::Timeout => "timed out",
            Error::ConnectionClosed => "closed by peer",
            Error::InvalidAddress => "invalid address",
            Error::ProtocolError => "protocol error",
            Error::BufferOverflow => "buffer overflow",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
        }
    }
}
