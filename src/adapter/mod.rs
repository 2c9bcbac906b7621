//! Session protocols.
//!
//! The state machine only knows how to open a session, keep it alive, push
//! the selected configuration and (for sensors) publish a reading. Each of
//! those resolves to an [`Outcome`]. How the bytes move is up to the
//! adapter:
//!
//! - [`RequestResponseAdapter`]: blocking confirmable requests, every call
//!   resolves before it returns.
//! - [`ConnectPublishAdapter`]: the session handshake completes later and is
//!   reported through [`ProtocolAdapter::poll_notification`].

use crate::network::ADDRESS_LEN;
use crate::node::DeviceIdentity;
use heapless::String;

/// Publish/subscribe session over an MQTT broker.
pub mod connect_publish;

/// Registration and keepalive over confirmable CoAP requests.
pub mod request_response;

pub use connect_publish::{ConnectPublishAdapter, ConnectPublishConfig, PubSubClient};
pub use request_response::{RequestResponseAdapter, RequestResponseConfig, RequestTransport};

/// How one outbound action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The counterpart confirmed.
    Accepted,
    /// The counterpart answered negatively, or the action could not be sent.
    Rejected,
    /// Nothing came back before the deadline.
    TimedOut,
}

/// Result of starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The outcome is already known.
    Resolved(Outcome),
    /// The outcome arrives later as a [`SessionNotification`].
    Pending,
}

/// Asynchronous session change reported by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotification {
    /// The pending handshake completed.
    Connected,
    /// The handshake was refused or the session dropped.
    Disconnected,
}

/// What an adapter needs to build its messages.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    /// Who is talking.
    pub identity: &'a DeviceIdentity,
    /// The node's global address, empty when unknown.
    pub address: &'a String<ADDRESS_LEN>,
    /// Currently selected session value in seconds.
    pub session_value: u16,
}

/// One session protocol.
pub trait ProtocolAdapter {
    /// Open a session once connectivity is available.
    fn begin_session(&mut self, ctx: &SessionContext<'_>) -> Progress;

    /// Refresh an established session.
    fn send_keepalive(&mut self, ctx: &SessionContext<'_>) -> Outcome;

    /// Announce the currently selected session value.
    fn send_configuration(&mut self, ctx: &SessionContext<'_>) -> Outcome;

    /// Publish a serialized reading.
    fn send_reading(&mut self, _ctx: &SessionContext<'_>, _payload: &[u8]) -> Outcome {
        Outcome::Rejected
    }

    /// Next session change, if any arrived since the last call.
    fn poll_notification(&mut self) -> Option<SessionNotification> {
        None
    }

    /// Forget a session that was given up on.
    fn abort_session(&mut self) {}

    /// Whether a freshly opened session should be followed by a
    /// configuration push.
    fn announces_configuration(&self) -> bool {
        false
    }
}
