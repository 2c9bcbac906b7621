//! # Application Layer Protocols
//!
//! The two protocol clients a node talks through:
//!
//! - **[`coap`]**: request/response over datagrams, used by actuator nodes to
//!   register with and keep alive against a server.
//! - **[`mqtt`]**: publish/subscribe over a stream, used by sensor nodes to
//!   push readings to a broker.
//!
//! Both work with any type implementing [`Connection`](crate::network::Connection)
//! and use fixed-size buffers only. Neither knows about node state; the
//! [`adapter`](crate::adapter) layer maps their results onto session outcomes.

/// CoAP message codec and confirmable request client.
pub mod coap;

/// MQTT 3.1.1 client with a non-blocking connect handshake.
pub mod mqtt;
