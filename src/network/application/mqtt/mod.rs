//! MQTT 3.1.1 client for nodes that publish to a broker.
//!
//! Unlike a desktop client, the connect handshake here never blocks:
//! [`Client::connect`] only submits `CONNECT`, and the `CONNACK` (or a lost
//! connection) surfaces later from [`Client::poll`] as a
//! [`Notification`]. This lets a single cooperative task keep servicing
//! buttons and timers while the broker answers.
//!
//! ```rust,no_run
//! use libiot_node::network::application::mqtt::{Client, Notification, Options, QoS};
//! # use libiot_node::network::{Close, Connect, Connection, Read, Write};
//! # use libiot_node::network::error::Error;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl Read for MockConnection {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for MockConnection {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for MockConnection {
//! #     type Error = Error;
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct MockNetwork;
//! # impl Connect for MockNetwork {
//! #     type Connection = MockConnection;
//! #     type Error = Error;
//! #     fn connect(&mut self, _remote: &str) -> Result<MockConnection, Error> { Ok(MockConnection) }
//! # }
//!
//! let options = Options::new("00124b0a0b0c", 90).unwrap();
//! let mut client = Client::new(MockNetwork, "[fd00::1]:1883", options).unwrap();
//!
//! client.connect()?;
//! if let Some(Notification::Connected) = client.poll()? {
//!     client.publish("weight", br#"{"i":"f00d","w":42}"#, QoS::AtMostOnce)?;
//! }
//! # Ok::<(), Error>(())
//! ```

/// MQTT client implementation and supporting types.
pub mod client;

pub use client::{Client, Notification, Options, PublishPacket, QoS};
