//! An MQTT client implementation based on the MQTT 3.1.1 specification.
use crate::network::error::Error;
use crate::network::{Close, Connect, Read, Write};
use heapless::{String, Vec};

// MQTT Control Packet types
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PINGREQ: u8 = 0xC0;
const DISCONNECT: u8 = 0xE0;

// Protocol constants
const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// Longest client identifier every 3.1.1 broker must accept.
pub const MAX_CLIENT_ID_LEN: usize = 23;
/// Largest broker address the client keeps.
pub const MAX_BROKER_LEN: usize = 64;
/// Largest packet body handled by [`Client::poll`] and [`Client::publish`].
pub const MAX_PACKET_LEN: usize = 512;

/// An incoming publish packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic of the message.
    pub topic: String<64>,
    /// The payload of the message.
    pub payload: Vec<u8, 256>,
}

/// Quality of Service levels for MQTT messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery.
    AtLeastOnce = 1,
    /// Exactly once delivery.
    ExactlyOnce = 2,
}

/// Session events reported by [`Client::poll`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Notification {
    /// The broker accepted the connection.
    Connected,
    /// The broker refused the connection with the given return code.
    Refused(u8),
    /// The connection was lost or closed.
    Disconnected,
    /// A message arrived on a subscribed topic.
    Publish(PublishPacket),
}

/// Options for configuring the MQTT client connection.
#[derive(Debug, Clone)]
pub struct Options {
    /// The client identifier, must be unique.
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    /// The keep-alive time in seconds.
    pub keep_alive_seconds: u16,
    /// Whether to start a clean session.
    pub clean_session: bool,
}

impl Options {
    /// Clean-session options for `client_id`.
    pub fn new(client_id: &str, keep_alive_seconds: u16) -> Result<Self, Error> {
        Ok(Self {
            client_id: String::try_from(client_id).map_err(|_| Error::BufferOverflow)?,
            keep_alive_seconds,
            clean_session: true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Idle,
    AwaitingConnAck,
    Connected,
}

/// An MQTT 3.1.1 client that opens its own transport through a [`Connect`].
pub struct Client<N: Connect> {
    network: N,
    broker: String<MAX_BROKER_LEN>,
    options: Options,
    connection: Option<N::Connection>,
    session: Session,
}

impl<N: Connect> core::fmt::Debug for Client<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("broker", &self.broker)
            .field("client_id", &self.options.client_id)
            .field("session", &self.session)
            .field("open", &self.connection.is_some())
            .finish()
    }
}

impl<N> Client<N>
where
    N: Connect,
    N::Connection: Read<Error = Error>,
{
    /// Creates a client for `broker`; nothing is sent until [`connect`](Self::connect).
    pub fn new(network: N, broker: &str, options: Options) -> Result<Self, Error> {
        Ok(Self {
            network,
            broker: String::try_from(broker).map_err(|_| Error::InvalidAddress)?,
            options,
            connection: None,
            session: Session::Idle,
        })
    }

    /// Whether a `CONNACK` accepting the session has been received.
    pub fn is_connected(&self) -> bool {
        self.session == Session::Connected
    }

    /// Opens the transport and submits a `CONNECT` packet.
    ///
    /// The result of the handshake is reported later by [`poll`](Self::poll).
    /// Any previous connection is dropped first.
    pub fn connect(&mut self) -> Result<(), Error> {
        self.drop_connection();

        let mut connection = self
            .network
            .connect(&self.broker)
            .map_err(|_| Error::ConnectionRefused)?;

        // --- Variable Header ---
        let mut vh: Vec<u8, 10> = Vec::new();
        extend(&mut vh, &(PROTOCOL_NAME.len() as u16).to_be_bytes())?;
        extend(&mut vh, PROTOCOL_NAME)?;
        extend(&mut vh, &[PROTOCOL_LEVEL])?;

        let mut connect_flags = 0;
        if self.options.clean_session {
            connect_flags |= 0x02;
        }
        extend(&mut vh, &[connect_flags])?;
        extend(&mut vh, &self.options.keep_alive_seconds.to_be_bytes())?;

        // --- Payload ---
        let mut payload: Vec<u8, 32> = Vec::new();
        let client_id_bytes = self.options.client_id.as_bytes();
        extend(&mut payload, &(client_id_bytes.len() as u16).to_be_bytes())?;
        extend(&mut payload, client_id_bytes)?;

        // --- Fixed Header ---
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        extend(&mut fixed_header, &[CONNECT])?;
        encode_remaining_length(&mut fixed_header, vh.len() + payload.len())?;

        write_all(&mut connection, &[&fixed_header, &vh, &payload])?;

        self.connection = Some(connection);
        self.session = Session::AwaitingConnAck;
        Ok(())
    }

    /// Publishes a message to a topic.
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        if self.session != Session::Connected {
            return Err(Error::NotOpen);
        }

        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        // --- Variable Header ---
        let topic_bytes = topic.as_bytes();
        extend(&mut packet, &(topic_bytes.len() as u16).to_be_bytes())?;
        extend(&mut packet, topic_bytes)?;
        if qos != QoS::AtMostOnce {
            // Packet identifier, fixed since nothing is retransmitted.
            extend(&mut packet, &1u16.to_be_bytes())?;
        }

        // --- Payload ---
        extend(&mut packet, payload)?;

        // --- Fixed Header ---
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        extend(&mut fixed_header, &[PUBLISH | ((qos as u8) << 1)])?;
        encode_remaining_length(&mut fixed_header, packet.len())?;

        self.send(&[&fixed_header, &packet])
    }

    /// Sends a `PINGREQ`; the `PINGRESP` is consumed by [`poll`](Self::poll).
    pub fn ping(&mut self) -> Result<(), Error> {
        if self.session != Session::Connected {
            return Err(Error::NotOpen);
        }
        self.send(&[&[PINGREQ, 0x00]])
    }

    /// Sends `DISCONNECT` when connected and closes the transport.
    pub fn disconnect(&mut self) {
        if self.session == Session::Connected {
            let _ = self.send(&[&[DISCONNECT, 0x00]]);
        }
        self.drop_connection();
    }

    /// Reads at most one packet from the broker.
    ///
    /// Returns `Ok(None)` when no data is pending. A transport failure closes
    /// the connection and is reported as [`Notification::Disconnected`].
    pub fn poll(&mut self) -> Result<Option<Notification>, Error> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(None);
        };

        let mut header_buf = [0u8; 1];
        match connection.read(&mut header_buf) {
            Ok(0) | Err(Error::Timeout) => return Ok(None),
            Ok(_) => {}
            Err(_) => return Ok(Some(self.lose_connection())),
        }

        let body = match read_packet_body(connection) {
            Ok(body) => body,
            // The stream cannot be resynchronised after a short or oversized read.
            Err(_) => return Ok(Some(self.lose_connection())),
        };

        match header_buf[0] & 0xF0 {
            CONNACK => {
                if body.len() != 2 {
                    return Err(Error::ProtocolError);
                }
                match body[1] {
                    0 => {
                        self.session = Session::Connected;
                        Ok(Some(Notification::Connected))
                    }
                    code => {
                        self.drop_connection();
                        Ok(Some(Notification::Refused(code)))
                    }
                }
            }
            PUBLISH => {
                if body.len() < 2 {
                    return Err(Error::ProtocolError);
                }
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                if body.len() < 2 + topic_len {
                    return Err(Error::ProtocolError);
                }
                let topic = core::str::from_utf8(&body[2..2 + topic_len])
                    .map_err(|_| Error::ProtocolError)?;
                let mut payload_start = 2 + topic_len;
                if header_buf[0] & 0x06 != 0 {
                    payload_start += 2;
                }
                let payload = body.get(payload_start..).ok_or(Error::ProtocolError)?;

                Ok(Some(Notification::Publish(PublishPacket {
                    topic: String::try_from(topic).map_err(|_| Error::BufferOverflow)?,
                    payload: Vec::from_slice(payload).map_err(|_| Error::BufferOverflow)?,
                })))
            }
            // PINGRESP, and anything else a QoS 0 publisher does not act on.
            _ => Ok(None),
        }
    }

    fn send(&mut self, parts: &[&[u8]]) -> Result<(), Error> {
        let connection = self.connection.as_mut().ok_or(Error::NotOpen)?;
        write_all(connection, parts)
    }

    fn lose_connection(&mut self) -> Notification {
        self.drop_connection();
        Notification::Disconnected
    }

    fn drop_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
        self.session = Session::Idle;
    }
}

fn extend<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes)
        .map_err(|_| Error::BufferOverflow)
}

fn write_all<W: Write>(connection: &mut W, parts: &[&[u8]]) -> Result<(), Error> {
    for part in parts {
        connection.write(part).map_err(|_| Error::WriteError)?;
    }
    connection.flush().map_err(|_| Error::WriteError)
}

fn read_exact<R: Read<Error = Error>>(connection: &mut R, buf: &mut [u8]) -> Result<(), Error> {
    let mut total_read = 0;
    while total_read < buf.len() {
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(n) => total_read += n,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn read_packet_body<R: Read<Error = Error>>(
    connection: &mut R,
) -> Result<Vec<u8, MAX_PACKET_LEN>, Error> {
    let mut remaining_len = 0usize;
    let mut multiplier = 1usize;
    for _ in 0..4 {
        let mut byte = [0u8; 1];
        read_exact(connection, &mut byte)?;
        remaining_len += (byte[0] as usize & 127) * multiplier;
        multiplier *= 128;
        if byte[0] & 0x80 == 0 {
            let mut body = Vec::new();
            body.resize(remaining_len, 0)
                .map_err(|_| Error::ProtocolError)?;
            read_exact(connection, &mut body)?;
            return Ok(body);
        }
    }
    Err(Error::ProtocolError)
}

/// Encodes the remaining length field for an MQTT packet.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), Error> {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).map_err(|_| Error::BufferOverflow)?;
        if len == 0 {
            break;
        }
    }
    Ok(())
}
