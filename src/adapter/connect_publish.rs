use super::{Outcome, ProtocolAdapter, Progress, SessionContext, SessionNotification};
use crate::network::application::mqtt::{Client, Notification, Options, QoS};
use crate::network::error::Error;
use crate::network::{Connect, Read};
use crate::node::{ConfigError, DeviceIdentity};
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Capacity of an outbound configuration message.
pub const BODY_LEN: usize = 64;

/// The broker operations the adapter relies on.
pub trait PubSubClient {
    /// Submit a session request; the answer comes through [`poll`](Self::poll).
    fn connect(&mut self) -> Result<(), Error>;

    /// Publish `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error>;

    /// Send a PINGREQ.
    fn ping(&mut self) -> Result<(), Error>;

    /// Send DISCONNECT and drop the transport.
    fn disconnect(&mut self);

    /// Next inbound event, `Ok(None)` when nothing is pending.
    fn poll(&mut self) -> Result<Option<Notification>, Error>;
}

impl<N> PubSubClient for Client<N>
where
    N: Connect,
    N::Connection: Read<Error = Error>,
{
    fn connect(&mut self) -> Result<(), Error> {
        Client::connect(self)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        Client::publish(self, topic, payload, qos)
    }

    fn ping(&mut self) -> Result<(), Error> {
        Client::ping(self)
    }

    fn disconnect(&mut self) {
        Client::disconnect(self)
    }

    fn poll(&mut self) -> Result<Option<Notification>, Error> {
        Client::poll(self)
    }
}

/// Broker location and session parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectPublishConfig {
    /// Broker address, `host:port`.
    pub broker: String<64>,
    /// Topic the selected sampling interval is announced on.
    pub configuration_topic: String<32>,
    /// Broker-side keep-alive, three publish intervals.
    pub keep_alive_secs: u16,
}

impl Default for ConnectPublishConfig {
    fn default() -> Self {
        Self {
            broker: String::try_from("[fd00::1]:1883").unwrap_or_default(),
            configuration_topic: String::try_from("configuration").unwrap_or_default(),
            keep_alive_secs: 90,
        }
    }
}

impl ConnectPublishConfig {
    /// Load from a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let (config, _) =
            serde_json_core::from_slice::<Self>(json).map_err(|_| ConfigError::Parse)?;
        if config.broker.is_empty() {
            return Err(ConfigError::InvalidValue("broker"));
        }
        if config.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidValue("keep_alive_secs"));
        }
        Ok(config)
    }

    /// Client options for `identity` with the configured keep-alive.
    pub fn client_options(&self, identity: &DeviceIdentity) -> Result<Options, Error> {
        Options::new(&identity.client_id(), self.keep_alive_secs)
    }
}

#[derive(Serialize)]
struct Configuration<'a> {
    #[serde(rename = "i")]
    id: &'a str,
    #[serde(rename = "t")]
    type_tag: &'a str,
    #[serde(rename = "s")]
    sampling: u16,
}

/// `{"i":"<hex id>","t":"<type tag>","s":<sampling interval>}`
pub fn configuration_body(ctx: &SessionContext<'_>) -> Result<Vec<u8, BODY_LEN>, Error> {
    let id = ctx.identity.hex_id();
    let message = Configuration {
        id: &id,
        type_tag: ctx.identity.type_tag(),
        sampling: ctx.session_value,
    };
    let mut buf = [0u8; BODY_LEN];
    let len = serde_json_core::to_slice(&message, &mut buf).map_err(|_| Error::BufferOverflow)?;
    Vec::from_slice(&buf[..len]).map_err(|_| Error::BufferOverflow)
}

/// Publishes configuration and readings to a broker.
#[derive(Debug)]
pub struct ConnectPublishAdapter<P: PubSubClient> {
    client: P,
    config: ConnectPublishConfig,
}

impl<P: PubSubClient> ConnectPublishAdapter<P> {
    /// Adapter driving `client`.
    pub fn new(client: P, config: ConnectPublishConfig) -> Self {
        Self { client, config }
    }

    /// The underlying client.
    pub fn client(&self) -> &P {
        &self.client
    }

    /// Mutable access to the underlying client.
    pub fn client_mut(&mut self) -> &mut P {
        &mut self.client
    }

    fn submit(&mut self, what: &str, result: Result<(), Error>) -> Outcome {
        match result {
            Ok(()) => {
                log::debug!("{} submitted", what);
                Outcome::Accepted
            }
            Err(e) => {
                log::warn!("{} not submitted: {}", what, e);
                Outcome::Rejected
            }
        }
    }
}

impl<P: PubSubClient> ProtocolAdapter for ConnectPublishAdapter<P> {
    fn begin_session(&mut self, _ctx: &SessionContext<'_>) -> Progress {
        match self.client.connect() {
            Ok(()) => {
                log::info!("Connecting to broker {}", self.config.broker);
                Progress::Pending
            }
            Err(e) => {
                log::warn!("Cannot reach broker {}: {}", self.config.broker, e);
                Progress::Resolved(Outcome::Rejected)
            }
        }
    }

    fn send_keepalive(&mut self, _ctx: &SessionContext<'_>) -> Outcome {
        let result = self.client.ping();
        self.submit("Ping", result)
    }

    fn send_configuration(&mut self, ctx: &SessionContext<'_>) -> Outcome {
        let result = configuration_body(ctx).and_then(|body| {
            self.client
                .publish(&self.config.configuration_topic, &body, QoS::AtMostOnce)
        });
        self.submit("Configuration", result)
    }

    fn send_reading(&mut self, ctx: &SessionContext<'_>, payload: &[u8]) -> Outcome {
        let Some(topic) = ctx.identity.kind().data_topic() else {
            log::warn!("{} nodes publish no readings", ctx.identity.type_tag());
            return Outcome::Rejected;
        };
        let result = self.client.publish(topic, payload, QoS::AtMostOnce);
        self.submit("Reading", result)
    }

    fn poll_notification(&mut self) -> Option<SessionNotification> {
        loop {
            match self.client.poll() {
                Ok(Some(Notification::Connected)) => {
                    log::info!("Broker accepted the session");
                    return Some(SessionNotification::Connected);
                }
                Ok(Some(Notification::Refused(code))) => {
                    log::warn!("Broker refused the session (return code {})", code);
                    return Some(SessionNotification::Disconnected);
                }
                Ok(Some(Notification::Disconnected)) => {
                    log::warn!("Broker connection lost");
                    return Some(SessionNotification::Disconnected);
                }
                Ok(Some(Notification::Publish(packet))) => {
                    log::debug!("Ignoring message on {}", packet.topic);
                }
                Ok(None) => return None,
                Err(e) => {
                    log::warn!("Discarding broker packet: {}", e);
                    return None;
                }
            }
        }
    }

    fn abort_session(&mut self) {
        self.client.disconnect();
    }

    fn announces_configuration(&self) -> bool {
        true
    }
}
