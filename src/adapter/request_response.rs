use super::{Outcome, ProtocolAdapter, Progress, SessionContext};
use crate::network::application::coap::{Client, Code};
use crate::network::error::Error;
use crate::network::{Clock, Connection, Read, ReadTimeout};
use core::time::Duration;
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Capacity of an outbound request body.
pub const BODY_LEN: usize = 128;

/// Capacity of a configured resource path.
pub const PATH_LEN: usize = 32;

/// A blocking request with a bounded wait.
pub trait RequestTransport {
    /// POST `body` to `path`; `Err(Error::Timeout)` when no response arrives
    /// within `timeout`.
    fn post(&mut self, path: &str, body: &[u8], timeout: Duration) -> Result<Code, Error>;
}

impl<C, K> RequestTransport for Client<C, K>
where
    C: Connection + Read<Error = Error> + ReadTimeout,
    K: Clock,
{
    fn post(&mut self, path: &str, body: &[u8], timeout: Duration) -> Result<Code, Error> {
        Client::post(self, path, body, timeout)
    }
}

/// Server resources and request deadline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestResponseConfig {
    /// Resource a session is opened on.
    pub registration_path: String<PATH_LEN>,
    /// Resource refreshed on every keepalive.
    pub keepalive_path: String<PATH_LEN>,
    /// Where a changed keepalive period is announced.
    pub configuration_path: String<PATH_LEN>,
    /// How long one request may wait for its response.
    pub request_timeout_secs: u32,
}

fn path(text: &str) -> String<PATH_LEN> {
    String::try_from(text).unwrap_or_default()
}

impl Default for RequestResponseConfig {
    fn default() -> Self {
        Self {
            registration_path: path("/registration"),
            keepalive_path: path("/keepalive"),
            configuration_path: path("/registration"),
            request_timeout_secs: 10,
        }
    }
}

impl RequestResponseConfig {
    /// Load from a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &[u8]) -> Result<Self, crate::node::ConfigError> {
        use crate::node::ConfigError;

        let (config, _) =
            serde_json_core::from_slice::<Self>(json).map_err(|_| ConfigError::Parse)?;
        if config.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("request_timeout_secs"));
        }
        Ok(config)
    }

    /// [`request_timeout_secs`](Self::request_timeout_secs) as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.into())
    }
}

#[derive(Serialize)]
struct Registration<'a> {
    #[serde(rename = "i")]
    id: &'a str,
    #[serde(rename = "ip")]
    address: &'a str,
    #[serde(rename = "t")]
    type_tag: &'a str,
    #[serde(rename = "k")]
    keepalive: u16,
}

#[derive(Serialize)]
struct Keepalive<'a> {
    #[serde(rename = "i")]
    id: &'a str,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8, BODY_LEN>, Error> {
    let mut buf = [0u8; BODY_LEN];
    let len = serde_json_core::to_slice(value, &mut buf).map_err(|_| Error::BufferOverflow)?;
    Vec::from_slice(&buf[..len]).map_err(|_| Error::BufferOverflow)
}

/// `{"i":"<hex id>","ip":"<address>","t":"<type tag>","k":<keepalive>}`
pub fn registration_body(ctx: &SessionContext<'_>) -> Result<Vec<u8, BODY_LEN>, Error> {
    let id = ctx.identity.hex_id();
    encode(&Registration {
        id: &id,
        address: ctx.address,
        type_tag: ctx.identity.type_tag(),
        keepalive: ctx.session_value,
    })
}

/// `{"i":"<hex id>"}`
pub fn keepalive_body(ctx: &SessionContext<'_>) -> Result<Vec<u8, BODY_LEN>, Error> {
    let id = ctx.identity.hex_id();
    encode(&Keepalive { id: &id })
}

/// Registers with the server and keeps the registration alive with
/// confirmable POSTs.
#[derive(Debug)]
pub struct RequestResponseAdapter<T: RequestTransport> {
    transport: T,
    config: RequestResponseConfig,
}

impl<T: RequestTransport> RequestResponseAdapter<T> {
    /// Adapter sending over `transport`.
    pub fn new(transport: T, config: RequestResponseConfig) -> Self {
        Self { transport, config }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn exchange(&mut self, what: &str, path: &str, body: Result<Vec<u8, BODY_LEN>, Error>) -> Outcome {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                log::error!("Cannot build {} body: {}", what, e);
                return Outcome::Rejected;
            }
        };

        match self.transport.post(path, &body, self.config.request_timeout()) {
            Ok(code) if code.is_success() => {
                log::info!("{} accepted ({})", what, code);
                Outcome::Accepted
            }
            Ok(code) => {
                log::warn!("{} rejected ({})", what, code);
                Outcome::Rejected
            }
            Err(Error::Timeout) => {
                log::warn!("{} timed out", what);
                Outcome::TimedOut
            }
            Err(e) => {
                log::error!("{} failed: {}", what, e);
                Outcome::Rejected
            }
        }
    }
}

impl<T: RequestTransport> ProtocolAdapter for RequestResponseAdapter<T> {
    fn begin_session(&mut self, ctx: &SessionContext<'_>) -> Progress {
        let path = self.config.registration_path.clone();
        Progress::Resolved(self.exchange("Registration", &path, registration_body(ctx)))
    }

    fn send_keepalive(&mut self, ctx: &SessionContext<'_>) -> Outcome {
        let path = self.config.keepalive_path.clone();
        self.exchange("Keepalive", &path, keepalive_body(ctx))
    }

    fn send_configuration(&mut self, ctx: &SessionContext<'_>) -> Outcome {
        let path = self.config.configuration_path.clone();
        self.exchange("Configuration", &path, registration_body(ctx))
    }
}
