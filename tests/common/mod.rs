#![allow(dead_code)]

use heapless::String;
use libiot_node::adapter::{
    Outcome, Progress, ProtocolAdapter, SessionContext, SessionNotification,
};
use libiot_node::model::DeviceKind;
use libiot_node::network::error::Error;
use libiot_node::network::{
    ADDRESS_LEN, Clock, Close, Connect, Connection, Connectivity, Read, ReadTimeout, Write,
};
use libiot_node::node::{DeviceIdentity, Indicator, Instant, Node, NodeConfig};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

pub const LINK_ADDR: [u8; 8] = [0x00, 0x12, 0x4b, 0x00, 0x06, 0x0d, 0x9a, 0x01];
pub const GLOBAL_ADDR: &str = "fd00::212:4b00:60d:9a01";

pub fn secs(secs: u64) -> Instant {
    Instant::from_secs(secs)
}

pub fn identity(kind: DeviceKind) -> DeviceIdentity {
    DeviceIdentity::from_link_addr(LINK_ADDR, kind)
}

/// Both ends of a mock transport: scripted inbound chunks and recorded writes.
///
/// `now` is simulated time. A scripted chunk arrives `read_delay` after the
/// read starts; an empty script blocks for the whole read timeout.
#[derive(Debug, Default)]
pub struct Wire {
    pub inbound: VecDeque<Result<Vec<u8>, Error>>,
    pub written: Vec<Vec<u8>>,
    pub read_timeout: Option<Duration>,
    pub read_timeouts: Vec<Duration>,
    pub read_delay: Duration,
    pub now: Duration,
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    pub wire: Rc<RefCell<Wire>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&self, bytes: &[u8]) {
        self.wire.borrow_mut().inbound.push_back(Ok(bytes.to_vec()));
    }

    pub fn push_error(&self, error: Error) {
        self.wire.borrow_mut().inbound.push_back(Err(error));
    }

    /// Every write call, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.wire.borrow().written.clone()
    }

    /// All written bytes as one stream.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.wire.borrow().written.concat()
    }

    pub fn clear_written(&self) {
        self.wire.borrow_mut().written.clear();
    }

    /// A clock reading this wire's simulated time.
    pub fn clock(&self) -> MockClock {
        MockClock {
            wire: self.wire.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockClock {
    wire: Rc<RefCell<Wire>>,
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.wire.borrow().now
    }
}

impl Read for MockConnection {
    type Error = Error;

    /// Returns up to `buf.len()` bytes of the next chunk, keeping the rest
    /// for the following read. An empty script reads as a timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        let limit = wire.read_timeout.unwrap_or(Duration::MAX);
        match wire.inbound.pop_front() {
            None => {
                let waited = wire.read_timeout.unwrap_or_default();
                wire.now += waited;
                Err(Error::Timeout)
            }
            Some(Err(error)) => Err(error),
            Some(Ok(mut chunk)) => {
                let delay = wire.read_delay.min(limit);
                wire.now += delay;
                let len = chunk.len().min(buf.len());
                buf[..len].copy_from_slice(&chunk[..len]);
                if len < chunk.len() {
                    chunk.drain(..len);
                    wire.inbound.push_front(Ok(chunk));
                }
                Ok(len)
            }
        }
    }
}

impl Write for MockConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.closed {
            return Err(Error::NotOpen);
        }
        wire.written.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl ReadTimeout for MockConnection {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Error> {
        let mut wire = self.wire.borrow_mut();
        wire.read_timeout = timeout;
        wire.read_timeouts.extend(timeout);
        Ok(())
    }
}

impl Connection for MockConnection {}

/// Hands out connections that all share one [`Wire`].
#[derive(Debug, Default)]
pub struct MockNetwork {
    pub connection: MockConnection,
    pub refuse: bool,
    pub remotes: Vec<std::string::String>,
}

impl Connect for MockNetwork {
    type Connection = MockConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.remotes.push(remote.to_string());
        if self.refuse {
            return Err(Error::ConnectionRefused);
        }
        let connection = self.connection.clone();
        connection.wire.borrow_mut().closed = false;
        Ok(connection)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockConnectivity {
    pub available: bool,
}

impl Connectivity for MockConnectivity {
    fn has_global_connectivity(&self) -> bool {
        self.available
    }

    fn global_address(&self) -> Option<String<ADDRESS_LEN>> {
        if self.available {
            String::try_from(GLOBAL_ADDR).ok()
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct MockIndicator {
    pub on: bool,
    pub toggles: u32,
}

impl Indicator for MockIndicator {
    fn set(&mut self, on: bool) {
        self.on = on;
    }

    fn toggle(&mut self) {
        self.on = !self.on;
        self.toggles += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin { address: std::string::String, session_value: u16 },
    Keepalive(u16),
    Configuration(u16),
    Reading(std::string::String),
}

/// Adapter with scripted answers that records every call.
#[derive(Debug)]
pub struct MockAdapter {
    pub begin: Progress,
    pub keepalive: Outcome,
    pub configuration: Outcome,
    pub reading: Outcome,
    pub announce: bool,
    pub notifications: VecDeque<SessionNotification>,
    pub calls: Vec<Call>,
    pub aborted: u32,
}

impl MockAdapter {
    /// Every action succeeds synchronously.
    pub fn accepting() -> Self {
        Self {
            begin: Progress::Resolved(Outcome::Accepted),
            keepalive: Outcome::Accepted,
            configuration: Outcome::Accepted,
            reading: Outcome::Accepted,
            announce: false,
            notifications: VecDeque::new(),
            calls: Vec::new(),
            aborted: 0,
        }
    }

    /// Sessions open asynchronously and announce their configuration.
    pub fn pending() -> Self {
        Self {
            begin: Progress::Pending,
            announce: true,
            ..Self::accepting()
        }
    }

    pub fn begin_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Begin { .. }))
            .count()
    }
}

impl ProtocolAdapter for MockAdapter {
    fn begin_session(&mut self, ctx: &SessionContext<'_>) -> Progress {
        self.calls.push(Call::Begin {
            address: ctx.address.as_str().to_string(),
            session_value: ctx.session_value,
        });
        self.begin
    }

    fn send_keepalive(&mut self, ctx: &SessionContext<'_>) -> Outcome {
        self.calls.push(Call::Keepalive(ctx.session_value));
        self.keepalive
    }

    fn send_configuration(&mut self, ctx: &SessionContext<'_>) -> Outcome {
        self.calls.push(Call::Configuration(ctx.session_value));
        self.configuration
    }

    fn send_reading(&mut self, _ctx: &SessionContext<'_>, payload: &[u8]) -> Outcome {
        self.calls
            .push(Call::Reading(std::string::String::from_utf8_lossy(payload).into_owned()));
        self.reading
    }

    fn poll_notification(&mut self) -> Option<SessionNotification> {
        self.notifications.pop_front()
    }

    fn abort_session(&mut self) {
        self.aborted += 1;
    }

    fn announces_configuration(&self) -> bool {
        self.announce
    }
}

pub type TestNode = Node<MockAdapter, MockConnectivity, MockIndicator>;

/// A started node at t = 0.
pub fn started_node(kind: DeviceKind, adapter: MockAdapter, available: bool) -> TestNode {
    let mut node = Node::new(
        identity(kind),
        adapter,
        MockConnectivity { available },
        MockIndicator::default(),
        NodeConfig::default(),
    )
    .unwrap();
    node.start(secs(0));
    node
}
