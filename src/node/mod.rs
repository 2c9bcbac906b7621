//! Connectivity state machine for one endpoint node.
//!
//! A [`Node`] owns everything the device needs at runtime: its identity,
//! the selected session value, the timers, the button tracker, the value
//! model and the protocol adapter. The platform posts button edges with
//! [`Node::post`] and calls [`Node::poll`] with the current time; all state
//! changes happen inside `poll`, one queued [`Event`] at a time.

use crate::adapter::SessionNotification;
use crate::model::DeviceKind;
use core::fmt::Write;
use heapless::{Deque, String};

/// Press-length tracking for the user button.
pub mod button;

/// Timing configuration.
pub mod config;

/// Status light abstraction.
pub mod indicator;

/// The node state machine.
pub mod machine;

/// Named timers.
pub mod timer;

pub use button::{ButtonAction, ButtonPressTracker};
pub use config::{ConfigError, NodeConfig};
pub use indicator::Indicator;
pub use machine::Node;
pub use timer::{Instant, TimerId, TimerSet};

/// Connectivity state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Session lost or refused; waiting for a long press.
    NotConnected,
    /// Waiting for the network or for a session to open.
    Connecting,
    /// Session established.
    Connected,
}

/// Who the node is. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    link_addr: [u8; 8],
    kind: DeviceKind,
}

impl DeviceIdentity {
    /// Identity derived from the 8-byte link-layer address.
    pub fn from_link_addr(link_addr: [u8; 8], kind: DeviceKind) -> Self {
        Self { link_addr, kind }
    }

    /// The link address read big-endian.
    pub fn node_id(&self) -> u64 {
        u64::from_be_bytes(self.link_addr)
    }

    /// The kind this node was built as.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Short tag of the device kind.
    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    /// Node id as lowercase hex without leading zeros.
    pub fn hex_id(&self) -> String<16> {
        let mut out = String::new();
        // 16 hex digits always fit.
        let _ = write!(out, "{:x}", self.node_id());
        out
    }

    /// MQTT client id: link bytes 0, 1, 2, 5, 6 and 7 as lowercase hex.
    pub fn client_id(&self) -> String<12> {
        let mut out = String::new();
        for index in [0, 1, 2, 5, 6, 7] {
            let _ = write!(out, "{:02x}", self.link_addr[index]);
        }
        out
    }
}

/// Position in the device kind's ordered list of session values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    values: &'static [u16],
    index: usize,
}

impl SessionConfig {
    /// Start at the first value of `kind`.
    pub fn for_kind(kind: DeviceKind) -> Self {
        Self::new(kind.session_values())
    }

    /// Start at the first of `values`.
    pub fn new(values: &'static [u16]) -> Self {
        Self { values, index: 0 }
    }

    /// Position of the current value.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current value in seconds.
    pub fn value(&self) -> u16 {
        self.values.get(self.index).copied().unwrap_or_default()
    }

    /// Every selectable value, in cycle order.
    pub fn values(&self) -> &'static [u16] {
        self.values
    }

    /// Advance to the next value, wrapping after the last.
    pub fn cycle(&mut self) -> u16 {
        if !self.values.is_empty() {
            self.index = (self.index + 1) % self.values.len();
        }
        self.value()
    }

    /// Index of `value` in the list.
    pub fn index_of(&self, value: u16) -> Option<usize> {
        self.values.iter().position(|candidate| *candidate == value)
    }
}

/// Something the state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A timer expired.
    Timer(TimerId),
    /// The button has been held for one more second.
    ButtonHeld,
    /// The button came back up.
    ButtonReleased,
    /// The adapter reported a session change.
    Session(SessionNotification),
}

/// Capacity of the event queue.
pub const EVENT_QUEUE_LEN: usize = 8;

/// Bounded FIFO of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Deque<Event, EVENT_QUEUE_LEN>,
}

impl EventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `event`, handing it back when the queue is full.
    pub fn push(&mut self, event: Event) -> Result<(), Event> {
        self.events.push_back(event)
    }

    /// Oldest pending event.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the next [`push`](Self::push) would be refused.
    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }
}
