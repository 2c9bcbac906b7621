use super::{
    ButtonAction, ButtonPressTracker, ConfigError, DeviceIdentity, Event, EventQueue, Indicator,
    Instant, NodeConfig, NodeState, SessionConfig, TimerId, TimerSet,
};
use crate::adapter::{Outcome, Progress, ProtocolAdapter, SessionContext, SessionNotification};
use crate::command::{CommandResponse, resource};
use crate::model::Model;
use crate::network::application::coap::Message;
use crate::network::{ADDRESS_LEN, Connectivity};
use core::time::Duration;
use heapless::String;

/// One endpoint node.
///
/// `A` opens and maintains the session, `N` reports network readiness and
/// `I` drives the status light.
#[derive(Debug)]
pub struct Node<A, N, I>
where
    A: ProtocolAdapter,
    N: Connectivity,
    I: Indicator,
{
    state: NodeState,
    identity: DeviceIdentity,
    session: SessionConfig,
    timers: TimerSet,
    button: ButtonPressTracker,
    queue: EventQueue,
    model: Model,
    adapter: A,
    network: N,
    indicator: I,
    config: NodeConfig,
    address: String<ADDRESS_LEN>,
    awaiting_session: bool,
    reply_id: u16,
    now: Instant,
}

impl<A, N, I> Node<A, N, I>
where
    A: ProtocolAdapter,
    N: Connectivity,
    I: Indicator,
{
    /// A node in the Connecting state with nothing armed yet; call
    /// [`start`](Self::start) to begin probing.
    ///
    /// Fails when `config` holds a zero period, which would keep a timer
    /// firing at the same instant forever.
    pub fn new(
        identity: DeviceIdentity,
        adapter: A,
        network: N,
        indicator: I,
        config: NodeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let kind = identity.kind();
        Ok(Self {
            state: NodeState::Connecting,
            identity,
            session: SessionConfig::for_kind(kind),
            timers: TimerSet::new(),
            button: ButtonPressTracker::new(config.button_threshold_secs),
            queue: EventQueue::new(),
            model: Model::for_kind(kind, identity.node_id()),
            adapter,
            network,
            indicator,
            config,
            address: String::new(),
            awaiting_session: false,
            reply_id: identity.node_id() as u16,
            now: Instant::default(),
        })
    }

    /// Enter Connecting and arm the first connectivity probe.
    pub fn start(&mut self, now: Instant) {
        self.now = now;
        log::info!(
            "Node {} ({}) starting",
            self.identity.hex_id(),
            self.identity.type_tag()
        );
        self.enter_connecting(self.config.probe_period());
    }

    /// Queue an external event for the next [`poll`](Self::poll).
    pub fn post(&mut self, event: Event) {
        if let Err(event) = self.queue.push(event) {
            log::warn!("Event queue full, dropping {:?}", event);
        }
    }

    /// Handle everything due at `now`: adapter notifications, expired timers
    /// and queued events, in arrival order.
    ///
    /// Notifications and timers are only taken once the queue has room, so
    /// a queue filled by [`post`](Self::post) delays them but never loses
    /// them.
    pub fn poll(&mut self, now: Instant) {
        self.now = now;
        loop {
            if !self.queue.is_full() {
                if let Some(notification) = self.adapter.poll_notification() {
                    self.post(Event::Session(notification));
                } else if let Some(id) = self.timers.take_expired(now) {
                    self.post(Event::Timer(id));
                }
            }

            let Some(event) = self.queue.pop() else {
                break;
            };
            self.handle(event);
        }
    }

    /// Apply an inbound PUT payload to the value model.
    pub fn handle_put(&mut self, payload: &[u8]) -> CommandResponse {
        resource::handle_put(&mut self.model, payload)
    }

    /// Answer a CoAP request for the device-hosted resource.
    pub fn handle_request(&mut self, request: &Message) -> Message {
        let message_id = self.reply_id;
        self.reply_id = self.reply_id.wrapping_add(1);
        resource::handle_request(&mut self.model, request, message_id)
    }

    /// Current connectivity state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Who this node is.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// The selected session value.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// The value model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable access to the value model.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Armed timers.
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    /// The protocol adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable access to the protocol adapter.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Mutable access to the connectivity source.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// The status light.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Global address learned by the last successful probe.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a session handshake is outstanding.
    pub fn is_awaiting_session(&self) -> bool {
        self.awaiting_session
    }

    /// When the platform next needs to call [`poll`](Self::poll).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Timer(id) => self.on_timer(id),
            Event::ButtonHeld => {
                let not_connected = self.state == NodeState::NotConnected;
                if let Some(ButtonAction::Reconnect) = self.button.on_held(not_connected) {
                    self.on_reconnect();
                }
            }
            Event::ButtonReleased => {
                if let Some(ButtonAction::CycleConfiguration { held_secs }) = self.button.on_release() {
                    self.on_short_press(held_secs);
                }
            }
            Event::Session(notification) => self.on_session(notification),
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        match id {
            TimerId::ConnectivityProbe => self.on_probe(),
            TimerId::SessionDeadline => {
                if !self.awaiting_session {
                    log::debug!("Stale session deadline");
                    return;
                }
                log::warn!("No session answer within {:?}", self.config.session_timeout());
                self.awaiting_session = false;
                self.apply_outcome(Outcome::TimedOut);
            }
            TimerId::Configuration => {
                if self.state != NodeState::Connected {
                    log::debug!("Stale configuration push in {:?}", self.state);
                    return;
                }
                let ctx = SessionContext {
                    identity: &self.identity,
                    address: &self.address,
                    session_value: self.session.value(),
                };
                let outcome = self.adapter.send_configuration(&ctx);
                self.apply_outcome(outcome);
            }
            TimerId::Cadence => self.on_cadence(),
            TimerId::Blink => {
                if self.state == NodeState::Connecting {
                    self.indicator.toggle();
                    self.timers.arm(TimerId::Blink, self.now, self.config.blink_period());
                }
            }
        }
    }

    fn on_probe(&mut self) {
        if self.state != NodeState::Connecting || self.awaiting_session {
            log::debug!("Stale connectivity probe in {:?}", self.state);
            return;
        }

        if !self.network.has_global_connectivity() {
            log::info!(
                "Connectivity not available yet, retrying in {:?}",
                self.config.probe_period()
            );
            self.timers
                .arm(TimerId::ConnectivityProbe, self.now, self.config.probe_period());
            return;
        }

        self.address = self.network.global_address().unwrap_or_default();
        log::info!("Connectivity available, global address {}", self.address);

        let ctx = SessionContext {
            identity: &self.identity,
            address: &self.address,
            session_value: self.session.value(),
        };
        match self.adapter.begin_session(&ctx) {
            Progress::Resolved(outcome) => self.apply_outcome(outcome),
            Progress::Pending => {
                self.awaiting_session = true;
                self.timers
                    .arm(TimerId::SessionDeadline, self.now, self.config.session_timeout());
            }
        }
    }

    fn on_cadence(&mut self) {
        if self.state != NodeState::Connected {
            log::debug!("Stale cadence timer in {:?}", self.state);
            return;
        }

        let ctx = SessionContext {
            identity: &self.identity,
            address: &self.address,
            session_value: self.session.value(),
        };
        let outcome = if self.model.is_sensor() {
            self.model.sample();
            match self.model.serialize(&self.identity) {
                Ok(reading) => self.adapter.send_reading(&ctx, reading.as_bytes()),
                Err(_) => {
                    log::error!("Reading does not fit the payload buffer");
                    Outcome::Rejected
                }
            }
        } else {
            self.adapter.send_keepalive(&ctx)
        };
        self.apply_outcome(outcome);
    }

    fn on_short_press(&mut self, held_secs: u32) {
        let value = self.session.cycle();
        log::info!("{}s press, session value set to {}s", held_secs, value);
        if self.state != NodeState::Connected {
            // Announced with the next session instead.
            return;
        }
        self.timers.cancel(TimerId::Cadence);
        self.timers
            .arm(TimerId::Configuration, self.now, self.config.configuration_delay());
    }

    fn on_reconnect(&mut self) {
        log::info!("Long press, reconnecting");
        self.timers.cancel(TimerId::Configuration);
        self.enter_connecting(Duration::ZERO);
    }

    fn on_session(&mut self, notification: SessionNotification) {
        if self.awaiting_session {
            self.awaiting_session = false;
            self.timers.cancel(TimerId::SessionDeadline);
            let outcome = match notification {
                SessionNotification::Connected => Outcome::Accepted,
                SessionNotification::Disconnected => Outcome::Rejected,
            };
            self.apply_outcome(outcome);
            return;
        }

        match (notification, self.state) {
            (SessionNotification::Disconnected, NodeState::Connected) => {
                log::warn!("Session lost");
                self.drop_session();
            }
            _ => log::debug!("Stale {:?} in {:?}", notification, self.state),
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Accepted => {
                let opened = self.state != NodeState::Connected;
                self.set_state(NodeState::Connected);
                let cadence = Duration::from_secs(self.session.value().into());
                self.timers.arm(TimerId::Cadence, self.now, cadence);
                if opened && self.adapter.announces_configuration() {
                    self.timers
                        .arm(TimerId::Configuration, self.now, self.config.configuration_delay());
                }
            }
            Outcome::Rejected => self.drop_session(),
            Outcome::TimedOut => {
                self.model.force_safe();
                self.drop_session();
            }
        }
    }

    fn drop_session(&mut self) {
        self.awaiting_session = false;
        for id in [
            TimerId::ConnectivityProbe,
            TimerId::SessionDeadline,
            TimerId::Configuration,
            TimerId::Cadence,
        ] {
            self.timers.cancel(id);
        }
        self.adapter.abort_session();
        self.set_state(NodeState::NotConnected);
    }

    fn enter_connecting(&mut self, probe_after: Duration) {
        self.set_state(NodeState::Connecting);
        self.indicator.set(true);
        self.timers
            .arm(TimerId::Blink, self.now, self.config.blink_period());
        self.timers
            .arm(TimerId::ConnectivityProbe, self.now, probe_after);
    }

    fn set_state(&mut self, state: NodeState) {
        if self.state != state {
            log::info!("{:?} -> {:?}", self.state, state);
        }
        self.state = state;
        match state {
            NodeState::NotConnected => {
                self.timers.cancel(TimerId::Blink);
                self.indicator.set(true);
            }
            NodeState::Connected => {
                self.timers.cancel(TimerId::Blink);
                self.indicator.set(false);
            }
            NodeState::Connecting => {}
        }
    }
}
