mod common;

use common::*;
use libiot_node::adapter::{Outcome, Progress, SessionNotification};
use libiot_node::model::{Actuator, DeviceKind, Model};
use libiot_node::network::application::coap::{Code, Message, MessageType};
use libiot_node::node::{ConfigError, EVENT_QUEUE_LEN, Event, Instant, Node, NodeConfig, NodeState, TimerId};

fn setpoint(node: &TestNode) -> i32 {
    match node.model() {
        Model::Actuator(actuator) => actuator.setpoint(),
        Model::Sensor(_) => panic!("not an actuator"),
    }
}

#[test]
fn test_starts_connecting_with_probe_and_blink() {
    let node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    assert_eq!(node.state(), NodeState::Connecting);
    assert_eq!(node.timers().deadline(TimerId::ConnectivityProbe), Some(secs(10)));
    assert_eq!(
        node.timers().deadline(TimerId::Blink),
        Some(Instant::from_millis(500))
    );
    assert_eq!(node.next_deadline(), Some(Instant::from_millis(500)));
    assert!(node.indicator().on);
}

#[test]
fn test_probe_never_registers_without_connectivity() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), false);
    for t in [10, 20, 30, 40] {
        node.poll(secs(t));
        assert_eq!(node.state(), NodeState::Connecting);
    }
    assert!(node.adapter().calls.is_empty());
    assert_eq!(node.timers().deadline(TimerId::ConnectivityProbe), Some(secs(50)));
}

#[test]
fn test_blinks_while_connecting() {
    let mut node = started_node(DeviceKind::VentilationActuator, MockAdapter::accepting(), false);
    node.poll(Instant::from_millis(500));
    node.poll(Instant::from_millis(1_000));
    node.poll(Instant::from_millis(1_500));
    assert_eq!(node.indicator().toggles, 3);
    assert_eq!(
        node.timers().deadline(TimerId::Blink),
        Some(Instant::from_millis(2_000))
    );
}

#[test]
fn test_accepted_registration_connects() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));

    assert_eq!(node.state(), NodeState::Connected);
    assert_eq!(
        node.adapter().calls,
        [Call::Begin {
            address: GLOBAL_ADDR.to_string(),
            session_value: 30
        }]
    );
    assert_eq!(node.address(), GLOBAL_ADDR);
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(40)));
    assert!(!node.timers().is_pending(TimerId::Blink));
    assert!(!node.timers().is_pending(TimerId::ConnectivityProbe));
    assert!(!node.timers().is_pending(TimerId::Configuration));
    assert!(!node.indicator().on);
}

#[test]
fn test_rejected_registration_disconnects() {
    let mut adapter = MockAdapter::accepting();
    adapter.begin = Progress::Resolved(Outcome::Rejected);
    let mut node = started_node(DeviceKind::TemperatureActuator, adapter, true);
    node.poll(secs(10));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert_eq!(node.next_deadline(), None);
    assert!(node.indicator().on);

    // Nothing happens until the user asks for a reconnect.
    node.poll(secs(100));
    assert_eq!(node.adapter().begin_calls(), 1);
}

#[test]
fn test_keepalive_rearms_cadence() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    node.poll(secs(40));
    node.poll(secs(70));

    assert_eq!(node.state(), NodeState::Connected);
    assert_eq!(
        node.adapter().calls[1..],
        [Call::Keepalive(30), Call::Keepalive(30)]
    );
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(100)));
}

#[test]
fn test_keepalive_timeout_forces_actuator_off() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    assert_eq!(node.handle_put(br#"{"t":22}"#).code, Code::CONTENT);
    assert_eq!(setpoint(&node), 22);

    node.adapter_mut().keepalive = Outcome::TimedOut;
    node.poll(secs(40));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert_eq!(setpoint(&node), Actuator::OFF);
    assert!(!node.timers().is_pending(TimerId::Cadence));
    assert!(node.indicator().on);
}

#[test]
fn test_registration_timeout_forces_actuator_off() {
    let mut adapter = MockAdapter::accepting();
    adapter.begin = Progress::Resolved(Outcome::TimedOut);
    let mut node = started_node(DeviceKind::TemperatureActuator, adapter, true);
    assert_eq!(node.handle_put(br#"{"t":25}"#).code, Code::CONTENT);
    assert_eq!(setpoint(&node), 25);

    node.poll(secs(10));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert_eq!(setpoint(&node), Actuator::OFF);
    assert_eq!(node.adapter().begin_calls(), 1);
    assert_eq!(node.adapter().aborted, 1);
    assert_eq!(node.next_deadline(), None);
    assert!(node.indicator().on);
}

#[test]
fn test_full_queue_delays_cadence_without_losing_it() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(40)));

    for _ in 0..EVENT_QUEUE_LEN {
        node.post(Event::ButtonHeld);
    }
    node.poll(secs(40));

    assert_eq!(node.state(), NodeState::Connected);
    assert_eq!(node.adapter().calls[1..], [Call::Keepalive(30)]);
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(70)));

    node.poll(secs(70));
    assert_eq!(
        node.adapter().calls[1..],
        [Call::Keepalive(30), Call::Keepalive(30)]
    );
}

#[test]
fn test_full_queue_delays_notification_without_losing_it() {
    let mut node = started_node(DeviceKind::Weight, MockAdapter::pending(), true);
    node.poll(secs(10));
    assert!(node.is_awaiting_session());

    for _ in 0..EVENT_QUEUE_LEN {
        node.post(Event::ButtonHeld);
    }
    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Connected);
    node.poll(secs(11));

    assert_eq!(node.state(), NodeState::Connected);
    assert!(!node.is_awaiting_session());
    assert!(node.adapter().notifications.is_empty());
}

#[test]
fn test_zero_periods_rejected_at_construction() {
    for (config, field) in [
        (
            NodeConfig {
                blink_period_ms: 0,
                ..NodeConfig::default()
            },
            "blink_period_ms",
        ),
        (
            NodeConfig {
                probe_period_secs: 0,
                ..NodeConfig::default()
            },
            "probe_period_secs",
        ),
    ] {
        let node = Node::new(
            identity(DeviceKind::TemperatureActuator),
            MockAdapter::accepting(),
            MockConnectivity { available: false },
            MockIndicator::default(),
            config,
        );
        assert!(matches!(node, Err(ConfigError::InvalidValue(name)) if name == field));
    }
}

#[test]
fn test_keepalive_rejection_keeps_setpoint() {
    let mut node = started_node(DeviceKind::VentilationActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    node.handle_put(br#"{"v":3}"#);

    node.adapter_mut().keepalive = Outcome::Rejected;
    node.poll(secs(40));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert_eq!(setpoint(&node), 3);
}

#[test]
fn test_short_press_cycles_and_pushes_configuration() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));

    node.post(Event::ButtonHeld);
    node.post(Event::ButtonReleased);
    node.poll(secs(15));

    assert_eq!(node.session().value(), 60);
    assert!(!node.timers().is_pending(TimerId::Cadence));
    assert_eq!(node.timers().deadline(TimerId::Configuration), Some(secs(25)));

    node.poll(secs(25));
    assert_eq!(node.adapter().calls.last(), Some(&Call::Configuration(60)));
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(85)));
}

#[test]
fn test_short_presses_wrap_and_rearm_once() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));

    node.post(Event::ButtonReleased);
    node.poll(secs(12));
    node.post(Event::ButtonReleased);
    node.poll(secs(14));
    node.post(Event::ButtonReleased);
    node.poll(secs(16));

    assert_eq!(node.session().value(), 30);
    assert_eq!(node.timers().deadline(TimerId::Configuration), Some(secs(26)));

    node.poll(secs(30));
    let pushes = node
        .adapter()
        .calls
        .iter()
        .filter(|call| matches!(call, Call::Configuration(_)))
        .count();
    assert_eq!(pushes, 1);
}

#[test]
fn test_short_press_while_connecting_cycles_without_push() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), false);
    node.post(Event::ButtonReleased);
    node.poll(secs(1));

    assert_eq!(node.state(), NodeState::Connecting);
    assert_eq!(node.session().value(), 60);
    assert!(!node.timers().is_pending(TimerId::Configuration));

    // The registration carries the selected value.
    node.network_mut().available = true;
    node.poll(secs(10));
    assert_eq!(
        node.adapter().calls,
        [Call::Begin {
            address: GLOBAL_ADDR.to_string(),
            session_value: 60
        }]
    );
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(70)));
}

#[test]
fn test_short_press_while_not_connected_cycles_without_push() {
    let mut adapter = MockAdapter::accepting();
    adapter.begin = Progress::Resolved(Outcome::Rejected);
    let mut node = started_node(DeviceKind::VentilationActuator, adapter, true);
    node.poll(secs(10));
    assert_eq!(node.state(), NodeState::NotConnected);

    node.post(Event::ButtonHeld);
    node.post(Event::ButtonReleased);
    node.poll(secs(12));
    node.post(Event::ButtonReleased);
    node.poll(secs(13));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert_eq!(node.session().value(), 180);
    assert!(!node.timers().is_pending(TimerId::Configuration));
    assert_eq!(node.next_deadline(), None);
    assert!(
        !node
            .adapter()
            .calls
            .iter()
            .any(|call| matches!(call, Call::Configuration(_)))
    );

    node.post(Event::ButtonReleased);
    node.poll(secs(14));
    assert_eq!(node.session().value(), 30);
}

#[test]
fn test_long_press_reconnects_once_per_press() {
    let mut adapter = MockAdapter::accepting();
    adapter.begin = Progress::Resolved(Outcome::Rejected);
    let mut node = started_node(DeviceKind::TemperatureActuator, adapter, true);
    node.poll(secs(10));
    assert_eq!(node.state(), NodeState::NotConnected);

    for _ in 0..6 {
        node.post(Event::ButtonHeld);
    }
    node.poll(secs(20));

    // The zero-delay probe ran and was rejected again; the later ticks of
    // the same press must not retry.
    assert_eq!(node.adapter().begin_calls(), 2);
    assert_eq!(node.state(), NodeState::NotConnected);

    node.post(Event::ButtonReleased);
    node.poll(secs(21));
    assert_eq!(node.session().value(), 30);

    node.adapter_mut().begin = Progress::Resolved(Outcome::Accepted);
    for _ in 0..3 {
        node.post(Event::ButtonHeld);
    }
    node.poll(secs(30));
    assert_eq!(node.adapter().begin_calls(), 3);
    assert_eq!(node.state(), NodeState::Connected);
}

#[test]
fn test_long_press_while_connected_does_nothing() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    for _ in 0..5 {
        node.post(Event::ButtonHeld);
    }
    node.post(Event::ButtonReleased);
    node.poll(secs(15));

    assert_eq!(node.state(), NodeState::Connected);
    assert_eq!(node.adapter().begin_calls(), 1);
    assert_eq!(node.session().value(), 30);
}

#[test]
fn test_long_press_probe_waits_for_connectivity() {
    let mut adapter = MockAdapter::accepting();
    adapter.begin = Progress::Resolved(Outcome::Rejected);
    let mut node = started_node(DeviceKind::TemperatureActuator, adapter, true);
    node.poll(secs(10));
    assert_eq!(node.state(), NodeState::NotConnected);

    node.network_mut().available = false;
    for _ in 0..3 {
        node.post(Event::ButtonHeld);
    }
    node.poll(secs(30));

    assert_eq!(node.state(), NodeState::Connecting);
    assert_eq!(node.adapter().begin_calls(), 1);
    assert_eq!(node.timers().deadline(TimerId::ConnectivityProbe), Some(secs(40)));
    assert!(node.timers().is_pending(TimerId::Blink));
}

#[test]
fn test_pending_session_connects_on_notification() {
    let mut node = started_node(DeviceKind::Weight, MockAdapter::pending(), true);
    node.poll(secs(10));
    assert_eq!(node.state(), NodeState::Connecting);
    assert!(node.is_awaiting_session());
    assert_eq!(node.timers().deadline(TimerId::SessionDeadline), Some(secs(40)));

    // Probe does not fire again while the handshake is outstanding.
    node.poll(secs(25));
    assert_eq!(node.adapter().begin_calls(), 1);

    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Connected);
    node.poll(secs(26));

    assert_eq!(node.state(), NodeState::Connected);
    assert!(!node.timers().is_pending(TimerId::SessionDeadline));
    assert_eq!(node.timers().deadline(TimerId::Configuration), Some(secs(36)));
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(46)));

    // The announced configuration restarts the sampling interval.
    node.poll(secs(36));
    assert_eq!(node.adapter().calls.last(), Some(&Call::Configuration(20)));
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(56)));

    node.poll(secs(56));
    let Some(Call::Reading(reading)) = node.adapter().calls.last() else {
        panic!("expected a reading");
    };
    assert!(reading.starts_with(r#"{"i":"124b00060d9a01","w":"#));
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(76)));
}

#[test]
fn test_pending_session_times_out() {
    let mut node = started_node(DeviceKind::FrequencyNoise, MockAdapter::pending(), true);
    node.poll(secs(10));
    node.poll(secs(40));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert!(!node.is_awaiting_session());
    assert_eq!(node.adapter().aborted, 1);
    assert_eq!(node.next_deadline(), None);
}

#[test]
fn test_refused_session_disconnects() {
    let mut node = started_node(DeviceKind::Counter, MockAdapter::pending(), true);
    node.poll(secs(10));
    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Disconnected);
    node.poll(secs(11));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert!(!node.timers().is_pending(TimerId::SessionDeadline));
}

#[test]
fn test_lost_session_disconnects() {
    let mut node = started_node(DeviceKind::Weight, MockAdapter::pending(), true);
    node.poll(secs(10));
    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Connected);
    node.poll(secs(11));
    assert_eq!(node.state(), NodeState::Connected);

    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Disconnected);
    node.poll(secs(12));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert!(!node.timers().is_pending(TimerId::Cadence));
    assert!(!node.timers().is_pending(TimerId::Configuration));
}

#[test]
fn test_stale_notification_ignored() {
    let mut node = started_node(DeviceKind::TemperatureActuator, MockAdapter::accepting(), true);
    node.poll(secs(10));
    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Connected);
    node.poll(secs(11));
    assert_eq!(node.state(), NodeState::Connected);
    assert_eq!(node.timers().deadline(TimerId::Cadence), Some(secs(40)));
}

#[test]
fn test_failed_reading_disconnects_sensor() {
    let mut adapter = MockAdapter::pending();
    adapter.announce = false;
    let mut node = started_node(DeviceKind::TemperatureHumidityCo2, adapter, true);
    node.poll(secs(10));
    node.adapter_mut()
        .notifications
        .push_back(SessionNotification::Connected);
    node.poll(secs(10));
    node.adapter_mut().reading = Outcome::Rejected;
    node.poll(secs(30));

    assert_eq!(node.state(), NodeState::NotConnected);
    assert!(matches!(node.adapter().calls.last(), Some(Call::Reading(_))));
}

#[test]
fn test_coap_put_through_node() {
    let mut node = started_node(DeviceKind::VentilationActuator, MockAdapter::accepting(), true);

    let mut request = Message::new(MessageType::Confirmable, Code::PUT, 0x2a);
    request.set_token(&[0xbe, 0xef]).unwrap();
    request.set_path("/ventilation").unwrap();
    request.set_payload(br#"{"v":4}"#).unwrap();

    let response = node.handle_request(&request);
    assert_eq!(response.kind, MessageType::Acknowledgement);
    assert_eq!(response.code, Code::CONTENT);
    assert_eq!(response.message_id, 0x2a);
    assert_eq!(response.token.as_slice(), &[0xbe, 0xef]);
    assert_eq!(setpoint(&node), 4);
}
