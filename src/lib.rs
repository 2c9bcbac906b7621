//! # libiot-node - connectivity logic for constrained IoT endpoints
//!
//! This crate contains the endpoint side of a small building-automation
//! network. A node is either an *actuator* (heating, ventilation) that
//! registers with a server and accepts setpoint commands, or a *sensor*
//! (temperature/humidity/CO2, frequency/noise, weight, counter) that
//! publishes readings to a broker.
//!
//! Both kinds share one connectivity state machine, [`node::Node`]: wait
//! for the network, open a session, keep it alive on a user-selectable
//! cadence, fall back to a safe state when the session is lost, and let a
//! single button cycle the cadence (short press) or force a reconnect (long
//! press). The protocol-specific parts sit behind
//! [`adapter::ProtocolAdapter`]:
//!
//! - [`adapter::RequestResponseAdapter`] registers and keeps alive over CoAP
//!   confirmable POSTs.
//! - [`adapter::ConnectPublishAdapter`] connects to an MQTT broker and
//!   publishes configuration and readings.
//!
//! ## Layout
//!
//! - [`network`]: transport traits and the CoAP and MQTT clients
//! - [`model`]: device kinds, actuator setpoints, simulated sensors
//! - [`command`]: inbound command scanning and the PUT resource
//! - [`adapter`]: the two session protocols
//! - [`node`]: timers, button handling, configuration and the state machine
//!
//! ## Driving a node
//!
//! The state machine owns no clock and no threads. The platform feeds it
//! the current time and button edges:
//!
//! ```rust,ignore
//! let mut node = Node::new(identity, adapter, network, led, NodeConfig::default())?;
//! node.start(clock.now());
//! loop {
//!     if button.pressed_for_another_second() {
//!         node.post(Event::ButtonHeld);
//!     }
//!     node.poll(clock.now());
//!     clock.sleep_until(node.next_deadline());
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting for error types

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Transport traits and application protocol clients.
pub mod network;

/// Value models for actuators and simulated sensors.
pub mod model;

/// Inbound command payload scanning and the device-hosted resource.
pub mod command;

/// Session protocols behind a common adapter trait.
pub mod adapter;

/// The connectivity state machine and its supporting pieces.
pub mod node;
