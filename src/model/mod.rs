//! Value models for the controlled or measured quantity of a node.
//!
//! A node is built for exactly one [`DeviceKind`]. Actuator kinds hold a
//! validated setpoint ([`Actuator`]); sensor kinds hold simulated readings
//! that either wander randomly or ramp toward a target ([`Sensor`]). The
//! closed [`Model`] enum gives the state machine and the command handler one
//! interface over both.

use crate::command::CommandValues;
use crate::node::DeviceIdentity;
use heapless::{String, Vec};

/// Actuator setpoint validation.
pub mod actuator;

/// Simulated sensor readings.
pub mod sensor;

pub use actuator::Actuator;
pub use sensor::{Field, Sensor};

/// Capacity of a serialized reading.
pub const READING_LEN: usize = 96;

/// Maximum number of command keys a device kind recognizes.
pub const MAX_KEYS: usize = 3;

/// The recognized command keys of a device kind.
pub type KeySet = Vec<&'static str, MAX_KEYS>;

/// Every device a node can be built as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Heating actuator with a temperature setpoint.
    TemperatureActuator,
    /// Ventilation actuator with a fan level.
    VentilationActuator,
    /// Temperature, humidity and CO2 sensor.
    TemperatureHumidityCo2,
    /// Frequency and noise sensor.
    FrequencyNoise,
    /// Weight sensor.
    Weight,
    /// In/out counter.
    Counter,
}

impl DeviceKind {
    /// All kinds, actuators first.
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::TemperatureActuator,
        DeviceKind::VentilationActuator,
        DeviceKind::TemperatureHumidityCo2,
        DeviceKind::FrequencyNoise,
        DeviceKind::Weight,
        DeviceKind::Counter,
    ];

    /// Short tag sent to the remote counterpart as `"t"`.
    pub fn type_tag(self) -> &'static str {
        match self {
            DeviceKind::TemperatureActuator => "ta",
            DeviceKind::VentilationActuator => "va",
            DeviceKind::TemperatureHumidityCo2 => "thc",
            DeviceKind::FrequencyNoise => "fn",
            DeviceKind::Weight => "w",
            DeviceKind::Counter => "c",
        }
    }

    /// Look a kind up by its type tag.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_tag() == tag)
    }

    /// Whether this kind is driven by the server rather than publishing.
    pub fn is_actuator(self) -> bool {
        matches!(
            self,
            DeviceKind::TemperatureActuator | DeviceKind::VentilationActuator
        )
    }

    /// Name of the device-hosted resource accepting PUT commands.
    pub fn resource_name(self) -> &'static str {
        match self {
            DeviceKind::TemperatureActuator => "temperature",
            DeviceKind::VentilationActuator => "ventilation",
            _ => "test",
        }
    }

    /// Topic readings are published on; actuators publish nothing.
    pub fn data_topic(self) -> Option<&'static str> {
        match self {
            DeviceKind::TemperatureActuator | DeviceKind::VentilationActuator => None,
            DeviceKind::TemperatureHumidityCo2 => Some("temperature_humidity_co2"),
            DeviceKind::FrequencyNoise => Some("frequency_noise"),
            DeviceKind::Weight => Some("weight"),
            DeviceKind::Counter => Some("counter"),
        }
    }

    /// Selectable session values in seconds: keepalive periods for
    /// actuators, sampling intervals for sensors.
    pub fn session_values(self) -> &'static [u16] {
        if self.is_actuator() {
            &[30, 60, 180]
        } else {
            &[20, 60, 120]
        }
    }
}

/// A command value the model refused; the stored state is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue {
    /// The key carrying the rejected value.
    pub key: &'static str,
    /// The rejected value.
    pub value: i32,
}

#[cfg(feature = "defmt")]
impl defmt::Format for InvalidValue {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "InvalidValue({=str}: {=i32})", self.key, self.value)
    }
}

/// The value model of one node.
#[derive(Debug, Clone)]
pub enum Model {
    /// Setpoint-driven device.
    Actuator(Actuator),
    /// Sampling device.
    Sensor(Sensor),
}

impl Model {
    /// Build the model for `kind`; `seed` drives the sensor simulation.
    pub fn for_kind(kind: DeviceKind, seed: u64) -> Self {
        match kind {
            DeviceKind::TemperatureActuator | DeviceKind::VentilationActuator => {
                Model::Actuator(Actuator::new(kind))
            }
            _ => Model::Sensor(Sensor::new(kind, seed)),
        }
    }

    /// Device kind of the model.
    pub fn kind(&self) -> DeviceKind {
        match self {
            Model::Actuator(actuator) => actuator.kind(),
            Model::Sensor(sensor) => sensor.kind(),
        }
    }

    /// Whether readings are published rather than commands obeyed.
    pub fn is_sensor(&self) -> bool {
        matches!(self, Model::Sensor(_))
    }

    /// Keys accepted by the device-hosted PUT resource.
    pub fn command_keys(&self) -> KeySet {
        match self {
            Model::Actuator(actuator) => {
                let mut keys = KeySet::new();
                // A single key always fits.
                let _ = keys.push(actuator.key());
                keys
            }
            Model::Sensor(sensor) => sensor.fields().iter().map(|field| field.tag).collect(),
        }
    }

    /// Human name used in `Missing ...` and `Requested invalid ...` replies.
    pub fn field_name(&self) -> &'static str {
        match self {
            Model::Actuator(actuator) => actuator.field_name(),
            Model::Sensor(_) => "values",
        }
    }

    /// Apply parsed command values.
    ///
    /// Sensor targets are validated all at once so a rejected command
    /// leaves every target untouched.
    pub fn apply_command(&mut self, values: &CommandValues) -> Result<(), InvalidValue> {
        match self {
            Model::Actuator(actuator) => {
                let key = actuator.key();
                let Some(requested) = values.get(key) else {
                    return Ok(());
                };
                if actuator.apply(requested) {
                    Ok(())
                } else {
                    Err(InvalidValue {
                        key,
                        value: requested,
                    })
                }
            }
            Model::Sensor(sensor) => {
                for (key, value) in values.iter() {
                    if !sensor.accepts_target(key, value) {
                        return Err(InvalidValue { key, value });
                    }
                }
                for (key, value) in values.iter() {
                    sensor.set_target(key, value);
                }
                log::info!("Sensor targets updated: {:?}", values);
                Ok(())
            }
        }
    }

    /// Take one sample; actuators have nothing to sample.
    pub fn sample(&mut self) {
        if let Model::Sensor(sensor) = self {
            sensor.sample();
        }
    }

    /// Drive the model to its safe state after an unconfirmed session loss.
    pub fn force_safe(&mut self) {
        if let Model::Actuator(actuator) = self {
            actuator.force_off();
        }
    }

    /// Serialize the current value as a compact JSON object tagged with the node id.
    pub fn serialize(&self, identity: &DeviceIdentity) -> Result<String<READING_LEN>, core::fmt::Error> {
        use core::fmt::Write;

        let mut out = String::new();
        write!(out, "{{\"i\":\"{:x}\"", identity.node_id())?;
        match self {
            Model::Actuator(actuator) => {
                write!(out, ",\"{}\":{}", actuator.key(), actuator.setpoint())?;
            }
            Model::Sensor(sensor) => {
                for field in sensor.fields() {
                    write!(out, ",\"{}\":{}", field.tag, field.current)?;
                }
            }
        }
        out.push('}').map_err(|_| core::fmt::Error)?;
        Ok(out)
    }
}
