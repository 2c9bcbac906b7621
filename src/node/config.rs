//! Node timing configuration.

use core::time::Duration;
use serde::Deserialize;

/// Failure to load a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for this configuration.
    Parse,
    /// A field holds a value the node cannot run with.
    InvalidValue(&'static str),
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Parse => defmt::write!(f, "Parse"),
            ConfigError::InvalidValue(field) => defmt::write!(f, "InvalidValue({=str})", field),
        }
    }
}

/// Periods and thresholds of the connectivity state machine.
///
/// Every field is optional in a JSON document; missing fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Interval between connectivity checks while connecting.
    pub probe_period_secs: u32,
    /// Quiet time after a short press before the configuration is pushed.
    pub configuration_delay_secs: u32,
    /// Indicator toggle period while connecting.
    pub blink_period_ms: u32,
    /// Whole seconds a press must last to count as long.
    pub button_threshold_secs: u32,
    /// Bound on an asynchronous session handshake.
    pub session_timeout_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            probe_period_secs: 10,
            configuration_delay_secs: 10,
            blink_period_ms: 500,
            button_threshold_secs: 3,
            session_timeout_secs: 30,
        }
    }
}

impl NodeConfig {
    /// Load from a JSON object, e.g. `{"probe_period_secs":5}`.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let (config, _) = serde_json_core::from_slice::<NodeConfig>(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject periods that would make a timer fire continuously.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("probe_period_secs", self.probe_period_secs),
            ("configuration_delay_secs", self.configuration_delay_secs),
            ("blink_period_ms", self.blink_period_ms),
            ("button_threshold_secs", self.button_threshold_secs),
            ("session_timeout_secs", self.session_timeout_secs),
        ];
        match fields.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::InvalidValue(name)),
            None => Ok(()),
        }
    }

    /// Connectivity probe interval.
    pub fn probe_period(&self) -> Duration {
        Duration::from_secs(self.probe_period_secs.into())
    }

    /// Delay before a configuration push.
    pub fn configuration_delay(&self) -> Duration {
        Duration::from_secs(self.configuration_delay_secs.into())
    }

    /// Indicator toggle period.
    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms.into())
    }

    /// Bound on a pending session handshake.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs.into())
    }
}
