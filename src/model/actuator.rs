use super::DeviceKind;

/// A setpoint that only ever holds the off value or a value in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actuator {
    kind: DeviceKind,
    setpoint: i32,
}

const TEMPERATURE_MIN: i32 = 15;
const TEMPERATURE_MAX: i32 = 30;

const VENTILATION_LOW: i32 = 2;
const VENTILATION_HIGH: i32 = 4;

impl Actuator {
    /// The value meaning "switched off" for every actuator kind.
    pub const OFF: i32 = 1;

    /// New actuator of `kind`, switched off.
    ///
    /// Sensor kinds are accepted but every request outside the off value
    /// will be rejected for them.
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            setpoint: Self::OFF,
        }
    }

    /// The actuator kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Current setpoint, [`OFF`](Self::OFF) when switched off.
    pub fn setpoint(&self) -> i32 {
        self.setpoint
    }

    /// Command key carrying the setpoint.
    pub fn key(&self) -> &'static str {
        match self.kind {
            DeviceKind::VentilationActuator => "v",
            _ => "t",
        }
    }

    /// Name of the controlled quantity.
    pub fn field_name(&self) -> &'static str {
        match self.kind {
            DeviceKind::VentilationActuator => "ventilation",
            _ => "temperature",
        }
    }

    fn in_range(&self, value: i32) -> bool {
        match self.kind {
            DeviceKind::TemperatureActuator => (TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&value),
            DeviceKind::VentilationActuator => (VENTILATION_LOW..=VENTILATION_HIGH).contains(&value),
            _ => false,
        }
    }

    /// Try to move to `requested`. Returns false and keeps the old setpoint
    /// when the value is neither off nor in range.
    pub fn apply(&mut self, requested: i32) -> bool {
        if requested != Self::OFF && !self.in_range(requested) {
            log::warn!(
                "Rejected {} setpoint {}",
                self.field_name(),
                requested
            );
            return false;
        }

        if requested == self.setpoint {
            log::info!("{} already set to {}", self.field_name(), self.describe(requested));
        } else {
            log::info!("{} set to {}", self.field_name(), self.describe(requested));
            self.setpoint = requested;
        }
        true
    }

    /// Switch off unconditionally.
    pub fn force_off(&mut self) {
        if self.setpoint != Self::OFF {
            log::warn!("Forcing {} off", self.field_name());
        }
        self.setpoint = Self::OFF;
    }

    fn describe(&self, value: i32) -> Level {
        if value == Self::OFF {
            return Level::Off;
        }
        match (self.kind, value) {
            (DeviceKind::VentilationActuator, 2) => Level::Low,
            (DeviceKind::VentilationActuator, 3) => Level::Medium,
            (DeviceKind::VentilationActuator, 4) => Level::High,
            _ => Level::Value(value),
        }
    }
}

enum Level {
    Off,
    Low,
    Medium,
    High,
    Value(i32),
}

impl core::fmt::Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Level::Off => f.write_str("off"),
            Level::Low => f.write_str("low"),
            Level::Medium => f.write_str("medium"),
            Level::High => f.write_str("high"),
            Level::Value(value) => write!(f, "{}", value),
        }
    }
}
