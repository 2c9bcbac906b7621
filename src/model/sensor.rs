use super::{DeviceKind, MAX_KEYS};
use heapless::Vec;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// One simulated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// JSON key of the measurement.
    pub tag: &'static str,
    /// Inclusive lower bound of random draws.
    pub min: i32,
    /// Exclusive upper bound of random draws.
    pub max: i32,
    /// Last sampled value.
    pub current: i32,
    /// Value to ramp toward; 0 means wander randomly.
    pub target: i32,
}

impl Field {
    const fn new(tag: &'static str, min: i32, max: i32) -> Self {
        Self {
            tag,
            min,
            max,
            current: min,
            target: 0,
        }
    }

    fn in_range(&self, value: i32) -> bool {
        (self.min..self.max).contains(&value)
    }
}

/// Simulated sensor with one or more fields.
#[derive(Debug, Clone)]
pub struct Sensor {
    kind: DeviceKind,
    fields: Vec<Field, MAX_KEYS>,
    rng: SmallRng,
}

fn layout(kind: DeviceKind) -> &'static [Field] {
    const THC: [Field; 3] = [
        Field::new("t", 0, 25),
        Field::new("h", 50, 100),
        Field::new("c", 400, 1000),
    ];
    const FN: [Field; 2] = [Field::new("f", 200, 500), Field::new("n", 40, 80)];
    const W: [Field; 1] = [Field::new("w", 0, 100)];
    const C: [Field; 2] = [Field::new("in", 0, 65535), Field::new("o", 0, 65535)];

    match kind {
        DeviceKind::TemperatureHumidityCo2 => &THC,
        DeviceKind::FrequencyNoise => &FN,
        DeviceKind::Weight => &W,
        DeviceKind::Counter => &C,
        DeviceKind::TemperatureActuator | DeviceKind::VentilationActuator => &[],
    }
}

impl Sensor {
    /// Sensor of `kind` with an initial random reading per field.
    pub fn new(kind: DeviceKind, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let fields = layout(kind)
            .iter()
            .map(|field| Field {
                current: rng.gen_range(field.min..field.max),
                ..*field
            })
            .collect();
        Self { kind, fields, rng }
    }

    /// The sensor kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Every field in serialization order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    fn field_mut(&mut self, tag: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.tag == tag)
    }

    /// Last sampled value of `tag`.
    pub fn reading(&self, tag: &str) -> Option<i32> {
        self.field(tag).map(|field| field.current)
    }

    /// Ramp target of `tag`, 0 when sampling randomly.
    pub fn target(&self, tag: &str) -> Option<i32> {
        self.field(tag).map(|field| field.target)
    }

    /// Whether `value` would be accepted as the target of `tag`.
    pub fn accepts_target(&self, tag: &str, value: i32) -> bool {
        self.field(tag)
            .is_some_and(|field| value == 0 || field.in_range(value))
    }

    /// Set the ramp target of `tag`. Returns false when rejected.
    pub fn set_target(&mut self, tag: &str, value: i32) -> bool {
        if !self.accepts_target(tag, value) {
            return false;
        }
        match self.field_mut(tag) {
            Some(field) => {
                field.target = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite the current reading of `tag`.
    pub fn set_reading(&mut self, tag: &str, value: i32) -> bool {
        match self.field_mut(tag) {
            Some(field) => {
                field.current = value;
                true
            }
            None => false,
        }
    }

    /// Advance every field by one sample.
    pub fn sample(&mut self) {
        for field in self.fields.iter_mut() {
            field.current = match field.target {
                0 => self.rng.gen_range(field.min..field.max),
                target if field.current < target => field.current + 1,
                target if field.current > target => field.current - 1,
                _ => field.current,
            };
        }
    }
}
