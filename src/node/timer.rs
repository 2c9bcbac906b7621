//! Named one-shot timers driven by an external clock.

use core::ops::Add;
use core::time::Duration;

/// Milliseconds on the platform's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Instant(u64);

impl Instant {
    /// Instant `millis` milliseconds after boot.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Instant `secs` seconds after boot.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since boot.
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Instant(self.0.saturating_add(millis))
    }
}

/// The timers a node owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Checks whether the network layer is ready.
    ConnectivityProbe,
    /// Bounds an asynchronous session handshake.
    SessionDeadline,
    /// Delays the configuration push after the user stops pressing.
    Configuration,
    /// Keepalive period for actuators, sampling interval for sensors.
    Cadence,
    /// Indicator toggling while connecting.
    Blink,
}

impl TimerId {
    /// Every timer, in tie-break order for equal deadlines.
    pub const ALL: [TimerId; 5] = [
        TimerId::ConnectivityProbe,
        TimerId::SessionDeadline,
        TimerId::Configuration,
        TimerId::Cadence,
        TimerId::Blink,
    ];

    const fn index(self) -> usize {
        match self {
            TimerId::ConnectivityProbe => 0,
            TimerId::SessionDeadline => 1,
            TimerId::Configuration => 2,
            TimerId::Cadence => 3,
            TimerId::Blink => 4,
        }
    }
}

/// One deadline slot per [`TimerId`]. Arming a pending timer replaces its
/// deadline, so a timer can never be pending twice.
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    deadlines: [Option<Instant>; TimerId::ALL.len()],
}

impl TimerSet {
    /// Nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `id` at `now + after`.
    pub fn arm(&mut self, id: TimerId, now: Instant, after: Duration) {
        self.deadlines[id.index()] = Some(now + after);
    }

    /// Returns whether the timer was pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.deadlines[id.index()].take().is_some()
    }

    /// Whether `id` is armed.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines[id.index()].is_some()
    }

    /// When `id` fires, if armed.
    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.deadlines[id.index()]
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Disarm and return the earliest timer due at `now`.
    pub fn take_expired(&mut self, now: Instant) -> Option<TimerId> {
        let id = TimerId::ALL
            .into_iter()
            .filter(|id| self.deadline(*id).is_some_and(|at| at <= now))
            .min_by_key(|id| self.deadline(*id))?;
        self.cancel(id);
        Some(id)
    }
}
