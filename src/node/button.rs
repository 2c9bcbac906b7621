//! Short/long press discrimination for the single user button.
//!
//! The platform reports one `held` tick per second while the button is down
//! and one `release` when it comes back up.

/// What a press asks the node to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Long press while disconnected.
    Reconnect,
    /// Short press.
    CycleConfiguration {
        /// Whole seconds the button was held.
        held_secs: u32,
    },
}

/// Counts whole seconds of the current press.
#[derive(Debug, Clone)]
pub struct ButtonPressTracker {
    elapsed: u32,
    fired: bool,
    threshold: u32,
}

impl ButtonPressTracker {
    /// Long-press threshold used by [`Default`].
    pub const DEFAULT_THRESHOLD_SECS: u32 = 3;

    /// Tracker treating `threshold` held seconds as a long press.
    pub fn new(threshold: u32) -> Self {
        Self {
            elapsed: 0,
            fired: false,
            threshold,
        }
    }

    /// Seconds held so far in the current press.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// One more second held. Reconnect is emitted at most once per press,
    /// and only when `not_connected` on the tick that reaches the threshold
    /// or any later one.
    pub fn on_held(&mut self, not_connected: bool) -> Option<ButtonAction> {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= self.threshold && not_connected && !self.fired {
            self.fired = true;
            return Some(ButtonAction::Reconnect);
        }
        None
    }

    /// The button came up. Short presses yield [`ButtonAction::CycleConfiguration`].
    pub fn on_release(&mut self) -> Option<ButtonAction> {
        let held_secs = self.elapsed;
        self.elapsed = 0;
        self.fired = false;
        (held_secs < self.threshold).then_some(ButtonAction::CycleConfiguration { held_secs })
    }
}

impl Default for ButtonPressTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD_SECS)
    }
}
