/// The node's status light.
///
/// Steady on when disconnected, off when connected, toggled by the blink
/// timer while connecting.
pub trait Indicator {
    /// Switch the light on or off.
    fn set(&mut self, on: bool);

    /// Invert the light.
    fn toggle(&mut self);
}
