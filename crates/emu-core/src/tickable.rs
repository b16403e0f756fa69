//! Trait for components driven by the master clock.

use crate::Ticks;

/// A component that can be advanced by master clock ticks.
///
/// Implementors track their own phase relative to the master clock and do
/// work only when their divisor comes up: a console system ticked at
/// crystal rate steps its CPU every twelfth tick and its video chip every
/// fourth, in a fixed order per edge.
pub trait Tickable {
    /// Advance by one master clock tick.
    fn tick(&mut self);

    /// Advance by multiple ticks.
    ///
    /// Default implementation calls `tick()` in a loop. Components may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
