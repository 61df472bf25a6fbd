//! Time authority abstraction

use linktest_core::{Tick, TickDuration};

/// Monotonic tick source with a drift-free absolute delay.
pub trait TimeAuthority {
    /// Current value of the tick counter.
    fn now(&self) -> Tick;

    /// Blocks until `*reference + increment`, then stores that tick in
    /// `reference`.
    ///
    /// When the target is not in the future the call returns `false`
    /// immediately; `reference` is advanced either way, so a late caller keeps
    /// its intended schedule instead of re-anchoring on the current time.
    fn delay_until(&mut self, reference: &mut Tick, increment: TickDuration) -> bool;

    /// Relative delay from now.
    fn delay(&mut self, duration: TickDuration) {
        let mut reference = self.now();
        self.delay_until(&mut reference, duration);
    }
}

impl<T: TimeAuthority + ?Sized> TimeAuthority for &mut T {
    fn now(&self) -> Tick {
        (**self).now()
    }

    fn delay_until(&mut self, reference: &mut Tick, increment: TickDuration) -> bool {
        (**self).delay_until(reference, increment)
    }
}
