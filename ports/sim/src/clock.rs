//! Monotonic time authority for host threads.
//!
//! Deadlines are absolute instants derived from a fixed epoch rather than
//! relative sleeps, so oversleeping one wait does not push later ones back.

use std::thread;
use std::time::{Duration, Instant};

use linktest_core::{Tick, TickDuration, TICK_RATE_HZ};
use linktest_hal::TimeAuthority;

const MICROS_PER_TICK: u64 = 1_000_000 / TICK_RATE_HZ as u64;

#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Clock whose tick 0 is `epoch`. Clocks sharing an epoch agree on ticks.
    pub fn starting_at(epoch: Instant) -> Self {
        Self { epoch }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    pub fn instant_of(&self, tick: Tick) -> Instant {
        self.epoch + Duration::from_micros(tick.raw().saturating_mul(MICROS_PER_TICK))
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeAuthority for StdClock {
    fn now(&self) -> Tick {
        let micros = u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX);
        Tick::new(micros / MICROS_PER_TICK)
    }

    fn delay_until(&mut self, reference: &mut Tick, increment: TickDuration) -> bool {
        let target = *reference + increment;
        *reference = target;

        let deadline = self.instant_of(target);
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_target_returns_immediately_and_advances_reference() {
        let mut clock = StdClock::starting_at(Instant::now() - Duration::from_millis(50));
        let mut reference = Tick::ZERO;
        let started = Instant::now();

        assert!(!clock.delay_until(&mut reference, TickDuration::from_millis(10)));
        assert_eq!(reference, Tick::new(10));
        assert!(started.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn future_target_is_reached() {
        let mut clock = StdClock::new();
        let mut reference = clock.now();
        assert!(clock.delay_until(&mut reference, TickDuration::from_millis(15)));
        assert!(!clock.now().is_after(reference + TickDuration::from_millis(50)));
        assert!(!reference.is_after(clock.now()));
    }

    #[test]
    fn repeated_waits_do_not_drift() {
        let mut clock = StdClock::new();
        let mut reference = Tick::ZERO;
        for _ in 0..10 {
            clock.delay_until(&mut reference, TickDuration::from_millis(3));
            // Work that would accumulate with relative sleeps.
            thread::sleep(Duration::from_micros(500));
        }
        assert_eq!(reference, Tick::new(30));
        assert!(clock.now().raw() < 40);
    }
}
